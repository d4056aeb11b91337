//! Tests of the metrics reported while serving requests.
#![cfg(test)]

use anyhow::Result;
use reqwest::StatusCode;

use crate::{wayfarer_test, TestingTools};

#[actix_rt::test]
async fn request_durations_are_tagged_with_the_route_pattern() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools {
             test_client,
             mut metrics_watcher,
             ..
         }| async move {
            let response = test_client.get("/api/v1/airline/airline_42").send().await?;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);

            assert!(metrics_watcher.has_tagged(
                "request.duration",
                "path",
                "/api/v1/airline/{id}"
            ));
            assert!(metrics_watcher.has_tagged("request.duration", "status", "404"));
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn store_errors_are_counted_by_kind() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools {
             test_client,
             mut metrics_watcher,
             ..
         }| async move {
            test_client.delete("/api/v1/route/route_missing").send().await?;

            assert!(metrics_watcher.has_tagged("store.error", "kind", "not_found"));
            Ok(())
        },
    )
    .await
}
