//! Tests that Wayfarer conforms to [Dockerflow](https://github.com/mozilla-services/dockerflow).
#![cfg(test)]

use anyhow::Result;
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{wayfarer_test, TestingTools};

#[actix_rt::test]
async fn lbheartbeat_works() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let response = test_client.get("/__lbheartbeat__").send().await?;

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.content_length(), Some(0));
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn heartbeat_reports_the_store() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let response = test_client.get("/__heartbeat__").send().await?;

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                response
                    .headers()
                    .get_all("content-type")
                    .iter()
                    .collect::<Vec<_>>(),
                vec!["application/json"]
            );
            let body: Value = response.json().await?;
            assert_eq!(body["status"], json!("ok"));
            assert_eq!(body["checks"], json!({"store": "ok"}));
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn version_works() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let response = test_client.get("/__version__").send().await?;

            assert!(response.status().is_success());

            #[derive(Deserialize, Debug)]
            #[allow(dead_code)]
            struct VersionInfo {
                source: String,
                version: String,
                commit: String,
                build: String,
            }
            let body: Result<VersionInfo, _> = response.json().await;
            assert!(body.is_ok());
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn error_works() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let response = test_client.get("/__error__").send().await?;

            assert!(response.status().is_server_error());
            Ok(())
        },
    )
    .await
}
