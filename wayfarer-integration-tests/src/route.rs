//! Tests of the route routes.
#![cfg(test)]

use anyhow::Result;
use fake::{Fake, Faker};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{json, Value};
use wayfarer_store::{Route, Schedule};

use crate::{wayfarer_test, TestingTools};

#[actix_rt::test]
async fn routes_can_be_created_read_updated_and_deleted() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let route = Route {
                airline: "SAF".to_string(),
                airlineid: "airline_sample".to_string(),
                sourceairport: "SFO".to_string(),
                destinationairport: "JFK".to_string(),
                stops: Some(0),
                equipment: Some("CRJ".to_string()),
                schedule: Some(vec![Schedule {
                    day: 0,
                    flight: "SAF123".to_string(),
                    utc: "14:05:00".to_string(),
                }]),
                distance: Some(4151.79),
            };

            let response = test_client
                .post("/api/v1/route/route_test_crud")
                .json(&route)
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::CREATED);

            let response = test_client.get("/api/v1/route/route_test_crud").send().await?;
            assert_eq!(response.json::<Route>().await?, route);

            let updated = Route {
                stops: Some(1),
                schedule: None,
                ..route
            };
            let response = test_client
                .put("/api/v1/route/route_test_crud")
                .json(&updated)
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::OK);

            let response = test_client.get("/api/v1/route/route_test_crud").send().await?;
            assert_eq!(response.json::<Route>().await?, updated);

            let response = test_client.delete("/api/v1/route/route_test_crud").send().await?;
            assert_eq!(response.status(), StatusCode::NO_CONTENT);

            let response = test_client.get("/api/v1/route/route_test_crud").send().await?;
            assert_eq!(
                response.json::<Value>().await?,
                json!({"detail": "Route not found"})
            );
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn routes_need_both_airports() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let response = test_client
                .post("/api/v1/route/route_partial")
                .json(&json!({
                    "airline": "SAF",
                    "airlineid": "airline_sample",
                    "sourceairport": "SFO",
                }))
                .send()
                .await?;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn malformed_json_is_rejected() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let response = test_client
                .post("/api/v1/route/route_broken")
                .header("content-type", "application/json")
                .body("{\"airline\": ")
                .send()
                .await?;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body: Value = response.json().await?;
            assert!(body["detail"].is_string());
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn existing_routes_conflict() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools {
             test_client, store, ..
         }| async move {
            let route: Route = Faker.fake();
            store.put("route_10000", &route)?;

            let response = test_client
                .post("/api/v1/route/route_10000")
                .json(&route)
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::CONFLICT);
            Ok(())
        },
    )
    .await
}
