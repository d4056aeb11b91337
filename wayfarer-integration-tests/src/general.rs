//! Tests of behavior shared by the whole service.
#![cfg(test)]

use anyhow::Result;
use pretty_assertions::assert_eq;
use reqwest::{header::HeaderValue, StatusCode};

use crate::{wayfarer_test, TestingTools};

#[actix_rt::test]
async fn root_of_services_provides_public_docs() -> Result<()> {
    wayfarer_test(
        |settings| {
            settings.public_documentation = Some("https://example.com/".parse().unwrap())
        },
        |TestingTools { test_client, .. }| async move {
            let response = test_client.get("/").send().await?;

            assert_eq!(response.status(), StatusCode::FOUND);
            assert_eq!(
                response.headers().get("location"),
                Some(&HeaderValue::from_static("https://example.com/"))
            );
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn root_of_services_falls_back_to_api_docs() -> Result<()> {
    wayfarer_test(
        |settings| settings.public_documentation = None,
        |TestingTools { test_client, .. }| async move {
            let response = test_client.get("/").send().await?;

            assert_eq!(response.status(), StatusCode::FOUND);
            assert_eq!(
                response.headers().get("location"),
                Some(&HeaderValue::from_static("/docs"))
            );
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn api_docs_are_served() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let response = test_client.get("/openapi.json").send().await?;
            assert_eq!(response.status(), StatusCode::OK);
            let doc: serde_json::Value = response.json().await?;
            assert_eq!(doc["info"]["title"], "Wayfarer");
            assert!(doc["paths"]["/api/v1/hotel/filter"]["post"].is_object());

            let response = test_client.get("/docs").send().await?;
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.text().await?.contains("/openapi.json"));
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn unknown_paths_are_not_found() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let response = test_client.get("/api/v1/spaceport/list").send().await?;

            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn any_origin_is_allowed() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let response = test_client
                .get("/api/v1/airline/list")
                .header("Origin", "https://travel.example.com")
                .send()
                .await?;

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                response.headers().get("access-control-allow-origin"),
                Some(&HeaderValue::from_static("https://travel.example.com"))
            );
            Ok(())
        },
    )
    .await
}
