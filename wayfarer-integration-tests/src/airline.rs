//! Tests of the airline routes.
#![cfg(test)]

use anyhow::Result;
use fake::{Fake, Faker};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{json, Value};
use wayfarer_store::{Airline, Route};

use crate::{wayfarer_test, TestingTools};

/// An airline with just the required fields.
fn airline(name: &str, country: &str) -> Airline {
    Airline {
        name: name.to_string(),
        iata: None,
        icao: None,
        callsign: None,
        country: country.to_string(),
    }
}

/// A non-stop route flown by `airlineid`.
fn route(airlineid: &str, source: &str, destination: &str) -> Route {
    Route {
        airlineid: airlineid.to_string(),
        sourceairport: source.to_string(),
        destinationairport: destination.to_string(),
        stops: Some(0),
        ..Faker.fake()
    }
}

#[actix_rt::test]
async fn airlines_can_be_created_read_updated_and_deleted() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let body = json!({
                "name": "Sample Airline",
                "iata": "SAL",
                "icao": "SALL",
                "callsign": "SAM",
                "country": "Sample Country",
            });

            let response = test_client
                .post("/api/v1/airline/airline_test_crud")
                .json(&body)
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::CREATED);
            assert_eq!(response.json::<Value>().await?, body);

            let response = test_client.get("/api/v1/airline/airline_test_crud").send().await?;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.json::<Value>().await?, body);

            let updated = json!({"name": "Updated Airline", "country": "Updated Country"});
            let response = test_client
                .put("/api/v1/airline/airline_test_crud")
                .json(&updated)
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.json::<Value>().await?, updated);

            let response = test_client.get("/api/v1/airline/airline_test_crud").send().await?;
            assert_eq!(response.json::<Value>().await?, updated);

            let response = test_client
                .delete("/api/v1/airline/airline_test_crud")
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::NO_CONTENT);

            let response = test_client.get("/api/v1/airline/airline_test_crud").send().await?;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert_eq!(
                response.json::<Value>().await?,
                json!({"detail": "Airline not found"})
            );
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn creating_an_existing_airline_conflicts() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools {
             test_client, store, ..
         }| async move {
            store.put("airline_10", &airline("40-Mile Air", "United States"))?;

            let response = test_client
                .post("/api/v1/airline/airline_10")
                .json(&airline("Impostor Air", "France"))
                .send()
                .await?;

            assert_eq!(response.status(), StatusCode::CONFLICT);
            assert_eq!(
                response.json::<Value>().await?,
                json!({"detail": "Airline already exists"})
            );

            let response = test_client.get("/api/v1/airline/airline_10").send().await?;
            assert_eq!(response.json::<Airline>().await?.name, "40-Mile Air");
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn put_creates_missing_airlines() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let response = test_client
                .put("/api/v1/airline/airline_new")
                .json(&airline("Fresh Air", "Canada"))
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::OK);

            let response = test_client.get("/api/v1/airline/airline_new").send().await?;
            assert_eq!(response.status(), StatusCode::OK);
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn deleting_a_missing_airline_is_not_found() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let response = test_client.delete("/api/v1/airline/airline_nope").send().await?;

            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn airlines_missing_required_fields_are_rejected() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let response = test_client
                .post("/api/v1/airline/airline_partial")
                .json(&json!({"name": "No Country Air"}))
                .send()
                .await?;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body: Value = response.json().await?;
            assert!(body["detail"].is_string());

            let response = test_client.get("/api/v1/airline/airline_partial").send().await?;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn overlong_keys_are_rejected() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let path = format!("/api/v1/airline/{}", "k".repeat(251));
            let response = test_client.get(&path).send().await?;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn list_is_ordered_by_name_and_paginated() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools {
             test_client, store, ..
         }| async move {
            store.put("airline_1", &airline("Cirrus", "France"))?;
            store.put("airline_2", &airline("Aurora", "United States"))?;
            store.put("airline_3", &airline("Boreal", "France"))?;

            let response = test_client.get("/api/v1/airline/list").send().await?;
            assert_eq!(response.status(), StatusCode::OK);
            let names: Vec<String> = response
                .json::<Vec<Airline>>()
                .await?
                .into_iter()
                .map(|airline| airline.name)
                .collect();
            assert_eq!(names, vec!["Aurora", "Boreal", "Cirrus"]);

            let response = test_client
                .get("/api/v1/airline/list?limit=1&offset=1")
                .send()
                .await?;
            let page: Vec<Airline> = response.json().await?;
            assert_eq!(page, vec![airline("Boreal", "France")]);
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn list_can_filter_by_country() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools {
             test_client, store, ..
         }| async move {
            store.put("airline_1", &airline("Cirrus", "France"))?;
            store.put("airline_2", &airline("Aurora", "United States"))?;

            let response = test_client
                .get("/api/v1/airline/list?country=France")
                .send()
                .await?;
            let airlines: Vec<Airline> = response.json().await?;
            assert_eq!(airlines, vec![airline("Cirrus", "France")]);

            // An empty country is the same as no filter.
            let response = test_client.get("/api/v1/airline/list?country=").send().await?;
            let airlines: Vec<Airline> = response.json().await?;
            assert_eq!(airlines.len(), 2);
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn negative_pagination_is_rejected() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let response = test_client.get("/api/v1/airline/list?limit=-1").send().await?;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body: Value = response.json().await?;
            assert!(body["detail"].is_string());
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn to_airport_lists_airlines_flying_there() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools {
             test_client, store, ..
         }| async move {
            store.put("airline_1", &airline("Cirrus", "France"))?;
            store.put("airline_2", &airline("Aurora", "United States"))?;
            store.put("airline_3", &airline("Boreal", "France"))?;
            store.put("route_1", &route("airline_1", "LAX", "SFO"))?;
            store.put("route_2", &route("airline_2", "JFK", "SFO"))?;
            store.put("route_3", &route("airline_2", "SEA", "SFO"))?;
            store.put("route_4", &route("airline_3", "SFO", "LAX"))?;

            let response = test_client
                .get("/api/v1/airline/to-airport?airport=SFO")
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::OK);
            let names: Vec<String> = response
                .json::<Vec<Airline>>()
                .await?
                .into_iter()
                .map(|airline| airline.name)
                .collect();
            assert_eq!(names, vec!["Aurora", "Cirrus"]);
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn to_airport_requires_an_airport() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let response = test_client.get("/api/v1/airline/to-airport").send().await?;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            Ok(())
        },
    )
    .await
}
