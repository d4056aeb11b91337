//! Tests of the airport routes.
#![cfg(test)]

use anyhow::Result;
use fake::{Fake, Faker};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{json, Value};
use wayfarer_store::{Airport, DestinationAirport, GeoCoordinates, Route};

use crate::{wayfarer_test, TestingTools};

/// An airport with an FAA code.
fn airport(name: &str, faa: &str, country: &str) -> Airport {
    Airport {
        airportname: name.to_string(),
        faa: Some(faa.to_string()),
        country: country.to_string(),
        ..Faker.fake()
    }
}

/// A route from `source` to `destination` with the given number of stops.
fn route(source: &str, destination: &str, stops: i32) -> Route {
    Route {
        sourceairport: source.to_string(),
        destinationairport: destination.to_string(),
        stops: Some(stops),
        ..Faker.fake()
    }
}

#[actix_rt::test]
async fn airports_can_be_created_and_read() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let body = json!({
                "airportname": "Sample Airport",
                "city": "Sample City",
                "country": "Sample Country",
                "faa": "SAA",
                "icao": "SAAA",
                "tz": "Europe/Paris",
                "geo": {"lat": 48.8, "lon": 2.3, "alt": 120.0},
            });

            let response = test_client
                .post("/api/v1/airport/airport_test_crud")
                .json(&body)
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::CREATED);

            let response = test_client.get("/api/v1/airport/airport_test_crud").send().await?;
            assert_eq!(response.status(), StatusCode::OK);
            let airport: Airport = response.json().await?;
            assert_eq!(
                airport.geo,
                Some(GeoCoordinates {
                    lat: 48.8,
                    lon: 2.3,
                    alt: 120.0
                })
            );
            assert_eq!(airport.faa.as_deref(), Some("SAA"));

            let response = test_client
                .delete("/api/v1/airport/airport_test_crud")
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn missing_airports_are_not_found() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let response = test_client.get("/api/v1/airport/airport_nope").send().await?;

            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert_eq!(
                response.json::<Value>().await?,
                json!({"detail": "Airport not found"})
            );
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn list_is_ordered_by_name_and_filterable() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools {
             test_client, store, ..
         }| async move {
            store.put("airport_1", &airport("Orly", "ORY", "France"))?;
            store.put("airport_2", &airport("Logan", "BOS", "United States"))?;
            store.put("airport_3", &airport("Charles de Gaulle", "CDG", "France"))?;

            let response = test_client.get("/api/v1/airport/list").send().await?;
            assert_eq!(response.status(), StatusCode::OK);
            let names: Vec<String> = response
                .json::<Vec<Airport>>()
                .await?
                .into_iter()
                .map(|airport| airport.airportname)
                .collect();
            assert_eq!(names, vec!["Charles de Gaulle", "Logan", "Orly"]);

            let response = test_client
                .get("/api/v1/airport/list?country=France&limit=1&offset=1")
                .send()
                .await?;
            let names: Vec<String> = response
                .json::<Vec<Airport>>()
                .await?
                .into_iter()
                .map(|airport| airport.airportname)
                .collect();
            assert_eq!(names, vec!["Orly"]);
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn direct_connections_are_distinct_non_stop_destinations() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools {
             test_client, store, ..
         }| async move {
            store.put("airport_1", &airport("San Francisco Intl", "SFO", "United States"))?;
            store.put("route_1", &route("SFO", "LAX", 0))?;
            store.put("route_2", &route("SFO", "JFK", 0))?;
            store.put("route_3", &route("SFO", "LAX", 0))?;
            store.put("route_4", &route("SFO", "CDG", 1))?;
            store.put("route_5", &route("LAX", "SEA", 0))?;

            let response = test_client
                .get("/api/v1/airport/direct-connections?airport=SFO")
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::OK);
            let destinations: Vec<DestinationAirport> = response.json().await?;
            assert_eq!(
                destinations,
                vec![
                    DestinationAirport {
                        destinationairport: "JFK".to_string()
                    },
                    DestinationAirport {
                        destinationairport: "LAX".to_string()
                    },
                ]
            );
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn direct_connections_of_an_unknown_airport_are_empty() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools {
             test_client, store, ..
         }| async move {
            store.put("route_1", &route("XXX", "LAX", 0))?;

            let response = test_client
                .get("/api/v1/airport/direct-connections?airport=XXX")
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.json::<Value>().await?, json!([]));
            Ok(())
        },
    )
    .await
}
