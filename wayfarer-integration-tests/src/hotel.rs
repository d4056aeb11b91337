//! Tests of the hotel routes, mostly the searches.
#![cfg(test)]

use anyhow::Result;
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{json, Value};
use wayfarer_store::{Hotel, HotelName};

use crate::{wayfarer_test, TestingTools};

/// A hotel with a name, city and description.
fn hotel(name: &str, city: &str, description: &str) -> Hotel {
    Hotel {
        name: Some(name.to_string()),
        city: Some(city.to_string()),
        country: Some("France".to_string()),
        description: Some(description.to_string()),
        ..Hotel::default()
    }
}

/// Seed a few hotels.
fn seed(store: &wayfarer_store::MemoryStore) -> Result<()> {
    store.put("hotel_1", &hotel("Le Petit Hotel", "Paris", "Cozy rooms near the river"))?;
    store.put("hotel_2", &hotel("Grand Hotel", "Nice", "Sea view rooms"))?;
    store.put("hotel_3", &hotel("Hostel Central", "Paris", "Cheap dorm beds"))?;
    Ok(())
}

#[actix_rt::test]
async fn empty_filters_match_nothing_without_searching() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools {
             test_client, store, ..
         }| async move {
            seed(&store)?;

            let response = test_client
                .post("/api/v1/hotel/filter")
                .json(&json!({}))
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.json::<Value>().await?, json!([]));

            let response = test_client.post("/api/v1/hotel/filter").send().await?;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.json::<Value>().await?, json!([]));

            let response = test_client
                .post("/api/v1/hotel/filter")
                .header("content-type", "application/json")
                .body("null")
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.json::<Value>().await?, json!([]));

            assert_eq!(store.search_count(), 0);
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn filter_by_city_is_exact() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools {
             test_client, store, ..
         }| async move {
            seed(&store)?;

            let response = test_client
                .post("/api/v1/hotel/filter")
                .json(&json!({"city": "Paris"}))
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::OK);
            let mut names: Vec<String> = response
                .json::<Vec<Hotel>>()
                .await?
                .into_iter()
                .filter_map(|hotel| hotel.name)
                .collect();
            names.sort();
            assert_eq!(names, vec!["Hostel Central", "Le Petit Hotel"]);

            let response = test_client
                .post("/api/v1/hotel/filter")
                .json(&json!({"city": "paris"}))
                .send()
                .await?;
            assert_eq!(response.json::<Value>().await?, json!([]));
            assert_eq!(store.search_count(), 2);
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn filter_fields_are_combined() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools {
             test_client, store, ..
         }| async move {
            seed(&store)?;

            let response = test_client
                .post("/api/v1/hotel/filter")
                .json(&json!({"city": "Paris", "description": "rooms"}))
                .send()
                .await?;
            let hotels: Vec<Hotel> = response.json().await?;
            assert_eq!(
                hotels,
                vec![hotel("Le Petit Hotel", "Paris", "Cozy rooms near the river")]
            );
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn filter_is_paginated() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools {
             test_client, store, ..
         }| async move {
            seed(&store)?;

            let response = test_client
                .post("/api/v1/hotel/filter?limit=1&offset=1")
                .json(&json!({"country": "France"}))
                .send()
                .await?;
            let hotels: Vec<Hotel> = response.json().await?;
            assert_eq!(hotels, vec![hotel("Grand Hotel", "Nice", "Sea view rooms")]);
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn malformed_filters_are_rejected() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools {
             test_client, store, ..
         }| async move {
            let response = test_client
                .post("/api/v1/hotel/filter")
                .header("content-type", "application/json")
                .body("[1, 2")
                .send()
                .await?;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(store.search_count(), 0);
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn autocomplete_matches_partial_names() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools {
             test_client, store, ..
         }| async move {
            seed(&store)?;
            store.put(
                "hotel_4",
                &Hotel {
                    city: Some("Paris".to_string()),
                    ..Hotel::default()
                },
            )?;

            let response = test_client
                .get("/api/v1/hotel/autocomplete?name=hot")
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::OK);
            let mut names: Vec<HotelName> = response.json().await?;
            names.sort_by(|a, b| a.name.cmp(&b.name));
            assert_eq!(
                names,
                vec![
                    HotelName {
                        name: "Grand Hotel".to_string()
                    },
                    HotelName {
                        name: "Le Petit Hotel".to_string()
                    },
                ]
            );
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn autocomplete_requires_a_name() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let response = test_client.get("/api/v1/hotel/autocomplete").send().await?;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn hotels_can_be_stored_by_key() -> Result<()> {
    wayfarer_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let body = json!({"name": "Sample Hotel", "city": "Lyon", "title": "Lyon"});
            let response = test_client
                .post("/api/v1/hotel/hotel_sample")
                .json(&body)
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::CREATED);

            let response = test_client.get("/api/v1/hotel/hotel_sample").send().await?;
            assert_eq!(response.json::<Value>().await?, body);
            Ok(())
        },
    )
    .await
}
