//! The travel-sample API, under `/api/v1`.

mod airline;
mod airport;
mod hotel;
mod resource;
mod route;

use actix_web::web::{self, ServiceConfig};
use cadence::{CountedExt, StatsdClient};
use serde::Deserialize;
use wayfarer_store::{Page, StoreError};

use crate::errors::{HandlerError, HandlerErrorKind};

/// Configure the routes of every collection.
pub fn configure(config: &mut ServiceConfig) {
    config
        .service(web::scope("/airline").configure(airline::configure))
        .service(web::scope("/airport").configure(airport::configure))
        .service(web::scope("/route").configure(route::configure))
        .service(web::scope("/hotel").configure(hotel::configure));
}

/// The `limit` and `offset` query parameters of list endpoints.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct Pagination {
    /// Number of items to return (page size).
    limit: u32,
    /// Number of items to skip.
    offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        let page = Page::default();
        Self {
            limit: page.limit,
            offset: page.offset,
        }
    }
}

impl From<&Pagination> for Page {
    fn from(pagination: &Pagination) -> Self {
        Page {
            limit: pagination.limit,
            offset: pagination.offset,
        }
    }
}

/// The optional `country` filter of list endpoints. An empty value is the same
/// as no filter.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CountryFilter {
    /// Only return items from this country.
    country: Option<String>,
}

impl CountryFilter {
    /// The country to filter on, if any.
    fn country(&self) -> Option<String> {
        self.country.clone().filter(|country| !country.is_empty())
    }
}

/// The required `airport` query parameter.
#[derive(Debug, Deserialize)]
struct AirportParameter {
    /// FAA code of an airport, such as "SFO".
    airport: String,
}

/// Count and log a store failure, then translate it for the response.
fn store_failure(
    error: StoreError,
    entity: &'static str,
    metrics_client: &StatsdClient,
) -> HandlerError {
    metrics_client
        .incr_with_tags("store.error")
        .with_tag("kind", error.kind())
        .send();

    if matches!(error, StoreError::Connection(_) | StoreError::Unexpected(_)) {
        tracing::error!(r#type = "web.store.error", %error, entity, "Store operation failed");
    } else {
        tracing::debug!(r#type = "web.store.rejected", %error, entity, "Store rejected operation");
    }

    HandlerError::from_store(error, entity)
}

/// Read rows returned by the store as records.
fn rows_as<T: serde::de::DeserializeOwned>(
    rows: Vec<serde_json::Value>,
) -> Result<Vec<T>, HandlerError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<_, _>>()
        .map_err(|error| {
            tracing::error!(r#type = "web.store.bad-row", %error, "Store returned an unreadable row");
            HandlerError::from(HandlerErrorKind::Unexpected(error.to_string()))
        })
}
