//! Hotel routes, including the full text searches.

use actix_web::{
    get, post,
    web::{Bytes, Data, Query, ServiceConfig},
    HttpResponse,
};
use cadence::StatsdClient;
use serde::Deserialize;
use wayfarer_settings::Settings;
use wayfarer_store::{
    search::{autocomplete_request, hotel_filter_request},
    DocumentStore, Entity, Hotel, HotelName,
};

use super::{resource, store_failure, Pagination};
use crate::errors::{HandlerError, HandlerErrorKind};

/// Configure the hotel routes.
pub fn configure(config: &mut ServiceConfig) {
    config.service(autocomplete).service(filter);
    resource::configure::<Hotel>(config);
}

/// The `name` query parameter of the autocomplete search.
#[derive(Debug, Deserialize)]
struct AutocompleteParameters {
    /// The partial hotel name typed so far.
    name: String,
}

/// Names of hotels matching a partial name.
#[get("/autocomplete")]
async fn autocomplete(
    parameters: Query<AutocompleteParameters>,
    store: Data<dyn DocumentStore>,
    settings: Data<Settings>,
    metrics_client: Data<StatsdClient>,
) -> Result<HttpResponse, HandlerError> {
    let request = autocomplete_request(&parameters.name);
    let hits = store
        .search(&settings.database.hotel_search_index, &request)
        .await
        .map_err(|error| store_failure(error, Hotel::NAME, &metrics_client))?;

    let names: Vec<HotelName> = hits.iter().filter_map(|hit| hit.to_hotel_name()).collect();
    tracing::debug!(r#type = "web.hotel.autocomplete", count = names.len(), "Found hotel names");
    Ok(HttpResponse::Ok().json(names))
}

/// Hotels matching every field set in the JSON body. Descriptive fields are
/// matched as text, place names must match exactly.
///
/// An empty, missing or `null` body matches nothing, and no search is made.
#[post("/filter")]
async fn filter(
    body: Bytes,
    pagination: Query<Pagination>,
    store: Data<dyn DocumentStore>,
    settings: Data<Settings>,
    metrics_client: Data<StatsdClient>,
) -> Result<HttpResponse, HandlerError> {
    let hotel_filter: Hotel = if body.iter().all(u8::is_ascii_whitespace) {
        Hotel::default()
    } else {
        serde_json::from_slice::<Option<Hotel>>(&body)
            .map_err(HandlerError::bad_request)?
            .unwrap_or_default()
    };

    let request = match hotel_filter_request(&hotel_filter, (&*pagination).into()) {
        Some(request) => request,
        None => return Ok(HttpResponse::Ok().json(Vec::<Hotel>::new())),
    };

    let hits = store
        .search(&settings.database.hotel_search_index, &request)
        .await
        .map_err(|error| store_failure(error, Hotel::NAME, &metrics_client))?;

    let hotels = hits
        .iter()
        .map(|hit| hit.to_hotel())
        .collect::<Result<Vec<Hotel>, _>>()
        .map_err(|error| HandlerError::from(HandlerErrorKind::Unexpected(error.to_string())))?;
    Ok(HttpResponse::Ok().json(hotels))
}
