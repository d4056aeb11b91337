//! Airline routes.

use actix_web::{
    get,
    web::{Data, Query, ServiceConfig},
    HttpResponse,
};
use cadence::StatsdClient;
use wayfarer_store::{Airline, DocumentStore, Entity, Query as StoreQuery};

use super::{resource, rows_as, store_failure, AirportParameter, CountryFilter, Pagination};
use crate::errors::HandlerError;

/// Configure the airline routes.
pub fn configure(config: &mut ServiceConfig) {
    config.service(list).service(to_airport);
    resource::configure::<Airline>(config);
}

/// Airlines ordered by name, optionally only those from one country.
#[get("/list")]
async fn list(
    filter: Query<CountryFilter>,
    pagination: Query<Pagination>,
    store: Data<dyn DocumentStore>,
    metrics_client: Data<StatsdClient>,
) -> Result<HttpResponse, HandlerError> {
    let query = StoreQuery::AirlineList {
        country: filter.country(),
        page: (&*pagination).into(),
    };
    let rows = store
        .query(&query)
        .await
        .map_err(|error| store_failure(error, Airline::NAME, &metrics_client))?;

    Ok(HttpResponse::Ok().json(rows_as::<Airline>(rows)?))
}

/// Airlines that fly into the given airport, ordered by name.
#[get("/to-airport")]
async fn to_airport(
    parameter: Query<AirportParameter>,
    pagination: Query<Pagination>,
    store: Data<dyn DocumentStore>,
    metrics_client: Data<StatsdClient>,
) -> Result<HttpResponse, HandlerError> {
    let query = StoreQuery::AirlinesToAirport {
        airport: parameter.into_inner().airport,
        page: (&*pagination).into(),
    };
    let rows = store
        .query(&query)
        .await
        .map_err(|error| store_failure(error, Airline::NAME, &metrics_client))?;

    Ok(HttpResponse::Ok().json(rows_as::<Airline>(rows)?))
}
