//! Airport routes.

use actix_web::{
    get,
    web::{Data, Query, ServiceConfig},
    HttpResponse,
};
use cadence::StatsdClient;
use wayfarer_store::{Airport, DestinationAirport, DocumentStore, Entity, Query as StoreQuery};

use super::{resource, rows_as, store_failure, AirportParameter, CountryFilter, Pagination};
use crate::errors::HandlerError;

/// Configure the airport routes.
pub fn configure(config: &mut ServiceConfig) {
    config.service(list).service(direct_connections);
    resource::configure::<Airport>(config);
}

/// Airports ordered by name, optionally only those in one country.
#[get("/list")]
async fn list(
    filter: Query<CountryFilter>,
    pagination: Query<Pagination>,
    store: Data<dyn DocumentStore>,
    metrics_client: Data<StatsdClient>,
) -> Result<HttpResponse, HandlerError> {
    let query = StoreQuery::AirportList {
        country: filter.country(),
        page: (&*pagination).into(),
    };
    let rows = store
        .query(&query)
        .await
        .map_err(|error| store_failure(error, Airport::NAME, &metrics_client))?;

    Ok(HttpResponse::Ok().json(rows_as::<Airport>(rows)?))
}

/// Airports reachable without stops from the given airport.
#[get("/direct-connections")]
async fn direct_connections(
    parameter: Query<AirportParameter>,
    pagination: Query<Pagination>,
    store: Data<dyn DocumentStore>,
    metrics_client: Data<StatsdClient>,
) -> Result<HttpResponse, HandlerError> {
    let query = StoreQuery::DirectConnections {
        airport: parameter.into_inner().airport,
        page: (&*pagination).into(),
    };
    let rows = store
        .query(&query)
        .await
        .map_err(|error| store_failure(error, Airport::NAME, &metrics_client))?;

    Ok(HttpResponse::Ok().json(rows_as::<DestinationAirport>(rows)?))
}
