//! Route routes. Routes have no queries of their own, only key access.

use actix_web::web::ServiceConfig;
use wayfarer_store::Route;

use super::resource;

/// Configure the route routes.
pub fn configure(config: &mut ServiceConfig) {
    resource::configure::<Route>(config);
}
