//! An actix-web service to implement [Dockerflow](https://github.com/mozilla-services/Dockerflow).

use actix_web::{
    get,
    web::{self, Data},
    HttpResponse,
};
use serde::Serialize;
use wayfarer_store::DocumentStore;

use crate::errors::HandlerError;

/// Handles required Dockerflow Endpoints.
pub fn configure(config: &mut web::ServiceConfig) {
    config
        .service(lbheartbeat)
        .service(heartbeat)
        .service(version)
        .service(test_error);
}

/// Used by the load balancer to indicate that the server can respond to
/// requests. Should just return OK.
#[get("__lbheartbeat__")]
async fn lbheartbeat() -> HttpResponse {
    HttpResponse::Ok().body("")
}

/// Return the contents of the `version.json` file created by CI and stored
/// in the Docker root (or the TBD version stored in the Git repo).
#[get("__version__")]
async fn version() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/json")
        .body(include_str!("../version.json"))
}

/// The body of a heartbeat response.
#[derive(Debug, Serialize)]
struct Heartbeat {
    /// `ok` if every check passed, otherwise `error`.
    status: &'static str,
    /// The version of this service.
    version: &'static str,
    /// The result of each check.
    checks: HeartbeatChecks,
}

/// The checks made by the heartbeat.
#[derive(Debug, Serialize)]
struct HeartbeatChecks {
    /// If the document store answered a ping.
    store: &'static str,
}

/// Returns a status message indicating the current state of the server, and
/// whether the document store can be reached.
#[get("__heartbeat__")]
async fn heartbeat(store: Data<dyn DocumentStore>) -> HttpResponse {
    let store_status = match store.ping().await {
        Ok(()) => "ok",
        Err(error) => {
            tracing::warn!(r#type = "web.heartbeat.store", %error, "Store did not answer ping");
            "error"
        }
    };

    let body = Heartbeat {
        status: store_status,
        version: env!("CARGO_PKG_VERSION"),
        checks: HeartbeatChecks {
            store: store_status,
        },
    };

    if store_status == "ok" {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

/// Returning an API error to test error handling.
#[get("__error__")]
async fn test_error() -> Result<HttpResponse, HandlerError> {
    Err(HandlerError::internal())
}
