#![warn(missing_docs, clippy::missing_docs_in_private_items)]

//! Web server for [Wayfarer](../wayfarer/index.html)'s travel-sample API.

mod dockerflow;
mod endpoints;
mod errors;
mod logging;
mod middleware;
mod openapi;

use std::{net::TcpListener, sync::Arc};

use actix_cors::Cors;
use actix_web::{
    dev::Server,
    error::{JsonPayloadError, QueryPayloadError},
    get,
    web::{self, Data},
    App, HttpRequest, HttpResponse, HttpServer,
};
use cadence::StatsdClient;
use tracing_actix_web::TracingLogger;
use wayfarer_settings::Settings;
use wayfarer_store::DocumentStore;

use crate::{errors::HandlerError, logging::WayfarerRootSpanBuilder};

/// Run the web server
///
/// The returned server is a `Future` that must either be `.await`ed, or run it
/// as a background task using `tokio::spawn`.
///
/// Most of the details from `settings` will be respected, except for those that
/// go into building the listener (the host and port). If you want to respect the
/// settings specified in that object, you must include them in the construction
/// of `listener`.
///
/// # Errors
///
/// Returns an error if the server cannot be started on the provided listener.
///
/// # Examples
///
/// Run the server in the foreground. This will only return if there is an error
/// that causes the server to shut down.
///
/// ```no_run
/// # tokio_test::block_on(async {
/// use cadence::{NopMetricSink, StatsdClient};
///
/// let listener = std::net::TcpListener::bind("127.0.0.1:8080")
///     .expect("Failed to bind port");
/// let settings = wayfarer_settings::Settings::load()
///     .expect("Failed to load settings");
/// let store = wayfarer_store::from_settings(&settings)
///     .expect("Failed to configure store");
/// let metrics_client = StatsdClient::from_sink("wayfarer", NopMetricSink);
/// wayfarer_web::run(listener, settings, store, metrics_client)
///     .expect("Failed to start server")
///     .await
///     .expect("Fatal error while running server");
/// # })
/// ```
pub fn run(
    listener: TcpListener,
    settings: Settings,
    store: Arc<dyn DocumentStore>,
    metrics_client: StatsdClient,
) -> Result<Server, std::io::Error> {
    let num_workers = settings.http.workers;

    let settings = Data::new(settings);
    let store: Data<dyn DocumentStore> = Data::from(store);
    let metrics_client = Data::new(metrics_client);

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(settings.clone())
            .app_data(store.clone())
            .app_data(metrics_client.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::QueryConfig::default().error_handler(query_error))
            .wrap(middleware::Metrics)
            .wrap(middleware::Sentry)
            .wrap(TracingLogger::<WayfarerRootSpanBuilder>::new())
            .wrap(Cors::permissive())
            .service(web::scope("/api/v1").configure(endpoints::configure))
            .service(root_info)
            .configure(openapi::configure)
            // Add the behavior necessary to satisfy Dockerflow.
            .service(web::scope("").configure(dockerflow::configure))
    })
    .listen(listener)?;

    if let Some(n) = num_workers {
        server = server.workers(n);
    }

    Ok(server.run())
}

/// Report malformed JSON bodies with the usual error body.
fn json_error(error: JsonPayloadError, _: &HttpRequest) -> actix_web::Error {
    HandlerError::bad_request(error).into()
}

/// Report malformed query parameters with the usual error body.
fn query_error(error: QueryPayloadError, _: &HttpRequest) -> actix_web::Error {
    HandlerError::bad_request(error).into()
}

/// The root view, to provide information about what this service is.
///
/// This is intended to be seen by people trying to investigate what this service
/// is. It redirects to the configured public documentation, or to the API
/// documentation served by Wayfarer itself.
#[get("/")]
async fn root_info(settings: Data<Settings>) -> HttpResponse {
    let location = match &settings.public_documentation {
        Some(redirect_url) => redirect_url.to_string(),
        None => openapi::DOCS_PATH.to_string(),
    };
    HttpResponse::Found()
        .insert_header(("location", location))
        .finish()
}
