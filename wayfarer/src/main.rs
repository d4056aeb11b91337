// Only overview documentation that is not relevant to one of the more specific
// crates should go here.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

//! A REST API over the travel-sample dataset of airlines, airports, routes and
//! hotels.
//!
//! Wayfarer is split into several subcrates that work in collaboration.
//!
//! - [wayfarer-integration-tests](../wayfarer_integration_tests/index.html)
//! - [wayfarer-settings](../wayfarer_settings/index.html)
//! - [wayfarer-store](../wayfarer_store/index.html)
//! - [wayfarer-web](../wayfarer_web/index.html)

mod sentry;

use std::net::{TcpListener, UdpSocket};

use anyhow::{Context, Result};
use cadence::{BufferedUdpMetricSink, QueuingMetricSink, StatsdClient};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt, layer::SubscriberExt, Registry};
use wayfarer_settings::{LogFormat, Settings, StoreBackend};

/// Primary entry point
#[actix_rt::main]
async fn main() -> Result<()> {
    let settings = Settings::load().context("Loading settings")?;
    init_logging(&settings).context("Initializing logging")?;

    if settings.database.backend == StoreBackend::Couchbase {
        for variable in settings.database.missing_connection_values() {
            tracing::warn!(
                r#type = "app.config.missing",
                %variable,
                "{} environment variable not set",
                variable
            );
        }
    }

    let _sentry_guard = sentry::init_sentry(&settings).context("Initializing Sentry")?;
    let metrics_client = init_metrics(&settings).context("Initializing metrics")?;

    let store = wayfarer_store::from_settings(&settings).context("Configuring document store")?;
    store.connect().await;

    let listener = TcpListener::bind(settings.http.listen).context("Binding port")?;
    tracing::info!(
        r#type = "app.listening",
        address = %listener.local_addr().context("Reading bound address")?,
        "Wayfarer is listening"
    );

    let outcome = match wayfarer_web::run(listener, settings, store.clone(), metrics_client) {
        Ok(server) => server.await.context("Running wayfarer-web server"),
        Err(error) => Err::<(), _>(error).context("Starting wayfarer-web server"),
    };

    store.close().await;
    outcome
}

/// Set up logging for Wayfarer, based on settings and the `RUST_LOG` environment variable.
fn init_logging(settings: &Settings) -> Result<()> {
    LogTracer::init()?;
    let env_filter = settings.logging.levels.to_env_filter()?;
    let registry = Registry::default().with(env_filter);

    match settings.logging.format {
        LogFormat::Pretty => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().pretty()))?
        }
        LogFormat::Compact => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().compact()))?
        }
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_span_list(false),
            ),
        )?,
    };

    Ok(())
}

/// Build the statsd client that reports to the configured sink.
fn init_metrics(settings: &Settings) -> Result<StatsdClient> {
    let socket = UdpSocket::bind("0.0.0.0:0").context("Binding metrics socket")?;
    socket
        .set_nonblocking(true)
        .context("Configuring metrics socket")?;

    let address = (settings.metrics.sink_host.as_str(), settings.metrics.sink_port);
    let udp_sink = BufferedUdpMetricSink::with_capacity(
        address,
        socket,
        settings.metrics.max_queue_size_kb * 1024,
    )
    .context("Creating metrics sink")?;
    let sink = QueuingMetricSink::from(udp_sink);

    Ok(StatsdClient::builder("wayfarer", sink)
        .with_error_handler(|error| {
            tracing::warn!(r#type = "app.metrics.error", %error, "Could not send metrics");
        })
        .build())
}
