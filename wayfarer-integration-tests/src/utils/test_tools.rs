//! Tools for running tests

use std::{future::Future, net::TcpListener, sync::Arc};

use reqwest::{redirect, Client, ClientBuilder, RequestBuilder};
use tracing_futures::{Instrument, WithSubscriber};
use tracing_subscriber::layer::SubscriberExt;
use wayfarer_settings::Settings;
use wayfarer_store::{Collection, DocumentStore, MemoryStore};

use crate::utils::metrics::MetricsWatcher;

/// Run a test with a fully configured Wayfarer server backed by a
/// [`MemoryStore`].
///
/// The server will listen on a port assigned arbitrarily by the OS. The store
/// starts out empty, and has the configured hotel search index.
///
/// # Example
///
/// ```no_run
/// # use wayfarer_integration_tests::{wayfarer_test, TestingTools};
/// # async fn a_test() {
/// wayfarer_test(
///     |settings| settings.debug = false,
///     |TestingTools { test_client, store, .. }| async move {
///         assert_eq!(store.search_count(), 0) // Test goes here
///     },
/// )
/// .await
/// # }
/// ```
///
/// # Panics
/// May panic if tests could not be set up correctly.
pub async fn wayfarer_test<FSettings, FTest, Fut>(
    settings_changer: FSettings,
    test: FTest,
) -> Fut::Output
where
    FSettings: FnOnce(&mut Settings),
    FTest: FnOnce(TestingTools) -> Fut,
    Fut: Future,
{
    let test_span = tracing::info_span!("wayfarer_test");

    let settings = Settings::load_for_tests(settings_changer);

    // Request handlers run on the server's worker threads, so only events from
    // the test itself are collected here.
    let env_filter = settings
        .logging
        .levels
        .to_env_filter()
        .expect("Invalid log levels for tests");
    let tracing_subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().pretty().with_test_writer());
    let _tracing_subscriber_guard = tracing::subscriber::set_default(tracing_subscriber);

    assert_eq!(
        settings.metrics.sink_host, "0.0.0.0",
        "Tests cannot change the metrics sink host, since it is ignored"
    );
    let (metrics_watcher, metrics_client) = MetricsWatcher::new_with_client();

    let store = Arc::new(
        MemoryStore::default()
            .with_search_index(&settings.database.hotel_search_index, Collection::Hotel),
    );

    // Run server in the background
    let listener = TcpListener::bind(settings.http.listen).expect("Failed to bind to a port");
    let address = listener
        .local_addr()
        .expect("Listener has no address")
        .to_string();
    let server = wayfarer_web::run(
        listener,
        settings,
        store.clone() as Arc<dyn DocumentStore>,
        metrics_client,
    )
    .expect("Failed to start server");
    let server_handle = tokio::spawn(server.with_current_subscriber());
    let test_client = TestReqwestClient::new(address);

    let tools = TestingTools {
        test_client,
        store,
        metrics_watcher,
    };
    let rv = test(tools).instrument(test_span).await;
    server_handle.abort();
    rv
}

/// A set of tools for tests.
///
/// This is non-exhaustive, so destructuring it always needs a `..`. Tools can
/// then be added without rewriting old tests.
#[non_exhaustive]
pub struct TestingTools {
    /// A wrapper around a `reqwest::Client` that automatically uses the
    /// Wayfarer server under test.
    pub test_client: TestReqwestClient,

    /// The store the server reads and writes. Tests seed documents here and
    /// check what requests did to it.
    pub store: Arc<MemoryStore>,

    /// To make assertions about metrics.
    pub metrics_watcher: MetricsWatcher,
}

/// A wrapper around a [`reqwest::Client`] that automatically sends requests to
/// the test server.
///
/// The client is configured to not follow any redirects.
pub struct TestReqwestClient {
    /// The wrapped client.
    client: Client,

    /// The server address to implicitly use for all requests.
    address: String,
}

impl TestReqwestClient {
    /// Construct a new test client that uses `address` for every request given.
    pub fn new(address: String) -> Self {
        let client = ClientBuilder::new()
            .redirect(redirect::Policy::none())
            .build()
            .expect("Could not build test client");
        Self { client, address }
    }

    /// The full URL of `path` on the test server.
    fn url(&self, path: &str) -> String {
        assert!(path.starts_with('/'), "paths must start with /");
        format!("http://{}{}", &self.address, path)
    }

    /// Start building a GET request to the test server with the path specified.
    ///
    /// The path should start with `/`, such as `/__heartbeat__`.
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    /// Start building a POST request to the test server.
    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    /// Start building a PUT request to the test server.
    pub fn put(&self, path: &str) -> RequestBuilder {
        self.client.put(self.url(path))
    }

    /// Start building a DELETE request to the test server.
    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path))
    }
}
