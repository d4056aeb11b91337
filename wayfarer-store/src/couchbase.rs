//! A [`DocumentStore`] backed by a Couchbase cluster.
//!
//! The cluster is reached over its REST services: key-value operations and
//! catalogued queries go to the Query service as SQL++, and searches go to the
//! Search service.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::OnceCell;
use wayfarer_settings::DatabaseSettings;

use crate::{Collection, DocumentKey, DocumentStore, Query, SearchHit, SearchRequest, StoreError};

/// Query service error for a failed login.
const AUTHENTICATION_FAILURE: u32 = 10000;
/// Query service error for a generic DML failure. Duplicate keys are reported
/// with this code by some server versions.
const DML_ERROR: u32 = 12009;
/// Query service error for an insert on an existing key.
const DUPLICATE_KEY: u32 = 17012;

/// The base URLs of the cluster services used by the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    /// The Query service, such as `http://localhost:8093`.
    pub query: Url,
    /// The Search service, such as `http://localhost:8094`.
    pub search: Url,
}

impl Endpoints {
    /// Work out the service URLs from the settings.
    ///
    /// Explicit `query_url` and `search_url` settings win. Otherwise the first
    /// host of the connection string is used with the default service ports,
    /// over TLS for `couchbases://`.
    ///
    /// # Errors
    /// If a URL is invalid, or if a URL must be derived but there is no usable
    /// connection string.
    pub fn from_settings(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        let derived = || -> anyhow::Result<(Url, Url)> {
            let connection_string = settings
                .connection_string
                .as_deref()
                .context("No connection string is configured")?;
            derive_service_urls(connection_string)
        };

        let (query, search) = match (&settings.query_url, &settings.search_url) {
            (Some(query), Some(search)) => (parse_url(query)?, parse_url(search)?),
            (Some(query), None) => (parse_url(query)?, derived()?.1),
            (None, Some(search)) => (derived()?.0, parse_url(search)?),
            (None, None) => derived()?,
        };

        Ok(Self { query, search })
    }
}

/// Parse a configured service URL.
fn parse_url(url: &str) -> anyhow::Result<Url> {
    Url::parse(url).with_context(|| format!("Invalid service URL {:?}", url))
}

/// The Query and Search service URLs for a `couchbase://` or `couchbases://`
/// connection string.
fn derive_service_urls(connection_string: &str) -> anyhow::Result<(Url, Url)> {
    let (scheme, rest) = connection_string
        .split_once("://")
        .with_context(|| format!("Connection string {:?} has no scheme", connection_string))?;

    let (http_scheme, query_port, search_port) = match scheme {
        "couchbase" => ("http", 8093, 8094),
        "couchbases" => ("https", 18093, 18094),
        other => bail!("Unsupported connection string scheme {:?}", other),
    };

    let hosts = rest.split(['/', '?']).next().unwrap_or_default();
    let host = hosts.split(',').next().unwrap_or_default().trim();
    // The port in a connection string is the key-value port, never a service port.
    let host = match host.rsplit_once(':') {
        Some((name, port)) if port.parse::<u16>().is_ok() && !name.contains(':') => name,
        _ => host,
    };
    if host.is_empty() {
        bail!("Connection string {:?} has no host", connection_string);
    }

    let query = parse_url(&format!("{}://{}:{}", http_scheme, host, query_port))?;
    let search = parse_url(&format!("{}://{}:{}", http_scheme, host, search_port))?;
    Ok((query, search))
}

/// The SQL++ statements for key-value access to one collection.
struct KvStatements {
    /// Read a document.
    get: &'static str,
    /// Create a document, failing if the key is taken.
    insert: &'static str,
    /// Create or replace a document.
    upsert: &'static str,
    /// Delete a document, returning its key if it existed.
    remove: &'static str,
}

/// Build the [`KvStatements`] for a collection name known at compile time.
macro_rules! kv_statements {
    ($collection:literal) => {
        KvStatements {
            get: concat!("SELECT RAW d FROM `", $collection, "` AS d USE KEYS $key"),
            insert: concat!("INSERT INTO `", $collection, "` (KEY, VALUE) VALUES ($key, $doc)"),
            upsert: concat!("UPSERT INTO `", $collection, "` (KEY, VALUE) VALUES ($key, $doc)"),
            remove: concat!(
                "DELETE FROM `",
                $collection,
                "` USE KEYS $key RETURNING RAW META().id"
            ),
        }
    };
}

impl KvStatements {
    /// The statements for `collection`.
    fn for_collection(collection: Collection) -> Self {
        match collection {
            Collection::Airline => kv_statements!("airline"),
            Collection::Airport => kv_statements!("airport"),
            Collection::Route => kv_statements!("route"),
            Collection::Hotel => kv_statements!("hotel"),
        }
    }
}

/// A Query service request body. Named arguments are top level fields
/// prefixed with `$`.
#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    /// The SQL++ statement.
    statement: &'a str,
    /// The `default:bucket.scope` that unqualified collection names resolve in.
    #[serde(skip_serializing_if = "Option::is_none")]
    query_context: Option<&'a str>,
    /// The `$name` arguments.
    #[serde(flatten)]
    args: Map<String, Value>,
}

/// The parts of a Query service response the store uses.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    /// The rows produced.
    #[serde(default)]
    results: Vec<Value>,
    /// Errors reported for the statement, if it failed.
    #[serde(default)]
    errors: Vec<QueryError>,
}

/// One error from the Query service.
#[derive(Debug, Deserialize)]
struct QueryError {
    /// Numeric error code.
    code: u32,
    /// Error message.
    msg: String,
}

/// The parts of a Search service response the store uses.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    /// The matching documents.
    #[serde(default)]
    hits: Vec<SearchHit>,
}

/// Turn a failed Query service response into a [`StoreError`].
fn classify_query_errors(status: StatusCode, errors: &[QueryError]) -> StoreError {
    let first = match errors.first() {
        Some(error) => error,
        None if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
            return StoreError::Connection(anyhow!("The cluster rejected the credentials"))
        }
        None => {
            return StoreError::Unexpected(anyhow!(
                "Query service responded with status {}",
                status
            ))
        }
    };

    match first.code {
        DUPLICATE_KEY => StoreError::AlreadyExists,
        DML_ERROR if first.msg.contains("Duplicate Key") => StoreError::AlreadyExists,
        AUTHENTICATION_FAILURE => StoreError::Connection(anyhow!("{}", first.msg)),
        _ if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
            StoreError::Connection(anyhow!("{}", first.msg))
        }
        code => StoreError::Unexpected(anyhow!("{} (code {})", first.msg, code)),
    }
}

/// A [`DocumentStore`] talking to the Query and Search services of a
/// Couchbase cluster.
pub struct CouchbaseStore {
    /// HTTP client used for every request. Owns connection pooling.
    client: reqwest::Client,
    /// The service URLs, or why they could not be determined.
    endpoints: Result<Endpoints, String>,
    /// User for basic auth.
    username: Option<String>,
    /// Password for basic auth.
    password: Option<String>,
    /// The bucket holding the data.
    bucket: String,
    /// The scope holding the collections.
    scope: String,
    /// `default:`bucket`.`scope``, sent with every scoped statement.
    query_context: String,
    /// Timeout for the bootstrap checks and for pings.
    bootstrap_timeout: std::time::Duration,
    /// Set once the bootstrap checks have run.
    bootstrapped: OnceCell<()>,
    /// Set by [`DocumentStore::close`].
    closed: AtomicBool,
}

impl CouchbaseStore {
    /// Create a store for the cluster described by `settings`.
    ///
    /// Nothing is sent to the cluster until the store is first used. Missing
    /// connection values are not an error here; every operation will fail with
    /// [`StoreError::Connection`] instead.
    ///
    /// # Errors
    /// If the HTTP client cannot be built.
    pub fn new(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .context("Building HTTP client for the cluster")?;

        let endpoints = Endpoints::from_settings(settings).map_err(|error| format!("{:#}", error));

        Ok(Self {
            client,
            endpoints,
            username: settings.username.clone(),
            password: settings.password.clone(),
            bucket: settings.bucket.clone(),
            scope: settings.scope.clone(),
            query_context: format!("default:`{}`.`{}`", settings.bucket, settings.scope),
            bootstrap_timeout: settings.bootstrap_timeout,
            bootstrapped: OnceCell::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// The service URLs, or a connection error if they are unknown or the store
    /// has been closed.
    fn endpoints(&self) -> Result<&Endpoints, StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Connection(anyhow!("The store has been closed")));
        }
        self.endpoints
            .as_ref()
            .map_err(|message| StoreError::Connection(anyhow!("{}", message)))
    }

    /// Add credentials to a request, if any are configured.
    fn authenticated(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(username) => request.basic_auth(username, self.password.as_deref()),
            None => request,
        }
    }

    /// Run the bootstrap checks, once.
    async fn ensure_bootstrapped(&self) {
        self.bootstrapped.get_or_init(|| self.bootstrap()).await;
    }

    /// Check that the cluster answers and that the scope exists, logging
    /// warnings if not.
    async fn bootstrap(&self) {
        tracing::info!(r#type = "store.couchbase.bootstrap", bucket = %self.bucket, "Connecting to the cluster");

        if let Err(error) = self.ping_with_timeout().await {
            tracing::warn!(
                r#type = "store.couchbase.unreachable",
                %error,
                "Could not connect to the cluster. Ensure that the {} bucket exists and the connection settings are correct.",
                self.bucket
            );
            return;
        }

        match self.scope_exists().await {
            Ok(true) => {
                tracing::debug!(r#type = "store.couchbase.scope", scope = %self.scope, "Found scope")
            }
            Ok(false) => tracing::warn!(
                r#type = "store.couchbase.missing-scope",
                "The {} scope does not exist in the bucket. Ensure that you have the {} scope in your {} bucket.",
                self.scope,
                self.scope,
                self.bucket
            ),
            Err(error) => tracing::warn!(
                r#type = "store.couchbase.scope-check-failed",
                %error,
                "Error fetching scopes in the cluster. Ensure that the {} bucket exists.",
                self.bucket
            ),
        }
    }

    /// `GET /admin/ping` on the Query service.
    async fn ping_with_timeout(&self) -> Result<(), StoreError> {
        let endpoints = self.endpoints()?;
        let url = endpoints
            .query
            .join("admin/ping")
            .map_err(|error| StoreError::Unexpected(error.into()))?;

        let response = self
            .authenticated(self.client.get(url))
            .timeout(self.bootstrap_timeout)
            .send()
            .await
            .map_err(|error| StoreError::Connection(error.into()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(StoreError::Connection(anyhow!(
                "Query service ping responded with status {}",
                status
            )))
        }
    }

    /// If the configured scope is one of the bucket's scopes.
    async fn scope_exists(&self) -> Result<bool, StoreError> {
        let mut args = Map::new();
        args.insert("bucket".to_string(), self.bucket.clone().into());
        let names = self
            .send_statement(
                "SELECT RAW name FROM system:scopes WHERE `bucket` = $bucket",
                args,
                None,
            )
            .await?;
        Ok(names.iter().any(|name| name.as_str() == Some(self.scope.as_str())))
    }

    /// Run a statement scoped to the bucket and scope, after bootstrapping.
    async fn execute(
        &self,
        statement: &str,
        args: Map<String, Value>,
    ) -> Result<Vec<Value>, StoreError> {
        self.ensure_bootstrapped().await;
        self.send_statement(statement, args, Some(&self.query_context))
            .await
    }

    /// POST a statement to the Query service and return its rows.
    async fn send_statement(
        &self,
        statement: &str,
        args: Map<String, Value>,
        query_context: Option<&str>,
    ) -> Result<Vec<Value>, StoreError> {
        let endpoints = self.endpoints()?;
        let url = endpoints
            .query
            .join("query/service")
            .map_err(|error| StoreError::Unexpected(error.into()))?;

        let body = QueryRequest {
            statement,
            query_context,
            args: args
                .into_iter()
                .map(|(name, value)| (format!("${}", name), value))
                .collect(),
        };

        tracing::debug!(r#type = "store.couchbase.statement", %statement, "Running statement");

        let response = self
            .authenticated(self.client.post(url))
            .json(&body)
            .send()
            .await
            .map_err(|error| StoreError::Connection(error.into()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|error| StoreError::Connection(error.into()))?;

        match serde_json::from_str::<QueryResponse>(&text) {
            Ok(parsed) if parsed.errors.is_empty() && status.is_success() => Ok(parsed.results),
            Ok(parsed) => Err(classify_query_errors(status, &parsed.errors)),
            Err(_) if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                Err(classify_query_errors(status, &[]))
            }
            Err(error) => Err(StoreError::Unexpected(anyhow!(
                "Could not read Query service response with status {}: {}",
                status,
                error
            ))),
        }
    }

    /// Arguments for a key-value statement.
    fn kv_args(key: &DocumentKey, document: Option<&Value>) -> Map<String, Value> {
        let mut args = Map::new();
        args.insert("key".to_string(), key.as_str().into());
        if let Some(document) = document {
            args.insert("doc".to_string(), document.clone());
        }
        args
    }
}

#[async_trait]
impl DocumentStore for CouchbaseStore {
    fn name(&self) -> String {
        format!("CouchbaseStore({}.{})", self.bucket, self.scope)
    }

    async fn connect(&self) {
        self.ensure_bootstrapped().await;
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.ping_with_timeout().await
    }

    async fn get(&self, collection: Collection, key: &DocumentKey) -> Result<Value, StoreError> {
        let statements = KvStatements::for_collection(collection);
        self.execute(statements.get, Self::kv_args(key, None))
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound)
    }

    async fn insert(
        &self,
        collection: Collection,
        key: &DocumentKey,
        document: &Value,
    ) -> Result<(), StoreError> {
        let statements = KvStatements::for_collection(collection);
        self.execute(statements.insert, Self::kv_args(key, Some(document)))
            .await?;
        Ok(())
    }

    async fn upsert(
        &self,
        collection: Collection,
        key: &DocumentKey,
        document: &Value,
    ) -> Result<(), StoreError> {
        let statements = KvStatements::for_collection(collection);
        self.execute(statements.upsert, Self::kv_args(key, Some(document)))
            .await?;
        Ok(())
    }

    async fn remove(&self, collection: Collection, key: &DocumentKey) -> Result<(), StoreError> {
        let statements = KvStatements::for_collection(collection);
        let removed = self
            .execute(statements.remove, Self::kv_args(key, None))
            .await?;
        if removed.is_empty() {
            Err(StoreError::NotFound)
        } else {
            Ok(())
        }
    }

    async fn query(&self, query: &Query) -> Result<Vec<Value>, StoreError> {
        self.execute(query.statement(), query.parameters()).await
    }

    async fn search(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<Vec<SearchHit>, StoreError> {
        self.ensure_bootstrapped().await;
        let endpoints = self.endpoints()?;
        let url = endpoints
            .search
            .join(&format!(
                "api/bucket/{}/scope/{}/index/{}/query",
                self.bucket, self.scope, index
            ))
            .map_err(|error| StoreError::Unexpected(error.into()))?;

        let response = self
            .authenticated(self.client.post(url))
            .json(request)
            .send()
            .await
            .map_err(|error| StoreError::Connection(error.into()))?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(StoreError::Connection(anyhow!(
                "The Search service rejected the credentials"
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StoreError::Unexpected(anyhow!(
                "Search on index {} failed with status {}: {}",
                index,
                status,
                text
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .context("Reading Search service response")
            .map_err(StoreError::Unexpected)?;
        Ok(parsed.hits)
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::info!(r#type = "store.couchbase.close", "Closed connection to the cluster");
        }
    }
}

impl std::fmt::Debug for CouchbaseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouchbaseStore")
            .field("endpoints", &self.endpoints)
            .field("bucket", &self.bucket)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{autocomplete_request, hotel_filter_request};
    use crate::{Hotel, Page};
    use httpmock::{Method::GET, Method::POST, MockServer};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wayfarer_settings::Settings;

    /// A store pointed at `server` for both services.
    fn store_for(server: &MockServer) -> CouchbaseStore {
        let settings = Settings::load_for_tests(|settings| {
            settings.database.query_url = Some(server.base_url());
            settings.database.search_url = Some(server.base_url());
            settings.database.username = Some("Administrator".to_string());
            settings.database.password = Some("password".to_string());
        });
        CouchbaseStore::new(&settings.database).expect("store should build")
    }

    fn key(key: &str) -> DocumentKey {
        DocumentKey::try_from(key).unwrap()
    }

    #[test]
    fn endpoints_are_derived_from_the_connection_string() {
        let mut settings = Settings::load_for_tests(|_| ()).database;
        settings.connection_string = Some("couchbase://db1.example.com,db2.example.com".into());
        let endpoints = Endpoints::from_settings(&settings).unwrap();
        assert_eq!(endpoints.query.as_str(), "http://db1.example.com:8093/");
        assert_eq!(endpoints.search.as_str(), "http://db1.example.com:8094/");

        settings.connection_string = Some("couchbases://cb.example.cloud:11207?ssl=no_verify".into());
        let endpoints = Endpoints::from_settings(&settings).unwrap();
        assert_eq!(endpoints.query.as_str(), "https://cb.example.cloud:18093/");
        assert_eq!(endpoints.search.as_str(), "https://cb.example.cloud:18094/");
    }

    #[test]
    fn explicit_service_urls_win() {
        let mut settings = Settings::load_for_tests(|_| ()).database;
        settings.connection_string = Some("couchbase://localhost".into());
        settings.search_url = Some("http://search.internal:9000".into());
        let endpoints = Endpoints::from_settings(&settings).unwrap();
        assert_eq!(endpoints.query.as_str(), "http://localhost:8093/");
        assert_eq!(endpoints.search.as_str(), "http://search.internal:9000/");
    }

    #[test]
    fn unusable_connection_strings_are_rejected() {
        let mut settings = Settings::load_for_tests(|_| ()).database;
        settings.connection_string = None;
        assert!(Endpoints::from_settings(&settings).is_err());

        settings.connection_string = Some("http://localhost".into());
        assert!(Endpoints::from_settings(&settings).is_err());
    }

    #[test]
    fn kv_statements_name_their_collection() {
        for collection in Collection::ALL {
            let statements = KvStatements::for_collection(collection);
            let quoted = format!("`{}`", collection.name());
            for statement in [
                statements.get,
                statements.insert,
                statements.upsert,
                statements.remove,
            ] {
                assert!(statement.contains(&quoted), "{}", statement);
            }
        }
    }

    #[actix_rt::test]
    async fn missing_connection_string_fails_each_operation() {
        let settings = Settings::load_for_tests(|settings| {
            settings.database.connection_string = None;
        });
        let store = CouchbaseStore::new(&settings.database).unwrap();
        store.connect().await;
        assert!(matches!(
            store.get(Collection::Airline, &key("airline_10")).await,
            Err(StoreError::Connection(_))
        ));
    }

    #[actix_rt::test]
    async fn get_sends_scoped_statement() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/query/service")
                    .json_body(json!({
                        "statement": "SELECT RAW d FROM `airline` AS d USE KEYS $key",
                        "query_context": "default:`travel-sample`.`inventory`",
                        "$key": "airline_10",
                    }));
                then.status(200).json_body(json!({
                    "status": "success",
                    "results": [{"name": "40-Mile Air", "country": "United States"}],
                }));
            })
            .await;

        let store = store_for(&server);
        let document = store
            .get(Collection::Airline, &key("airline_10"))
            .await
            .expect("document should be found");

        assert_eq!(document["name"], "40-Mile Air");
        mock.assert_async().await;
    }

    #[actix_rt::test]
    async fn empty_get_is_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/query/service");
                then.status(200)
                    .json_body(json!({"status": "success", "results": []}));
            })
            .await;

        let store = store_for(&server);
        assert!(matches!(
            store.get(Collection::Airline, &key("airline_missing")).await,
            Err(StoreError::NotFound)
        ));
    }

    #[actix_rt::test]
    async fn duplicate_insert_already_exists() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/query/service")
                    .body_contains("INSERT INTO `hotel`");
                then.status(200).json_body(json!({
                    "status": "errors",
                    "errors": [{"code": 12009, "msg": "DML Error, possible causes include concurrent modification. Error - cause: Duplicate Key hotel_1"}],
                }));
            })
            .await;

        let store = store_for(&server);
        let result = store
            .insert(Collection::Hotel, &key("hotel_1"), &json!({"name": "Inn"}))
            .await;
        assert!(matches!(result, Err(StoreError::AlreadyExists)));
    }

    #[actix_rt::test]
    async fn empty_delete_is_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/query/service")
                    .body_contains("DELETE FROM `route`");
                then.status(200)
                    .json_body(json!({"status": "success", "results": []}));
            })
            .await;

        let store = store_for(&server);
        assert!(matches!(
            store.remove(Collection::Route, &key("route_1")).await,
            Err(StoreError::NotFound)
        ));
    }

    #[actix_rt::test]
    async fn authentication_failure_is_a_connection_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/query/service");
                then.status(401).json_body(json!({
                    "status": "fatal",
                    "errors": [{"code": 10000, "msg": "Authentication Failure"}],
                }));
            })
            .await;

        let store = store_for(&server);
        assert!(matches!(
            store.get(Collection::Airport, &key("airport_1254")).await,
            Err(StoreError::Connection(_))
        ));
    }

    #[actix_rt::test]
    async fn other_query_errors_are_unexpected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/query/service");
                then.status(404).json_body(json!({
                    "status": "fatal",
                    "errors": [{"code": 12003, "msg": "Keyspace not found in CB datastore"}],
                }));
            })
            .await;

        let store = store_for(&server);
        let error = store
            .query(&Query::AirlineList {
                country: None,
                page: Page::default(),
            })
            .await
            .unwrap_err();
        assert!(matches!(error, StoreError::Unexpected(_)));
        assert!(error.to_string().contains("Keyspace not found"));
    }

    #[actix_rt::test]
    async fn search_sends_request_body() {
        let server = MockServer::start_async().await;
        let filter = Hotel {
            city: Some("Paris".to_string()),
            name: Some("Inn".to_string()),
            ..Hotel::default()
        };
        let request = hotel_filter_request(&filter, Page::default()).unwrap();

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/bucket/travel-sample/scope/inventory/index/hotel_search/query")
                    .json_body(json!({
                        "query": {
                            "conjuncts": [
                                {"match": "Inn", "field": "name"},
                                {"term": "Paris", "field": "city"},
                            ]
                        },
                        "size": 10,
                        "from": 0,
                        "fields": ["*"],
                    }));
                then.status(200).json_body(json!({
                    "status": {"total": 1, "failed": 0, "successful": 1},
                    "hits": [{
                        "index": "hotel_search_1",
                        "id": "hotel_1",
                        "score": 0.8,
                        "fields": {"name": "Paris Inn", "city": "Paris"},
                    }],
                    "total_hits": 1,
                }));
            })
            .await;

        let store = store_for(&server);
        let hits = store.search("hotel_search", &request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "hotel_1");
    }

    #[actix_rt::test]
    async fn failed_search_is_unexpected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/bucket/travel-sample/scope/inventory/index/hotel_search/query");
                then.status(400).body("index not found");
            })
            .await;

        let store = store_for(&server);
        let error = store
            .search("hotel_search", &autocomplete_request("sea"))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("index not found"));
    }

    #[actix_rt::test]
    async fn missing_scope_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/query/service")
                    .body_contains("system:scopes");
                then.status(200)
                    .json_body(json!({"status": "success", "results": ["_default", "tenant_agent_00"]}));
            })
            .await;

        let store = store_for(&server);
        assert!(!store.scope_exists().await.unwrap());
    }

    #[actix_rt::test]
    async fn bootstrap_runs_once() {
        let server = MockServer::start_async().await;
        let ping = server
            .mock_async(|when, then| {
                when.method(GET).path("/admin/ping");
                then.status(200);
            })
            .await;
        let scopes = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/query/service")
                    .body_contains("system:scopes");
                then.status(200)
                    .json_body(json!({"status": "success", "results": ["_default", "inventory"]}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/query/service")
                    .body_contains("UPSERT INTO `airline`");
                then.status(200)
                    .json_body(json!({"status": "success", "results": []}));
            })
            .await;

        let store = store_for(&server);
        store.connect().await;
        let document = json!({"name": "Sample Airline", "country": "United States"});
        store
            .upsert(Collection::Airline, &key("airline_1"), &document)
            .await
            .unwrap();
        store
            .upsert(Collection::Airline, &key("airline_1"), &document)
            .await
            .unwrap();

        ping.assert_hits_async(1).await;
        scopes.assert_hits_async(1).await;
    }

    #[actix_rt::test]
    async fn closed_store_refuses_operations() {
        let server = MockServer::start_async().await;
        let store = store_for(&server);
        store.close().await;
        assert!(matches!(store.ping().await, Err(StoreError::Connection(_))));
    }
}
