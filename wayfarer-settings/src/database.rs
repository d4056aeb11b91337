//! Settings for the document store the API reads and writes.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use std::{fmt, time::Duration};

/// Which document store implementation to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// A Couchbase cluster, reached over its Query and Search REST services.
    Couchbase,
    /// An in-process store. Data does not survive a restart.
    Memory,
}

/// Settings for the document store holding the travel-sample data.
#[serde_as]
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// The store implementation to use.
    pub backend: StoreBackend,

    /// Connection string for the cluster, such as `couchbase://localhost` or
    /// `couchbases://cb.example.cloud.couchbase.com`. Usually provided with the
    /// `DB_CONN_STR` environment variable.
    #[serde(default)]
    pub connection_string: Option<String>,

    /// Cluster user name, usually provided with `DB_USERNAME`.
    #[serde(default)]
    pub username: Option<String>,

    /// Cluster password, usually provided with `DB_PASSWORD`.
    #[serde(default)]
    pub password: Option<String>,

    /// The bucket holding the sample data.
    pub bucket: String,

    /// The scope inside `bucket` holding the airline, airport, route and hotel
    /// collections.
    pub scope: String,

    /// The full text search index over the hotel collection.
    pub hotel_search_index: String,

    /// Base URL of the Query service. Derived from `connection_string` if not set.
    #[serde(default)]
    pub query_url: Option<String>,

    /// Base URL of the Search service. Derived from `connection_string` if not set.
    #[serde(default)]
    pub search_url: Option<String>,

    /// How long to wait for the cluster to answer while bootstrapping.
    #[serde_as(as = "DurationSeconds")]
    #[serde(rename = "bootstrap_timeout_sec")]
    pub bootstrap_timeout: Duration,

    /// Timeout applied to every request made to the cluster.
    #[serde_as(as = "DurationSeconds")]
    #[serde(rename = "request_timeout_sec")]
    pub request_timeout: Duration,
}

impl DatabaseSettings {
    /// The environment variables for connection values that were not provided
    /// by any source.
    pub fn missing_connection_values(&self) -> Vec<&'static str> {
        [
            ("DB_CONN_STR", self.connection_string.is_none()),
            ("DB_USERNAME", self.username.is_none()),
            ("DB_PASSWORD", self.password.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then(|| name))
        .collect()
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("backend", &self.backend)
            .field("connection_string", &self.connection_string)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("bucket", &self.bucket)
            .field("scope", &self.scope)
            .field("hotel_search_index", &self.hotel_search_index)
            .field("query_url", &self.query_url)
            .field("search_url", &self.search_url)
            .field("bootstrap_timeout", &self.bootstrap_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::Settings;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_values_are_reported_by_variable_name() {
        let mut settings = Settings::load_for_tests(|_| ()).database;
        settings.connection_string = Some("couchbase://localhost".to_string());
        settings.username = None;
        settings.password = None;
        assert_eq!(
            settings.missing_connection_values(),
            vec!["DB_USERNAME", "DB_PASSWORD"]
        );
    }

    #[test]
    fn password_is_not_printed() {
        let mut settings = Settings::load_for_tests(|_| ()).database;
        settings.password = Some("hunter2".to_string());
        assert!(!format!("{:?}", settings).contains("hunter2"));
    }
}
