#![warn(missing_docs, clippy::missing_docs_in_private_items)]

//! Access to the travel-sample documents for [Wayfarer](../wayfarer/index.html).
//!
//! Everything goes through the [`DocumentStore`] trait: key-value operations
//! on a [`Collection`], a closed catalogue of templated [`Query`]s, and full
//! text [`SearchRequest`]s. The store does no pooling, retrying or batching of
//! its own; each call is a single round trip to the backing database.

pub mod couchbase;
pub mod domain;
pub mod memory;
pub mod query;
pub mod search;

use std::{fmt, sync::Arc};

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use wayfarer_settings::{Settings, StoreBackend};

pub use crate::couchbase::CouchbaseStore;
pub use crate::domain::{
    Airline, Airport, DestinationAirport, Entity, GeoCoordinates, Hotel, HotelName, Route,
    Schedule,
};
pub use crate::memory::MemoryStore;
pub use crate::query::{Page, Query};
pub use crate::search::{HotelField, SearchHit, SearchQuery, SearchRequest, SubQueryKind};

/// The collections of the inventory scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    #[allow(missing_docs)]
    Airline,
    #[allow(missing_docs)]
    Airport,
    #[allow(missing_docs)]
    Route,
    #[allow(missing_docs)]
    Hotel,
}

impl Collection {
    /// Every collection, in a fixed order.
    pub const ALL: [Collection; 4] = [Self::Airline, Self::Airport, Self::Route, Self::Hotel];

    /// The collection name as it exists in the database.
    pub fn name(self) -> &'static str {
        match self {
            Self::Airline => "airline",
            Self::Airport => "airport",
            Self::Route => "route",
            Self::Hotel => "hotel",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The longest key the database accepts, in bytes.
const MAX_KEY_LENGTH: usize = 250;

/// A caller supplied document key, such as `airline_10`.
///
/// Only the format is checked: not empty, at most 250 bytes, and no control
/// characters. Keys are never generated.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey(String);

impl DocumentKey {
    /// The key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DocumentKey {
    type Error = StoreError;

    fn try_from(key: String) -> Result<Self, Self::Error> {
        if key.is_empty() {
            Err(StoreError::InvalidKey("key must not be empty".to_string()))
        } else if key.len() > MAX_KEY_LENGTH {
            Err(StoreError::InvalidKey(format!(
                "key must be at most {} bytes",
                MAX_KEY_LENGTH
            )))
        } else if key.chars().any(char::is_control) {
            Err(StoreError::InvalidKey(
                "key must not contain control characters".to_string(),
            ))
        } else {
            Ok(Self(key))
        }
    }
}

impl TryFrom<&str> for DocumentKey {
    type Error = StoreError;

    fn try_from(key: &str) -> Result<Self, Self::Error> {
        key.to_string().try_into()
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors that may occur while talking to the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document exists with the requested key.
    #[error("Document not found")]
    NotFound,

    /// A document with the key already exists, and the operation would not
    /// replace it.
    #[error("Document already exists")]
    AlreadyExists,

    /// The key is not in a format the store accepts.
    #[error("Invalid document key: {0}")]
    InvalidKey(String),

    /// The store could not be reached, or refused the credentials.
    #[error("Could not connect to the database: {0:#}")]
    Connection(#[source] anyhow::Error),

    /// Anything else the store reported.
    #[error("{0:#}")]
    Unexpected(#[source] anyhow::Error),
}

impl StoreError {
    /// A short name for the kind of error, for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::InvalidKey(_) => "invalid_key",
            Self::Connection(_) => "connection",
            Self::Unexpected(_) => "unexpected",
        }
    }
}

/// A backend holding the travel-sample documents.
///
/// Implementations are shared by every request handler, so they must be safe
/// to use concurrently.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// An operator-visible name for this store.
    fn name(&self) -> String;

    /// Establish the connection and check that the expected scope exists.
    ///
    /// Problems are logged as warnings and are not fatal: requests made later
    /// will fail individually instead. Calling this more than once has no
    /// further effect.
    async fn connect(&self) {}

    /// Check that the store is reachable right now.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Read the document stored under `key`.
    async fn get(&self, collection: Collection, key: &DocumentKey) -> Result<Value, StoreError>;

    /// Create a document. Fails with [`StoreError::AlreadyExists`] if `key` is taken.
    async fn insert(
        &self,
        collection: Collection,
        key: &DocumentKey,
        document: &Value,
    ) -> Result<(), StoreError>;

    /// Create or wholesale replace a document.
    async fn upsert(
        &self,
        collection: Collection,
        key: &DocumentKey,
        document: &Value,
    ) -> Result<(), StoreError>;

    /// Delete a document. Fails with [`StoreError::NotFound`] if there was none.
    async fn remove(&self, collection: Collection, key: &DocumentKey) -> Result<(), StoreError>;

    /// Run one of the catalogued queries and return its rows.
    async fn query(&self, query: &Query) -> Result<Vec<Value>, StoreError>;

    /// Run a full text search against `index`.
    async fn search(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<Vec<SearchHit>, StoreError>;

    /// Release the connection. The store should not be used afterwards.
    async fn close(&self) {}
}

/// Build the store selected by `settings`.
///
/// The returned store has not contacted the database yet. Call
/// [`DocumentStore::connect`] to do so eagerly, otherwise it will happen on
/// first use.
///
/// # Errors
/// If the HTTP client for the Couchbase store cannot be created.
pub fn from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match settings.database.backend {
        StoreBackend::Couchbase => Arc::new(
            CouchbaseStore::new(&settings.database).context("Setting up the Couchbase store")?,
        ),
        StoreBackend::Memory => Arc::new(
            MemoryStore::default()
                .with_search_index(&settings.database.hotel_search_index, Collection::Hotel),
        ),
    };
    tracing::info!(r#type = "store.configured", store = %store.name(), "Document store configured");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parameterized::parameterized;

    #[test]
    fn ordinary_keys_are_accepted() {
        let key = DocumentKey::try_from("airline_10").expect("valid key");
        assert_eq!(key.as_str(), "airline_10");
    }

    #[parameterized(key = {
        String::new(),
        "a".repeat(251),
        "airline\n10".to_string(),
    })]
    fn malformed_keys_are_rejected(key: String) {
        assert!(matches!(
            DocumentKey::try_from(key),
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn memory_backend_from_test_settings() {
        let settings = Settings::load_for_tests(|_| ());
        let store = from_settings(&settings).expect("store should build");
        assert_eq!(store.name(), "MemoryStore");
    }
}
