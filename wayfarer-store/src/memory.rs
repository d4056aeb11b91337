//! A [`DocumentStore`] that keeps documents in process memory.
//!
//! Catalogued queries and searches are evaluated directly over the stored
//! documents with the same ordering, filtering and pagination the cluster
//! applies. Nothing survives a restart.

use std::{
    cmp::Ordering as CmpOrdering,
    collections::{BTreeSet, HashMap},
    sync::atomic::{AtomicUsize, Ordering},
};

use anyhow::anyhow;
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use serde_json::{Map, Value};

use crate::{
    Collection, DocumentKey, DocumentStore, Entity, Page, Query, SearchHit, SearchQuery,
    SearchRequest, StoreError,
};

/// Fields returned by the airline queries.
const AIRLINE_FIELDS: [&str; 5] = ["callsign", "country", "iata", "icao", "name"];

/// Fields returned by the airport list query.
const AIRPORT_FIELDS: [&str; 7] = ["airportname", "city", "country", "faa", "geo", "icao", "tz"];

/// An in-memory [`DocumentStore`].
pub struct MemoryStore {
    /// Documents of each collection, by key.
    collections: HashMap<Collection, DashMap<String, Value>>,

    /// Which collection each search index covers.
    search_indexes: HashMap<String, Collection>,

    /// How many searches have been run.
    searches: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            collections: Collection::ALL
                .iter()
                .map(|collection| (*collection, DashMap::new()))
                .collect(),
            search_indexes: HashMap::new(),
            searches: AtomicUsize::new(0),
        }
    }
}

impl MemoryStore {
    /// Make `collection` searchable through the index called `index`.
    #[must_use]
    pub fn with_search_index<S: Into<String>>(mut self, index: S, collection: Collection) -> Self {
        self.search_indexes.insert(index.into(), collection);
        self
    }

    /// How many searches have been run against this store, successful or not.
    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    /// Store `entity` under `key`, replacing any existing document.
    ///
    /// # Errors
    /// If the key is invalid, or the entity can't be represented as JSON.
    pub fn put<E: Entity>(&self, key: &str, entity: &E) -> Result<(), StoreError> {
        let key = DocumentKey::try_from(key)?;
        let document =
            serde_json::to_value(entity).map_err(|error| StoreError::Unexpected(error.into()))?;
        self.documents(E::COLLECTION)?
            .insert(key.as_str().to_string(), document);
        Ok(())
    }

    /// The documents of `collection`.
    fn documents(&self, collection: Collection) -> Result<&DashMap<String, Value>, StoreError> {
        self.collections
            .get(&collection)
            .ok_or_else(|| StoreError::Unexpected(anyhow!("Unknown collection {}", collection)))
    }

    /// Every document of `collection`, ordered by key.
    fn snapshot(&self, collection: Collection) -> Result<Vec<(String, Value)>, StoreError> {
        let mut documents: Vec<(String, Value)> = self
            .documents(collection)?
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        documents.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(documents)
    }

    /// Airlines or airports matching an optional country, ordered by
    /// `order_by`, projected to `fields`.
    fn list(
        &self,
        collection: Collection,
        country: Option<&str>,
        order_by: &str,
        fields: &[&str],
        page: Page,
    ) -> Result<Vec<Value>, StoreError> {
        let mut documents: Vec<Value> = self
            .snapshot(collection)?
            .into_iter()
            .map(|(_, document)| document)
            .filter(|document| {
                country.map_or(true, |country| {
                    document.get("country").and_then(Value::as_str) == Some(country)
                })
            })
            .collect();
        documents.sort_by(|a, b| compare_field(a, b, order_by));
        Ok(page.apply(documents.iter().map(|document| project(document, fields))))
    }

    /// Airlines with at least one route into `airport`.
    fn airlines_to_airport(&self, airport: &str, page: Page) -> Result<Vec<Value>, StoreError> {
        let airline_ids: BTreeSet<String> = self
            .snapshot(Collection::Route)?
            .into_iter()
            .filter(|(_, route)| field_str(route, "destinationairport") == Some(airport))
            .filter_map(|(_, route)| field_str(&route, "airlineid").map(ToString::to_string))
            .collect();

        let airlines = self.documents(Collection::Airline)?;
        let mut joined: Vec<Value> = airline_ids
            .iter()
            .filter_map(|id| airlines.get(id).map(|airline| airline.value().clone()))
            .collect();
        joined.sort_by(|a, b| compare_field(a, b, "name"));
        Ok(page.apply(joined.iter().map(|airline| project(airline, &AIRLINE_FIELDS))))
    }

    /// Distinct destinations of non-stop routes leaving `airport`.
    fn direct_connections(&self, airport: &str, page: Page) -> Result<Vec<Value>, StoreError> {
        let airport_known = self
            .documents(Collection::Airport)?
            .iter()
            .any(|entry| field_str(entry.value(), "faa") == Some(airport));
        if !airport_known {
            return Ok(vec![]);
        }

        let destinations: BTreeSet<String> = self
            .snapshot(Collection::Route)?
            .into_iter()
            .filter(|(_, route)| {
                field_str(route, "sourceairport") == Some(airport)
                    && route.get("stops").and_then(Value::as_i64) == Some(0)
            })
            .filter_map(|(_, route)| {
                field_str(&route, "destinationairport").map(ToString::to_string)
            })
            .collect();

        Ok(page.apply(destinations.into_iter().map(|destination| {
            let mut row = Map::new();
            row.insert("destinationairport".to_string(), destination.into());
            Value::Object(row)
        })))
    }
}

/// A string field of a document.
fn field_str<'a>(document: &'a Value, field: &str) -> Option<&'a str> {
    document.get(field).and_then(Value::as_str)
}

/// Order documents by a string field. Documents without it come first.
fn compare_field(a: &Value, b: &Value, field: &str) -> CmpOrdering {
    field_str(a, field).cmp(&field_str(b, field))
}

/// The named fields of `document` that it has.
fn project(document: &Value, fields: &[&str]) -> Value {
    let projected: Map<String, Value> = fields
        .iter()
        .filter_map(|field| {
            document
                .get(*field)
                .filter(|value| !value.is_null())
                .map(|value| (field.to_string(), value.clone()))
        })
        .collect();
    Value::Object(projected)
}

/// If `document` satisfies `query`.
///
/// Match queries are case-insensitive and require every word of the text to
/// appear in the field. Term queries require the field to equal the term.
fn matches(query: &SearchQuery, document: &Value) -> bool {
    match query {
        SearchQuery::Conjunction { conjuncts } => conjuncts.iter().all(|q| matches(q, document)),
        SearchQuery::Match { text, field } => match field_str(document, field) {
            Some(value) => {
                let value = value.to_lowercase();
                let mut words = text.split_whitespace().peekable();
                words.peek().is_some() && words.all(|word| value.contains(&word.to_lowercase()))
            }
            None => false,
        },
        SearchQuery::Term { term, field } => field_str(document, field) == Some(term.as_str()),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> String {
        "MemoryStore".to_string()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, collection: Collection, key: &DocumentKey) -> Result<Value, StoreError> {
        self.documents(collection)?
            .get(key.as_str())
            .map(|document| document.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn insert(
        &self,
        collection: Collection,
        key: &DocumentKey,
        document: &Value,
    ) -> Result<(), StoreError> {
        match self.documents(collection)?.entry(key.as_str().to_string()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists),
            Entry::Vacant(vacant) => {
                vacant.insert(document.clone());
                Ok(())
            }
        }
    }

    async fn upsert(
        &self,
        collection: Collection,
        key: &DocumentKey,
        document: &Value,
    ) -> Result<(), StoreError> {
        self.documents(collection)?
            .insert(key.as_str().to_string(), document.clone());
        Ok(())
    }

    async fn remove(&self, collection: Collection, key: &DocumentKey) -> Result<(), StoreError> {
        self.documents(collection)?
            .remove(key.as_str())
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn query(&self, query: &Query) -> Result<Vec<Value>, StoreError> {
        tracing::debug!(r#type = "store.memory.query", query = query.name(), "Evaluating query");
        let page = query.page();
        match query {
            Query::AirlineList { country, .. } => self.list(
                Collection::Airline,
                country.as_deref(),
                "name",
                &AIRLINE_FIELDS,
                page,
            ),
            Query::AirlinesToAirport { airport, .. } => self.airlines_to_airport(airport, page),
            Query::AirportList { country, .. } => self.list(
                Collection::Airport,
                country.as_deref(),
                "airportname",
                &AIRPORT_FIELDS,
                page,
            ),
            Query::DirectConnections { airport, .. } => self.direct_connections(airport, page),
        }
    }

    async fn search(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<Vec<SearchHit>, StoreError> {
        self.searches.fetch_add(1, Ordering::SeqCst);

        let collection = *self
            .search_indexes
            .get(index)
            .ok_or_else(|| StoreError::Unexpected(anyhow!("Search index {} not found", index)))?;

        let all_fields = request.fields.iter().any(|field| field == "*");
        let hits = self
            .snapshot(collection)?
            .into_iter()
            .filter(|(_, document)| matches(&request.query, document))
            .map(|(id, document)| {
                let fields = match document {
                    Value::Object(map) if all_fields => map,
                    document => request
                        .fields
                        .iter()
                        .filter_map(|field| {
                            document
                                .get(field)
                                .map(|value| (field.clone(), value.clone()))
                        })
                        .collect(),
                };
                SearchHit {
                    id,
                    score: 1.0,
                    fields,
                }
            });

        Ok(Page {
            limit: request.size,
            offset: request.from,
        }
        .apply(hits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{autocomplete_request, hotel_filter_request};
    use crate::{Airline, Airport, Hotel, Route};
    use fake::{Fake, Faker};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn key(key: &str) -> DocumentKey {
        DocumentKey::try_from(key).unwrap()
    }

    fn airline(name: &str, country: &str) -> Airline {
        Airline {
            name: name.to_string(),
            iata: None,
            icao: None,
            callsign: None,
            country: country.to_string(),
        }
    }

    fn route(airline_id: &str, from: &str, to: &str, stops: i32) -> Route {
        Route {
            airline: "XX".to_string(),
            airlineid: airline_id.to_string(),
            sourceairport: from.to_string(),
            destinationairport: to.to_string(),
            stops: Some(stops),
            equipment: None,
            schedule: None,
            distance: None,
        }
    }

    fn names(rows: &[Value]) -> Vec<&str> {
        rows.iter().filter_map(|row| field_str(row, "name")).collect()
    }

    #[tokio::test]
    async fn insert_refuses_existing_keys() {
        let store = MemoryStore::default();
        let document = json!({"name": "Inn"});
        store
            .insert(Collection::Hotel, &key("hotel_1"), &document)
            .await
            .unwrap();
        assert!(matches!(
            store
                .insert(Collection::Hotel, &key("hotel_1"), &document)
                .await,
            Err(StoreError::AlreadyExists)
        ));
    }

    #[tokio::test]
    async fn collections_are_separate() {
        let store = MemoryStore::default();
        store
            .upsert(Collection::Hotel, &key("doc_1"), &json!({}))
            .await
            .unwrap();
        assert!(matches!(
            store.get(Collection::Airline, &key("doc_1")).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn remove_then_get_is_not_found() {
        let store = MemoryStore::default();
        let airline: Airline = Faker.fake();
        store.put("airline_1", &airline).unwrap();

        store
            .remove(Collection::Airline, &key("airline_1"))
            .await
            .unwrap();
        assert!(matches!(
            store.get(Collection::Airline, &key("airline_1")).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.remove(Collection::Airline, &key("airline_1")).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn airline_list_is_ordered_and_paginated() {
        let store = MemoryStore::default();
        store.put("airline_3", &airline("Cirrus", "France")).unwrap();
        store.put("airline_1", &airline("Albatross", "France")).unwrap();
        store.put("airline_2", &airline("Boreal", "France")).unwrap();

        let rows = store
            .query(&Query::AirlineList {
                country: None,
                page: Page {
                    limit: 1,
                    offset: 1,
                },
            })
            .await
            .unwrap();

        assert_eq!(rows, vec![json!({"name": "Boreal", "country": "France"})]);
    }

    #[tokio::test]
    async fn airline_list_filters_by_country() {
        let store = MemoryStore::default();
        store.put("airline_1", &airline("Albatross", "France")).unwrap();
        store
            .put("airline_2", &airline("Boreal", "United States"))
            .unwrap();

        let rows = store
            .query(&Query::AirlineList {
                country: Some("United States".to_string()),
                page: Page::default(),
            })
            .await
            .unwrap();

        assert_eq!(names(&rows), vec!["Boreal"]);
    }

    #[tokio::test]
    async fn airlines_to_airport_joins_distinct_airlines() {
        let store = MemoryStore::default();
        store.put("airline_1", &airline("Zephyr", "France")).unwrap();
        store.put("airline_2", &airline("Aurora", "France")).unwrap();
        store.put("route_1", &route("airline_1", "CDG", "SFO", 0)).unwrap();
        store.put("route_2", &route("airline_1", "LHR", "SFO", 1)).unwrap();
        store.put("route_3", &route("airline_2", "JFK", "SFO", 0)).unwrap();
        store.put("route_4", &route("airline_9", "JFK", "SFO", 0)).unwrap();
        store.put("route_5", &route("airline_2", "SFO", "JFK", 0)).unwrap();

        let rows = store
            .query(&Query::AirlinesToAirport {
                airport: "SFO".to_string(),
                page: Page::default(),
            })
            .await
            .unwrap();

        assert_eq!(names(&rows), vec!["Aurora", "Zephyr"]);
    }

    #[tokio::test]
    async fn direct_connections_skip_routes_with_stops() {
        let store = MemoryStore::default();
        let mut airport: Airport = Faker.fake();
        airport.faa = Some("LAX".to_string());
        store.put("airport_1", &airport).unwrap();
        store.put("route_1", &route("airline_1", "LAX", "SFO", 0)).unwrap();
        store.put("route_2", &route("airline_2", "LAX", "SFO", 0)).unwrap();
        store.put("route_3", &route("airline_1", "LAX", "JFK", 0)).unwrap();
        store.put("route_4", &route("airline_1", "LAX", "ORD", 1)).unwrap();

        let rows = store
            .query(&Query::DirectConnections {
                airport: "LAX".to_string(),
                page: Page::default(),
            })
            .await
            .unwrap();

        assert_eq!(
            rows,
            vec![
                json!({"destinationairport": "JFK"}),
                json!({"destinationairport": "SFO"}),
            ]
        );
    }

    #[tokio::test]
    async fn direct_connections_need_a_known_airport() {
        let store = MemoryStore::default();
        store.put("route_1", &route("airline_1", "LAX", "SFO", 0)).unwrap();

        let rows = store
            .query(&Query::DirectConnections {
                airport: "LAX".to_string(),
                page: Page::default(),
            })
            .await
            .unwrap();

        assert!(rows.is_empty());
    }

    fn hotel_store() -> MemoryStore {
        let store = MemoryStore::default().with_search_index("hotels", Collection::Hotel);
        for (key, name, city) in [
            ("hotel_1", "Paris Inn", "Paris"),
            ("hotel_2", "Seaside Inn", "Nice"),
            ("hotel_3", "Grand Hotel", "Paris"),
        ] {
            let hotel = Hotel {
                name: Some(name.to_string()),
                city: Some(city.to_string()),
                ..Hotel::default()
            };
            store.put(key, &hotel).unwrap();
        }
        store
    }

    #[tokio::test]
    async fn filter_search_combines_fields() {
        let store = hotel_store();
        let filter = Hotel {
            city: Some("Paris".to_string()),
            name: Some("inn".to_string()),
            ..Hotel::default()
        };
        let request = hotel_filter_request(&filter, Page::default()).unwrap();

        let hits = store.search("hotels", &request).await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "hotel_1");
        assert_eq!(hits[0].fields["city"], "Paris");
        assert_eq!(store.search_count(), 1);
    }

    #[tokio::test]
    async fn term_search_is_exact() {
        let store = hotel_store();
        let filter = Hotel {
            city: Some("paris".to_string()),
            ..Hotel::default()
        };
        let request = hotel_filter_request(&filter, Page::default()).unwrap();
        assert!(store.search("hotels", &request).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn autocomplete_returns_only_names() {
        let store = hotel_store();
        let hits = store
            .search("hotels", &autocomplete_request("Inn"))
            .await
            .unwrap();

        let fields: Vec<&Map<String, Value>> = hits.iter().map(|hit| &hit.fields).collect();
        assert_eq!(fields.len(), 2);
        assert!(fields.iter().all(|f| f.len() == 1 && f.contains_key("name")));
    }

    #[tokio::test]
    async fn unknown_index_is_an_error() {
        let store = hotel_store();
        let result = store.search("nope", &autocomplete_request("Inn")).await;
        assert!(matches!(result, Err(StoreError::Unexpected(_))));
    }
}
