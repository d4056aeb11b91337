//! Full text search requests, in the JSON shape the Search service expects.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{domain::HotelName, Hotel, Page};

/// How many names the autocomplete search returns.
pub const AUTOCOMPLETE_SIZE: u32 = 50;

/// A search query tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchQuery {
    /// Every sub-query must match.
    Conjunction {
        /// The sub-queries.
        conjuncts: Vec<SearchQuery>,
    },

    /// Analyzed text match on one field.
    Match {
        /// The text to look for.
        #[serde(rename = "match")]
        text: String,
        /// The field to search.
        field: String,
    },

    /// Exact, unanalyzed term on one field.
    Term {
        /// The term that must be present.
        term: String,
        /// The field to search.
        field: String,
    },
}

impl SearchQuery {
    /// A match query on `field`.
    pub fn matching<F: Into<String>, T: Into<String>>(field: F, text: T) -> Self {
        Self::Match {
            text: text.into(),
            field: field.into(),
        }
    }

    /// A term query on `field`.
    pub fn term<F: Into<String>, T: Into<String>>(field: F, term: T) -> Self {
        Self::Term {
            term: term.into(),
            field: field.into(),
        }
    }
}

/// A search request body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// What to look for.
    pub query: SearchQuery,
    /// The most hits to return.
    pub size: u32,
    /// How many hits to skip.
    pub from: u32,
    /// The stored fields to return with each hit. `*` returns all of them.
    pub fields: Vec<String>,
}

/// One search result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Key of the matching document.
    pub id: String,
    /// Relevance score.
    #[serde(default)]
    pub score: f64,
    /// The requested stored fields that the document has.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl SearchHit {
    /// Read the hit's fields as a hotel. Fields the hotel doesn't have are ignored.
    ///
    /// # Errors
    /// If one of the hotel fields isn't a string.
    pub fn to_hotel(&self) -> Result<Hotel, serde_json::Error> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }

    /// The hit's name, if it has one.
    pub fn to_hotel_name(&self) -> Option<HotelName> {
        self.fields
            .get("name")
            .and_then(Value::as_str)
            .map(|name| HotelName {
                name: name.to_string(),
            })
    }
}

/// The kind of sub-query a hotel field turns into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubQueryKind {
    /// Free text, see [`SearchQuery::Match`].
    Match,
    /// Exact value, see [`SearchQuery::Term`].
    Term,
}

/// The hotel fields that can be filtered on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HotelField {
    #[allow(missing_docs)]
    Description,
    #[allow(missing_docs)]
    Name,
    #[allow(missing_docs)]
    Title,
    #[allow(missing_docs)]
    City,
    #[allow(missing_docs)]
    Country,
    #[allow(missing_docs)]
    State,
}

impl HotelField {
    /// Every field, in the order sub-queries are built.
    pub const ALL: [HotelField; 6] = [
        Self::Description,
        Self::Name,
        Self::Title,
        Self::City,
        Self::Country,
        Self::State,
    ];

    /// The field name in the index.
    pub fn name(self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Name => "name",
            Self::Title => "title",
            Self::City => "city",
            Self::Country => "country",
            Self::State => "state",
        }
    }

    /// Descriptive text is matched, place names must be exact.
    pub fn kind(self) -> SubQueryKind {
        match self {
            Self::Description | Self::Name | Self::Title => SubQueryKind::Match,
            Self::City | Self::Country | Self::State => SubQueryKind::Term,
        }
    }

    /// This field's value in `hotel`.
    pub fn value(self, hotel: &Hotel) -> Option<&str> {
        match self {
            Self::Description => hotel.description.as_deref(),
            Self::Name => hotel.name.as_deref(),
            Self::Title => hotel.title.as_deref(),
            Self::City => hotel.city.as_deref(),
            Self::Country => hotel.country.as_deref(),
            Self::State => hotel.state.as_deref(),
        }
    }

    /// The sub-query for `value` on this field.
    pub fn sub_query(self, value: &str) -> SearchQuery {
        match self.kind() {
            SubQueryKind::Match => SearchQuery::matching(self.name(), value),
            SubQueryKind::Term => SearchQuery::term(self.name(), value),
        }
    }
}

/// Build the search for hotels matching every field set in `filter`.
///
/// Returns `None` when no field is set. In that case there is nothing to
/// search for and the result is empty.
pub fn hotel_filter_request(filter: &Hotel, page: Page) -> Option<SearchRequest> {
    let mut sub_queries: Vec<SearchQuery> = HotelField::ALL
        .iter()
        .filter_map(|field| field.value(filter).map(|value| field.sub_query(value)))
        .collect();

    let query = match sub_queries.len() {
        0 => return None,
        1 => sub_queries.remove(0),
        _ => SearchQuery::Conjunction {
            conjuncts: sub_queries,
        },
    };

    Some(SearchRequest {
        query,
        size: page.limit,
        from: page.offset,
        fields: vec!["*".to_string()],
    })
}

/// Build the search for hotel names matching `name`.
pub fn autocomplete_request(name: &str) -> SearchRequest {
    SearchRequest {
        query: SearchQuery::matching(HotelField::Name.name(), name),
        size: AUTOCOMPLETE_SIZE,
        from: 0,
        fields: vec![HotelField::Name.name().to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn empty_filter_builds_nothing() {
        assert_eq!(hotel_filter_request(&Hotel::default(), Page::default()), None);
    }

    #[test]
    fn single_field_is_a_single_sub_query() {
        let filter = Hotel {
            city: Some("Paris".to_string()),
            ..Hotel::default()
        };
        let request = hotel_filter_request(&filter, Page::default()).expect("a request");
        assert_eq!(request.query, SearchQuery::term("city", "Paris"));
    }

    #[test]
    fn fields_are_combined_with_a_conjunction() {
        let filter = Hotel {
            city: Some("Paris".to_string()),
            name: Some("Inn".to_string()),
            ..Hotel::default()
        };
        let request = hotel_filter_request(
            &filter,
            Page {
                limit: 5,
                offset: 10,
            },
        )
        .expect("a request");

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "query": {
                    "conjuncts": [
                        {"match": "Inn", "field": "name"},
                        {"term": "Paris", "field": "city"},
                    ]
                },
                "size": 5,
                "from": 10,
                "fields": ["*"],
            })
        );
    }

    #[test]
    fn field_kinds() {
        let match_fields: Vec<&str> = HotelField::ALL
            .iter()
            .filter(|f| f.kind() == SubQueryKind::Match)
            .map(|f| f.name())
            .collect();
        assert_eq!(match_fields, vec!["description", "name", "title"]);
    }

    #[test]
    fn autocomplete_asks_for_names_only() {
        assert_eq!(
            serde_json::to_value(autocomplete_request("sea")).unwrap(),
            json!({
                "query": {"match": "sea", "field": "name"},
                "size": 50,
                "from": 0,
                "fields": ["name"],
            })
        );
    }

    #[test]
    fn hits_without_a_name_have_no_hotel_name() {
        let hit: SearchHit = serde_json::from_value(json!({
            "index": "hotel_search_1",
            "id": "hotel_10025",
            "score": 1.5,
            "fields": {"city": "Paris"},
        }))
        .unwrap();
        assert_eq!(hit.to_hotel_name(), None);
        assert_eq!(hit.to_hotel().unwrap().city.as_deref(), Some("Paris"));
    }
}
