//! The SQL++ queries the API runs.
//!
//! Statements are fixed strings with named placeholders. Only the bound
//! parameters vary between calls, so no query text is ever built from user
//! input.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which part of an ordered result to return.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// The most rows to return.
    pub limit: u32,
    /// How many rows to skip first.
    pub offset: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
        }
    }
}

impl Page {
    /// Apply this page to an already ordered sequence.
    pub fn apply<T>(&self, rows: impl IntoIterator<Item = T>) -> Vec<T> {
        rows.into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

/// Airlines, optionally from one country.
const AIRLINE_LIST: &str = "\
SELECT airline.callsign, airline.country, airline.iata, airline.icao, airline.name
FROM airline AS airline
ORDER BY airline.name
LIMIT $limit OFFSET $offset";

/// Airlines from one country.
const AIRLINE_LIST_BY_COUNTRY: &str = "\
SELECT airline.callsign, airline.country, airline.iata, airline.icao, airline.name
FROM airline AS airline
WHERE airline.country = $country
ORDER BY airline.name
LIMIT $limit OFFSET $offset";

/// Airlines that fly at least one route into an airport.
const AIRLINES_TO_AIRPORT: &str = "\
SELECT air.callsign, air.country, air.iata, air.icao, air.name
FROM (
    SELECT DISTINCT META(airline).id AS airlineId
    FROM route
    JOIN airline ON route.airlineid = META(airline).id
    WHERE route.destinationairport = $airport
) AS subquery
JOIN airline AS air ON META(air).id = subquery.airlineId
ORDER BY air.name
LIMIT $limit OFFSET $offset";

/// Every airport.
const AIRPORT_LIST: &str = "\
SELECT airport.airportname, airport.city, airport.country, airport.faa, airport.geo,
    airport.icao, airport.tz
FROM airport AS airport
ORDER BY airport.airportname
LIMIT $limit OFFSET $offset";

/// Airports in one country.
const AIRPORT_LIST_BY_COUNTRY: &str = "\
SELECT airport.airportname, airport.city, airport.country, airport.faa, airport.geo,
    airport.icao, airport.tz
FROM airport AS airport
WHERE airport.country = $country
ORDER BY airport.airportname
LIMIT $limit OFFSET $offset";

/// Destinations reachable from an airport without stops.
const DIRECT_CONNECTIONS: &str = "\
SELECT DISTINCT route.destinationairport
FROM airport AS airport
JOIN route AS route ON route.sourceairport = airport.faa
WHERE airport.faa = $airport AND route.stops = 0
ORDER BY route.destinationairport
LIMIT $limit OFFSET $offset";

/// A query from the catalogue, with its parameters bound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Query {
    /// Airlines ordered by name. `None` lists every country.
    AirlineList {
        /// Only airlines registered in this country.
        country: Option<String>,
        #[allow(missing_docs)]
        page: Page,
    },

    /// Airlines with a route into `airport`, ordered by name.
    AirlinesToAirport {
        /// FAA code of the destination airport.
        airport: String,
        #[allow(missing_docs)]
        page: Page,
    },

    /// Airports ordered by name. `None` lists every country.
    AirportList {
        /// Only airports in this country.
        country: Option<String>,
        #[allow(missing_docs)]
        page: Page,
    },

    /// Distinct destinations with a non-stop route from `airport`.
    DirectConnections {
        /// FAA code of the departure airport.
        airport: String,
        #[allow(missing_docs)]
        page: Page,
    },
}

impl Query {
    /// A short name for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AirlineList { .. } => "airline_list",
            Self::AirlinesToAirport { .. } => "airlines_to_airport",
            Self::AirportList { .. } => "airport_list",
            Self::DirectConnections { .. } => "direct_connections",
        }
    }

    /// The statement to run. Its placeholders are exactly the keys of
    /// [`Query::parameters`].
    pub fn statement(&self) -> &'static str {
        match self {
            Self::AirlineList { country: None, .. } => AIRLINE_LIST,
            Self::AirlineList {
                country: Some(_), ..
            } => AIRLINE_LIST_BY_COUNTRY,
            Self::AirlinesToAirport { .. } => AIRLINES_TO_AIRPORT,
            Self::AirportList { country: None, .. } => AIRPORT_LIST,
            Self::AirportList {
                country: Some(_), ..
            } => AIRPORT_LIST_BY_COUNTRY,
            Self::DirectConnections { .. } => DIRECT_CONNECTIONS,
        }
    }

    /// The page requested.
    pub fn page(&self) -> Page {
        match self {
            Self::AirlineList { page, .. }
            | Self::AirlinesToAirport { page, .. }
            | Self::AirportList { page, .. }
            | Self::DirectConnections { page, .. } => *page,
        }
    }

    /// The named parameters, without their `$` prefix.
    pub fn parameters(&self) -> Map<String, Value> {
        let mut params = Map::new();
        match self {
            Self::AirlineList { country, .. } | Self::AirportList { country, .. } => {
                if let Some(country) = country {
                    params.insert("country".to_string(), country.clone().into());
                }
            }
            Self::AirlinesToAirport { airport, .. } | Self::DirectConnections { airport, .. } => {
                params.insert("airport".to_string(), airport.clone().into());
            }
        }
        let page = self.page();
        params.insert("limit".to_string(), page.limit.into());
        params.insert("offset".to_string(), page.offset.into());
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Every `$name` placeholder in a statement.
    fn placeholders(statement: &str) -> Vec<String> {
        let mut names: Vec<String> = statement
            .split('$')
            .skip(1)
            .map(|rest| {
                rest.chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                    .collect()
            })
            .collect();
        names.sort();
        names.dedup();
        names
    }

    #[test]
    fn parameters_match_placeholders() {
        let page = Page::default();
        let queries = [
            Query::AirlineList {
                country: None,
                page,
            },
            Query::AirlineList {
                country: Some("France".to_string()),
                page,
            },
            Query::AirlinesToAirport {
                airport: "SFO".to_string(),
                page,
            },
            Query::AirportList {
                country: None,
                page,
            },
            Query::AirportList {
                country: Some("France".to_string()),
                page,
            },
            Query::DirectConnections {
                airport: "LAX".to_string(),
                page,
            },
        ];

        for query in queries {
            let mut keys: Vec<String> = query.parameters().keys().cloned().collect();
            keys.sort();
            assert_eq!(keys, placeholders(query.statement()), "{}", query.name());
        }
    }

    #[test]
    fn country_filter_selects_statement() {
        let unfiltered = Query::AirportList {
            country: None,
            page: Page::default(),
        };
        assert!(!unfiltered.statement().contains("WHERE"));

        let filtered = Query::AirportList {
            country: Some("United Kingdom".to_string()),
            page: Page {
                limit: 5,
                offset: 20,
            },
        };
        assert!(filtered.statement().contains("airport.country = $country"));
        assert_eq!(
            Value::Object(filtered.parameters()),
            json!({"country": "United Kingdom", "limit": 5, "offset": 20})
        );
    }

    #[test]
    fn page_skips_then_takes() {
        let page = Page {
            limit: 1,
            offset: 1,
        };
        assert_eq!(page.apply(["a", "b", "c"]), vec!["b"]);

        let past_the_end = Page {
            limit: 10,
            offset: 5,
        };
        assert!(past_the_end.apply(["a", "b", "c"]).is_empty());
    }
}
