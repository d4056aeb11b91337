//! The records stored in the travel-sample inventory.
//!
//! These are passthrough types: the only thing they enforce is that a record
//! has the fields its schema declares. Optional fields that are absent are left
//! out of the serialized form instead of being written as `null`.

use fake::{
    faker::{
        address::en::{CityName, CountryName, StateName},
        company::en::CompanyName,
        lorem::en::Sentence,
    },
    Dummy,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

use crate::Collection;

/// A record type that lives in one collection of the inventory scope.
pub trait Entity: Serialize + DeserializeOwned + Send + 'static {
    /// The collection documents of this type are stored in.
    const COLLECTION: Collection;

    /// Human readable name, used in response messages such as "Airline not found".
    const NAME: &'static str;
}

/// An airline, such as `airline_10`.
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Dummy, ToSchema)]
pub struct Airline {
    /// Airline name.
    #[dummy(faker = "CompanyName()")]
    pub name: String,
    /// IATA code.
    pub iata: Option<String>,
    /// ICAO code.
    pub icao: Option<String>,
    /// Radio callsign.
    pub callsign: Option<String>,
    /// Country the airline is registered in.
    #[dummy(faker = "CountryName()")]
    pub country: String,
}

impl Entity for Airline {
    const COLLECTION: Collection = Collection::Airline;
    const NAME: &'static str = "Airline";
}

/// Position of an airport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Dummy, ToSchema)]
pub struct GeoCoordinates {
    /// Latitude.
    #[dummy(faker = "-90.0..90.0")]
    pub lat: f64,
    /// Longitude.
    #[dummy(faker = "-180.0..180.0")]
    pub lon: f64,
    /// Altitude, in feet.
    #[dummy(faker = "0.0..10000.0")]
    pub alt: f64,
}

/// An airport, such as `airport_1273`.
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Dummy, ToSchema)]
pub struct Airport {
    /// Airport name.
    pub airportname: String,
    /// City the airport serves.
    #[dummy(faker = "CityName()")]
    pub city: String,
    /// Country the airport is in.
    #[dummy(faker = "CountryName()")]
    pub country: String,
    /// FAA code, such as "SFO".
    pub faa: Option<String>,
    /// ICAO code.
    pub icao: Option<String>,
    /// Time zone name, such as "Europe/Paris".
    pub tz: Option<String>,
    /// Position of the airport.
    pub geo: Option<GeoCoordinates>,
}

impl Entity for Airport {
    const COLLECTION: Collection = Collection::Airport;
    const NAME: &'static str = "Airport";
}

/// One scheduled flight on a route.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Dummy, ToSchema)]
pub struct Schedule {
    /// Day of the week, starting at 0.
    #[dummy(faker = "0..7")]
    pub day: i32,
    /// Flight number, such as "AF10".
    pub flight: String,
    /// Departure time in UTC, such as "10:05:00".
    pub utc: String,
}

/// A route flown by an airline, such as `route_10000`.
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Dummy, ToSchema)]
pub struct Route {
    /// Airline code, such as "AF".
    pub airline: String,
    /// Key of the airline document, such as "airline_137". Not checked.
    pub airlineid: String,
    /// FAA code of the departure airport.
    pub sourceairport: String,
    /// FAA code of the arrival airport.
    pub destinationairport: String,
    /// Number of stops.
    pub stops: Option<i32>,
    /// Aircraft type codes.
    pub equipment: Option<String>,
    /// Flights on this route.
    pub schedule: Option<Vec<Schedule>>,
    /// Distance in km.
    pub distance: Option<f64>,
}

impl Entity for Route {
    const COLLECTION: Collection = Collection::Route;
    const NAME: &'static str = "Route";
}

/// A hotel. Every field is optional, and the same shape is used as the hotel
/// search filter.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Dummy, ToSchema)]
pub struct Hotel {
    /// City the hotel is in.
    #[dummy(faker = "CityName()")]
    pub city: Option<String>,
    /// Country the hotel is in.
    #[dummy(faker = "CountryName()")]
    pub country: Option<String>,
    /// Free text description.
    #[dummy(faker = "Sentence(3..8)")]
    pub description: Option<String>,
    /// Hotel name.
    pub name: Option<String>,
    /// State or region the hotel is in.
    #[dummy(faker = "StateName()")]
    pub state: Option<String>,
    /// Display title.
    pub title: Option<String>,
}

impl Entity for Hotel {
    const COLLECTION: Collection = Collection::Hotel;
    const NAME: &'static str = "Hotel";
}

/// A hotel name, as returned by the autocomplete search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HotelName {
    /// Hotel name.
    pub name: String,
}

/// An airport reachable without stops, as returned by the direct connections query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DestinationAirport {
    /// FAA code of the destination.
    pub destinationairport: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn absent_optional_fields_are_not_serialized() {
        let airline = Airline {
            name: "Sample Airline".to_string(),
            iata: Some("SA".to_string()),
            icao: None,
            callsign: None,
            country: "United States".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&airline).unwrap(),
            json!({"name": "Sample Airline", "iata": "SA", "country": "United States"})
        );
    }

    #[test]
    fn required_fields_are_enforced() {
        let result: Result<Airport, _> =
            serde_json::from_value(json!({"airportname": "Nowhere", "city": "Paris"}));
        assert!(result.is_err(), "country is required");
    }

    #[test]
    fn airport_positions_need_an_altitude() {
        let result: Result<Airport, _> = serde_json::from_value(json!({
            "airportname": "Nowhere",
            "city": "Paris",
            "country": "France",
            "geo": {"lat": 48.8, "lon": 2.3},
        }));
        assert!(result.is_err(), "geo.alt is required");

        let airport: Airport = serde_json::from_value(json!({
            "airportname": "Nowhere",
            "city": "Paris",
            "country": "France",
            "geo": {"lat": 48.8, "lon": 2.3, "alt": 115},
        }))
        .unwrap();
        assert_eq!(airport.geo.map(|geo| geo.alt), Some(115.0));
    }

    #[test]
    fn unknown_fields_are_dropped() {
        let airline: Airline = serde_json::from_value(json!({
            "id": 10,
            "type": "airline",
            "name": "40-Mile Air",
            "iata": "Q5",
            "icao": "MLA",
            "callsign": "MILE-AIR",
            "country": "United States",
        }))
        .unwrap();

        assert_eq!(
            serde_json::to_value(&airline).unwrap(),
            json!({
                "name": "40-Mile Air",
                "iata": "Q5",
                "icao": "MLA",
                "callsign": "MILE-AIR",
                "country": "United States",
            })
        );
    }
}
