//! The OpenAPI description of the API, and an interactive page to browse it.

use actix_web::{get, web::ServiceConfig, HttpResponse};
use utoipa::openapi::{
    path::{Operation, OperationBuilder, ParameterBuilder, ParameterIn},
    request_body::RequestBodyBuilder,
    schema::{ArrayBuilder, ComponentsBuilder, Object, ObjectBuilder, Ref, SchemaType},
    tag::Tag,
    Content, InfoBuilder, OpenApi, OpenApiBuilder, PathItem, PathItemType, PathsBuilder, RefOr,
    Required, Response, ResponseBuilder, Schema,
};
use wayfarer_store::{
    Airline, Airport, DestinationAirport, GeoCoordinates, Hotel, HotelName, Route, Schedule,
};

/// Where the interactive documentation is served.
pub const DOCS_PATH: &str = "/docs";

/// Register the documentation routes.
pub fn configure(config: &mut ServiceConfig) {
    config.service(openapi_json).service(docs);
}

/// The OpenAPI document.
#[get("/openapi.json")]
async fn openapi_json() -> HttpResponse {
    HttpResponse::Ok().json(doc())
}

/// A Swagger UI page reading `/openapi.json`.
#[get("/docs")]
async fn docs() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(include_str!("../docs.html"))
}

/// Describe every endpoint under `/api/v1`.
pub fn doc() -> OpenApi {
    let mut paths = PathsBuilder::new();
    for (tag, entity) in [
        ("airline", "Airline"),
        ("airport", "Airport"),
        ("route", "Route"),
        ("hotel", "Hotel"),
    ] {
        paths = paths.path(format!("/api/v1/{}/{{id}}", tag), document_item(tag, entity));
    }

    let paths = paths
        .path(
            "/api/v1/airline/list",
            PathItem::new(
                PathItemType::Get,
                list_operation("airline", "Airline", "List airlines, ordered by name")
                    .parameter(query_parameter("country", "Only airlines from this country", false))
                    .build(),
            ),
        )
        .path(
            "/api/v1/airline/to-airport",
            PathItem::new(
                PathItemType::Get,
                list_operation(
                    "airline",
                    "Airline",
                    "List airlines flying into an airport, ordered by name",
                )
                .parameter(query_parameter("airport", "FAA code, such as SFO", true))
                .build(),
            ),
        )
        .path(
            "/api/v1/airport/list",
            PathItem::new(
                PathItemType::Get,
                list_operation("airport", "Airport", "List airports, ordered by name")
                    .parameter(query_parameter("country", "Only airports in this country", false))
                    .build(),
            ),
        )
        .path(
            "/api/v1/airport/direct-connections",
            PathItem::new(
                PathItemType::Get,
                list_operation(
                    "airport",
                    "DestinationAirport",
                    "List airports reachable from an airport without stops",
                )
                .parameter(query_parameter("airport", "FAA code, such as SFO", true))
                .build(),
            ),
        )
        .path(
            "/api/v1/hotel/autocomplete",
            PathItem::new(
                PathItemType::Get,
                OperationBuilder::new()
                    .tag("hotel")
                    .summary(Some("Names of hotels matching a partial name"))
                    .parameter(query_parameter("name", "The partial hotel name", true))
                    .response("200", json_response("Hotel names", array_of("HotelName")))
                    .response("400", error_response("Missing name"))
                    .build(),
            ),
        )
        .path(
            "/api/v1/hotel/filter",
            PathItem::new(
                PathItemType::Post,
                list_operation(
                    "hotel",
                    "Hotel",
                    "Search hotels. Descriptive fields are matched as text, place names \
                     exactly. An empty filter matches nothing.",
                )
                .request_body(Some(
                    RequestBodyBuilder::new()
                        .content("application/json", Content::new(schema_ref("Hotel")))
                        .required(Some(Required::False))
                        .build(),
                ))
                .build(),
            ),
        )
        .build();

    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title("Wayfarer")
                .version(env!("CARGO_PKG_VERSION"))
                .description(Some(
                    "A REST API over the airlines, airports, routes and hotels of the \
                     travel-sample dataset.",
                ))
                .build(),
        )
        .paths(paths)
        .components(Some(
            ComponentsBuilder::new()
                .schema_from::<Airline>()
                .schema_from::<Airport>()
                .schema_from::<GeoCoordinates>()
                .schema_from::<Route>()
                .schema_from::<Schedule>()
                .schema_from::<Hotel>()
                .schema_from::<HotelName>()
                .schema_from::<DestinationAirport>()
                .schema("Error", error_schema())
                .build(),
        ))
        .tags(Some(
            ["airline", "airport", "route", "hotel"]
                .into_iter()
                .map(Tag::new)
                .collect::<Vec<_>>(),
        ))
        .build()
}

/// Get, create, replace and delete of one `entity` by key.
fn document_item(tag: &str, entity: &str) -> PathItem {
    let id = || {
        ParameterBuilder::new()
            .name("id")
            .parameter_in(ParameterIn::Path)
            .required(Required::True)
            .description(Some("Document key, such as airline_10"))
            .schema(Some(string_schema()))
    };
    let body = || {
        Some(
            RequestBodyBuilder::new()
                .content("application/json", Content::new(schema_ref(entity)))
                .required(Some(Required::True))
                .build(),
        )
    };
    let operation = |summary: String| OperationBuilder::new().tag(tag).summary(Some(summary));

    let get: Operation = operation(format!("Get the {} with the given key", tag))
        .parameter(id())
        .response("200", json_response(entity, schema_ref(entity)))
        .response("404", error_response("No such document"))
        .build();
    let post = operation(format!("Create a {} with the given key", tag))
        .parameter(id())
        .request_body(body())
        .response("201", json_response("Created", schema_ref(entity)))
        .response("400", error_response("Invalid key or body"))
        .response("409", error_response("The key is taken"))
        .build();
    let put = operation(format!("Create or replace the {} with the given key", tag))
        .parameter(id())
        .request_body(body())
        .response("200", json_response("Stored", schema_ref(entity)))
        .response("400", error_response("Invalid key or body"))
        .build();
    let delete = operation(format!("Delete the {} with the given key", tag))
        .parameter(id())
        .response("204", Response::new("Deleted"))
        .response("404", error_response("No such document"))
        .build();

    let mut item = PathItem::new(PathItemType::Get, get);
    item.operations.insert(PathItemType::Post, post);
    item.operations.insert(PathItemType::Put, put);
    item.operations.insert(PathItemType::Delete, delete);
    item
}

/// A paginated operation returning an array of `entity`.
fn list_operation(tag: &str, entity: &str, summary: &str) -> OperationBuilder {
    let page_parameter = |name: &str, description: &str| {
        ParameterBuilder::new()
            .name(name)
            .parameter_in(ParameterIn::Query)
            .required(Required::False)
            .description(Some(description))
            .schema(Some(RefOr::T(Schema::Object(Object::with_type(
                SchemaType::Integer,
            )))))
    };

    OperationBuilder::new()
        .tag(tag)
        .summary(Some(summary))
        .parameter(page_parameter("limit", "Number of items to return, 10 by default"))
        .parameter(page_parameter("offset", "Number of items to skip, 0 by default"))
        .response("200", json_response("Matching items", array_of(entity)))
        .response("400", error_response("Invalid query parameters"))
}

/// An optional or required string query parameter.
fn query_parameter(name: &str, description: &str, required: bool) -> ParameterBuilder {
    ParameterBuilder::new()
        .name(name)
        .parameter_in(ParameterIn::Query)
        .required(if required {
            Required::True
        } else {
            Required::False
        })
        .description(Some(description))
        .schema(Some(string_schema()))
}

/// A JSON response with the given body schema.
fn json_response(description: &str, schema: RefOr<Schema>) -> Response {
    ResponseBuilder::new()
        .description(description)
        .content("application/json", Content::new(schema))
        .build()
}

/// An error response, with a `{"detail": ...}` body.
fn error_response(description: &str) -> Response {
    json_response(description, schema_ref("Error"))
}

/// A reference to a schema in the components.
fn schema_ref(name: &str) -> RefOr<Schema> {
    RefOr::Ref(Ref::from_schema_name(name))
}

/// An array of the named schema.
fn array_of(name: &str) -> RefOr<Schema> {
    RefOr::T(Schema::Array(
        ArrayBuilder::new().items(schema_ref(name)).build(),
    ))
}

/// A plain string.
fn string_schema() -> RefOr<Schema> {
    RefOr::T(Schema::Object(Object::with_type(SchemaType::String)))
}

/// The body of every error response.
fn error_schema() -> RefOr<Schema> {
    RefOr::T(Schema::Object(
        ObjectBuilder::new()
            .property("detail", string_schema())
            .required("detail")
            .build(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn doc_json() -> Value {
        serde_json::to_value(doc()).unwrap()
    }

    #[test]
    fn every_route_is_described() {
        let doc = doc_json();
        let mut paths: Vec<&str> = doc["paths"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        paths.sort_unstable();

        assert_eq!(
            paths,
            vec![
                "/api/v1/airline/list",
                "/api/v1/airline/to-airport",
                "/api/v1/airline/{id}",
                "/api/v1/airport/direct-connections",
                "/api/v1/airport/list",
                "/api/v1/airport/{id}",
                "/api/v1/hotel/autocomplete",
                "/api/v1/hotel/filter",
                "/api/v1/hotel/{id}",
                "/api/v1/route/{id}",
            ]
        );
    }

    #[test]
    fn documents_support_every_method() {
        let doc = doc_json();
        let item = doc["paths"]["/api/v1/route/{id}"].as_object().unwrap();
        for method in ["get", "post", "put", "delete"] {
            assert!(item.contains_key(method), "missing {}", method);
        }
        assert_eq!(
            item["post"]["responses"]["409"]["content"]["application/json"]["schema"],
            json!({"$ref": "#/components/schemas/Error"})
        );
    }

    #[test]
    fn records_are_in_the_components() {
        let doc = doc_json();
        let schemas = doc["components"]["schemas"].as_object().unwrap();
        for name in ["Airline", "Airport", "Route", "Hotel", "HotelName", "Error"] {
            assert!(schemas.contains_key(name), "missing {}", name);
        }
        assert!(schemas["Airline"]["properties"]
            .as_object()
            .unwrap()
            .contains_key("callsign"));
    }
}
