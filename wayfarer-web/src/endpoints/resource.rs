//! Create, read, update and delete for one document by key. The same handlers
//! serve every collection, parameterized by the entity type.

use actix_web::{
    web::{self, Data, Json, Path, ServiceConfig},
    HttpResponse,
};
use cadence::StatsdClient;
use wayfarer_store::{DocumentKey, DocumentStore, Entity};

use super::store_failure;
use crate::errors::{HandlerError, HandlerErrorKind};

/// Register the `/{id}` routes for `E`. Register fixed paths such as `/list`
/// before calling this, or they will be treated as keys.
pub fn configure<E: Entity>(config: &mut ServiceConfig) {
    config.service(
        web::resource("/{id}")
            .route(web::get().to(read::<E>))
            .route(web::post().to(create::<E>))
            .route(web::put().to(update::<E>))
            .route(web::delete().to(delete::<E>)),
    );
}

/// Validate the key from the path.
fn document_key(id: Path<String>) -> Result<DocumentKey, HandlerError> {
    DocumentKey::try_from(id.into_inner()).map_err(HandlerError::bad_request)
}

/// The JSON form of a record to store.
fn to_document<E: Entity>(entity: &E) -> Result<serde_json::Value, HandlerError> {
    serde_json::to_value(entity)
        .map_err(|error| HandlerError::from(HandlerErrorKind::Unexpected(error.to_string())))
}

/// Get the document with the given key.
async fn read<E: Entity>(
    id: Path<String>,
    store: Data<dyn DocumentStore>,
    metrics_client: Data<StatsdClient>,
) -> Result<HttpResponse, HandlerError> {
    let key = document_key(id)?;
    let document = store
        .get(E::COLLECTION, &key)
        .await
        .map_err(|error| store_failure(error, E::NAME, &metrics_client))?;

    let entity: E = serde_json::from_value(document)
        .map_err(|error| HandlerError::from(HandlerErrorKind::Unexpected(error.to_string())))?;
    Ok(HttpResponse::Ok().json(entity))
}

/// Create a document with the given key. Fails if the key is taken.
async fn create<E: Entity>(
    id: Path<String>,
    body: Json<E>,
    store: Data<dyn DocumentStore>,
    metrics_client: Data<StatsdClient>,
) -> Result<HttpResponse, HandlerError> {
    let key = document_key(id)?;
    let entity = body.into_inner();
    store
        .insert(E::COLLECTION, &key, &to_document(&entity)?)
        .await
        .map_err(|error| store_failure(error, E::NAME, &metrics_client))?;

    tracing::debug!(r#type = "web.resource.created", collection = %E::COLLECTION, %key, "Created document");
    Ok(HttpResponse::Created().json(entity))
}

/// Create or replace the document with the given key.
async fn update<E: Entity>(
    id: Path<String>,
    body: Json<E>,
    store: Data<dyn DocumentStore>,
    metrics_client: Data<StatsdClient>,
) -> Result<HttpResponse, HandlerError> {
    let key = document_key(id)?;
    let entity = body.into_inner();
    store
        .upsert(E::COLLECTION, &key, &to_document(&entity)?)
        .await
        .map_err(|error| store_failure(error, E::NAME, &metrics_client))?;

    Ok(HttpResponse::Ok().json(entity))
}

/// Delete the document with the given key.
async fn delete<E: Entity>(
    id: Path<String>,
    store: Data<dyn DocumentStore>,
    metrics_client: Data<StatsdClient>,
) -> Result<HttpResponse, HandlerError> {
    let key = document_key(id)?;
    store
        .remove(E::COLLECTION, &key)
        .await
        .map_err(|error| store_failure(error, E::NAME, &metrics_client))?;

    Ok(HttpResponse::NoContent().finish())
}
