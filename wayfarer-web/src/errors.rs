//! Any errors that wayfarer-web might generate, and supporting implementations.

use std::error::Error;
use std::fmt;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use backtrace::Backtrace;
use serde::Serialize;
use thiserror::Error;
use wayfarer_store::StoreError;

/// The error returned by every handler.
pub struct HandlerError {
    /// The wrapped error value.
    kind: HandlerErrorKind,
    /// The backtrace related to the wrapped error.
    pub(crate) backtrace: Backtrace,
}

/// An error that happened in a web handler.
#[derive(Error, Debug)]
pub enum HandlerErrorKind {
    /// The requested document doesn't exist. Holds the entity name.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A document with the requested key already exists. Holds the entity name.
    #[error("{0} already exists")]
    AlreadyExists(&'static str),

    /// The request was malformed: a bad key, body or query parameter.
    #[error("{0}")]
    BadRequest(String),

    /// The store failed in a way the client can't fix.
    #[error("Unexpected error: {0}")]
    Unexpected(String),

    /// A generic error, when there is nothing more specific to say.
    #[error("Internal error")]
    Internal,
}

impl HandlerErrorKind {
    /// Convert the error to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyExists(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unexpected(_) | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl HandlerError {
    /// Access the wrapped error.
    pub fn kind(&self) -> &HandlerErrorKind {
        &self.kind
    }

    /// Get a `HandlerError` representing an `Internal` error.
    pub fn internal() -> Self {
        HandlerErrorKind::Internal.into()
    }

    /// Get a `HandlerError` for a malformed request.
    pub fn bad_request<S: ToString>(message: S) -> Self {
        HandlerErrorKind::BadRequest(message.to_string()).into()
    }

    /// Translate a store failure for a request about `entity`, such as "Airline".
    pub fn from_store(error: StoreError, entity: &'static str) -> Self {
        match error {
            StoreError::NotFound => HandlerErrorKind::NotFound(entity),
            StoreError::AlreadyExists => HandlerErrorKind::AlreadyExists(entity),
            StoreError::InvalidKey(message) => HandlerErrorKind::BadRequest(message),
            error @ (StoreError::Connection(_) | StoreError::Unexpected(_)) => {
                HandlerErrorKind::Unexpected(error.to_string())
            }
        }
        .into()
    }
}

impl From<HandlerErrorKind> for HandlerError {
    fn from(kind: HandlerErrorKind) -> Self {
        HandlerError {
            kind,
            backtrace: Backtrace::new(),
        }
    }
}

impl Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.kind.source()
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        // Sentry groups events by the type it parses from this debug output,
        // so the struct name carries the error kind: `HandlerError/<kind>`.
        // See `sentry::parse_type_from_debug` used by middleware/sentry.rs
        fmt.debug_struct(&format!("HandlerError/{:?}", &self.kind))
            .field("kind", &self.kind)
            .field("backtrace", &self.backtrace)
            .finish()
    }
}

/// The body of every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    /// A human readable description of the error.
    detail: String,
}

impl ResponseError for HandlerError {
    fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            detail: self.kind().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use pretty_assertions::assert_eq;

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (StoreError::NotFound, StatusCode::NOT_FOUND, "Airline not found"),
            (
                StoreError::AlreadyExists,
                StatusCode::CONFLICT,
                "Airline already exists",
            ),
            (
                StoreError::InvalidKey("key must not be empty".to_string()),
                StatusCode::BAD_REQUEST,
                "key must not be empty",
            ),
            (
                StoreError::Unexpected(anyhow!("disk on fire")),
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unexpected error: disk on fire",
            ),
        ];

        for (store_error, status, message) in cases {
            let error = HandlerError::from_store(store_error, "Airline");
            assert_eq!(error.status_code(), status);
            assert_eq!(error.to_string(), message);
        }
    }

    #[test]
    fn debug_output_names_the_kind() {
        let error = HandlerError::from_store(StoreError::NotFound, "Route");
        assert!(format!("{:?}", error).starts_with("HandlerError/NotFound(\"Route\")"));
    }
}
