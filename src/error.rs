//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing setting: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
    #[error("duplicate collection: {0}")]
    DuplicateCollection(String),
}

/// Failures raised by a backing store. The native driver message is kept verbatim.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store connection: {0}")]
    Connection(String),
    #[error("store query: {0}")]
    Query(String),
    #[error("malformed identifier: {0}")]
    MalformedIdentifier(String),
    #[error("record has no '{0}' field")]
    MissingIdentifier(&'static str),
    #[error("introspection of {collection}: {message}")]
    Introspection { collection: String, message: String },
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Connection(e.to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;
        match *e.kind {
            ErrorKind::Io(_) | ErrorKind::ServerSelection { .. } => StoreError::Connection(e.to_string()),
            _ => StoreError::Query(e.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::Store(e) => match e {
                StoreError::MalformedIdentifier(_) => (StatusCode::BAD_REQUEST, "malformed_identifier"),
                StoreError::MissingIdentifier(_) => (StatusCode::BAD_REQUEST, "missing_identifier"),
                StoreError::Connection(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_connection_error"),
                StoreError::Query(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_query_error"),
                StoreError::Introspection { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "introspection_error"),
            },
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_identifier_is_a_client_error() {
        let e = AppError::from(StoreError::MalformedIdentifier("xyz".into()));
        assert_eq!(e.status_and_code().0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn query_error_keeps_native_message() {
        let e = AppError::from(StoreError::Query("relation \"nope\" does not exist".into()));
        assert_eq!(e.status_and_code(), (StatusCode::INTERNAL_SERVER_ERROR, "store_query_error"));
        assert!(e.to_string().contains("relation \"nope\" does not exist"));
    }

    #[test]
    fn pool_timeout_is_a_connection_error() {
        assert!(matches!(StoreError::from(sqlx::Error::PoolTimedOut), StoreError::Connection(_)));
        assert!(matches!(StoreError::from(sqlx::Error::RowNotFound), StoreError::Query(_)));
    }
}
