//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use woofya_common::store::StoreError;

/// Result type alias for server operations
pub type ServerResult<T> = std::result::Result<T, ServerError>;

/// Errors raised while starting or running the server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Body shared by every error response: `{ "error": "<message>" }`
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Map a store failure onto an HTTP status
///
/// Storage and serialization failures are logged and reported with a
/// generic message.
pub fn store_error_response(err: &StoreError) -> Response {
    match err {
        StoreError::Conflict { .. } => error_response(StatusCode::CONFLICT, err.to_string()),
        StoreError::NotFound(_) => error_response(StatusCode::NOT_FOUND, err.to_string()),
        StoreError::Invalid(_) => error_response(StatusCode::BAD_REQUEST, err.to_string()),
        StoreError::Storage(_) | StoreError::Serialization(_) => {
            tracing::error!("Store error: {}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "A storage error occurred")
        },
    }
}
