//! The custom `ApiError` type for the HTTP server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::persistence::PersistenceError;

/// A custom error type for the API that can be converted into an HTTP
/// response.
pub enum ApiError {
    /// The request carried no valid API key.
    Unauthorized,

    /// A resource that could not be found.
    NotFound(String),

    /// A bad request (invalid input, rejected configuration).
    BadRequest(String),

    /// A generic internal server error.
    InternalServerError(String),
}

/// Allows the convenient use of `?` in handlers over repository calls.
impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound(msg) => ApiError::NotFound(msg),
            PersistenceError::InvalidInput(msg) => ApiError::BadRequest(msg),
            _ => ApiError::InternalServerError(err.to_string()),
        }
    }
}

/// The central point for mapping internal errors to user-facing responses.
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match self {
            ApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Invalid or missing API key".to_string())
            }
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::InternalServerError(err) => {
                // Log the detail, return a generic message.
                tracing::error!("internal server error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal server error occurred".to_string())
            }
        };

        let body = Json(json!({ "error": error_message }));

        (status, body).into_response()
    }
}
