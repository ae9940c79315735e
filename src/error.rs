// src/error.rs

use axum::{
    Json,
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error (store failures)
    InternalServerError(String),

    // 400 Bad Request (missing or malformed fields)
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 404 Not Found
    NotFound(String),

    // 403 No attempt exists for the requested student and assignment
    NotRegistered,

    // 403 The single full playback was already handed out
    AlreadyConsumed,

    // 404 The database points at audio that is no longer on disk
    ResourceMissing(String),

    // 416 Range Not Satisfiable, carries the resource size
    RangeNotSatisfiable(u64),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::NotRegistered => (StatusCode::FORBIDDEN, "Not registered".to_string()),
            AppError::AlreadyConsumed => (
                StatusCode::FORBIDDEN,
                "Audio already played once.".to_string(),
            ),
            AppError::ResourceMissing(msg) => {
                tracing::error!("Resource missing: {}", msg);
                (StatusCode::NOT_FOUND, "File missing".to_string())
            }
            AppError::RangeNotSatisfiable(size) => {
                let mut response = (
                    StatusCode::RANGE_NOT_SATISFIABLE,
                    Json(json!({ "error": "Requested range not satisfiable" })),
                )
                    .into_response();
                if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", size)) {
                    response.headers_mut().insert(header::CONTENT_RANGE, value);
                }
                return response;
            }
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::BadRequest(format!("Invalid multipart data: {}", err))
    }
}

/// A body that is not JSON, or not the right shape, reads the same as an
/// incomplete form.
impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        tracing::debug!("Rejected JSON body: {}", err.body_text());
        AppError::BadRequest("Missing fields.".to_string())
    }
}
