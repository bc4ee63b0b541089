use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    /// The level table cannot place an XP total. A seeding bug, not a
    /// transient condition: retrying cannot help until the table is fixed.
    #[error("Level table misconfigured: {0}")]
    LevelTable(String),
    /// Concurrent progress updates exhausted their bounded retries; the
    /// caller may safely re-submit.
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Database(err) => {
                tracing::error!(error = %err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            Self::LevelTable(detail) => {
                tracing::error!(detail = %detail, "level table misconfigured, XP awards are broken");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Progression configuration error".to_string(),
                )
            }
            Self::Auth(message) => (StatusCode::UNAUTHORIZED, message.clone()),
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            Self::Conflict(message) => (StatusCode::SERVICE_UNAVAILABLE, message.clone()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
