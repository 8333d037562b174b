//! Error types for campus-live
//!
//! Domain taxonomy of the live-occupancy core: a reading is either rejected
//! before any mutation (`BindingNotFound`, `InvalidReading`), or accepted and
//! reconciled with degraded side effects logged rather than returned.

use crate::calendar::ProviderError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for campus-live
#[derive(Error, Debug)]
pub enum Error {
    /// No space is bound to the reporting sensor
    #[error("No space bound to sensor: {0}")]
    BindingNotFound(String),

    /// Requested space does not exist
    #[error("Space not found: {0}")]
    SpaceNotFound(String),

    /// Malformed telemetry reading
    #[error("Invalid reading: {0}")]
    InvalidReading(String),

    /// Calendar snapshot fetch failed or timed out
    #[error("Calendar provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Live-state or history write/read failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors from campus-common
    #[error(transparent)]
    Common(#[from] campus_common::Error),
}

/// Convenience Result type using campus-live Error
pub type Result<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            Error::BindingNotFound(_) => (StatusCode::NOT_FOUND, "BINDING_NOT_FOUND"),
            Error::SpaceNotFound(_) => (StatusCode::NOT_FOUND, "SPACE_NOT_FOUND"),
            Error::InvalidReading(_) => (StatusCode::BAD_REQUEST, "INVALID_READING"),
            Error::Provider(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PROVIDER_ERROR"),
            Error::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR"),
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            Error::Common(campus_common::Error::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            Error::Common(_) => (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR"),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
