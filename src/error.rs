//! Error types for yt2mp3
//!
//! This module provides error handling for the service, including:
//! - Domain-specific error variants (validation, engine, lifecycle)
//! - HTTP status code mapping for API integration
//! - Client-safe message sanitization: engine/tool diagnostics never reach
//!   the client; full detail is logged server-side instead

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for yt2mp3 operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for yt2mp3
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or rejected client input (bad URL, out-of-range bitrate,
    /// non-JSON body). Safe to show detail to the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The engine reports the source as private, removed, or otherwise
    /// unavailable. The message is sanitized before reaching the client.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// Source duration exceeds the configured policy cap
    #[error("source duration {actual}s exceeds the {limit}s limit")]
    DurationExceeded {
        /// The configured duration cap in seconds
        limit: u64,
        /// The duration the source reported
        actual: u64,
    },

    /// Engine ran but produced no usable output, or an internal fault
    /// occurred mid-conversion. Clients get a generic message only.
    #[error("conversion failed: {0}")]
    ConversionFailed(String),

    /// Unknown or already-removed task id, or missing output file
    #[error("not found: {0}")]
    NotFound(String),

    /// Task exists but its output is not ready for download yet
    #[error("task {0} is not completed yet")]
    NotReady(String),

    /// Request body exceeded the configured size limit
    #[error("request body too large")]
    PayloadTooLarge,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServer(String),

    /// External engine binary missing or not executable
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),
}

/// API error response body
///
/// Every error endpoint response has the shape `{"error": "<message>"}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Human-readable, client-safe error message
    pub error: String,
}

impl ApiError {
    /// Create a new API error body
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code (used in logs and tests)
    fn error_code(&self) -> &str;

    /// Get the message to expose to the client
    ///
    /// Server-side faults are replaced with a generic message; the full
    /// detail is expected to have been logged at the failure site.
    fn client_message(&self) -> String;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - client error or rejected source
            Error::InvalidInput(_) => 400,
            Error::SourceUnavailable(_) => 400,
            Error::DurationExceeded { .. } => 400,
            Error::NotReady(_) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 413 Payload Too Large
            Error::PayloadTooLarge => 413,

            // 500 Internal Server Error - never leak detail
            Error::ConversionFailed(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServer(_) => 500,
            Error::EngineUnavailable(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::SourceUnavailable(_) => "source_unavailable",
            Error::DurationExceeded { .. } => "duration_exceeded",
            Error::NotReady(_) => "not_ready",
            Error::NotFound(_) => "not_found",
            Error::PayloadTooLarge => "payload_too_large",
            Error::ConversionFailed(_) => "conversion_failed",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServer(_) => "api_server_error",
            Error::EngineUnavailable(_) => "engine_unavailable",
        }
    }

    fn client_message(&self) -> String {
        match self {
            // Detail is safe for client-side errors
            Error::InvalidInput(msg) => msg.clone(),
            Error::SourceUnavailable(_) => {
                "Failed to fetch source. Video may be private or unavailable.".to_string()
            }
            Error::DurationExceeded { limit, .. } => {
                format!("Video too long (max {} seconds)", limit)
            }
            Error::NotReady(_) => "Download not completed yet".to_string(),
            Error::NotFound(resource) => format!("{} not found", resource),
            Error::PayloadTooLarge => "Request too large".to_string(),

            // Generic message for all server-side faults
            Error::ConversionFailed(_) => "Conversion failed".to_string(),
            Error::Io(_) | Error::Serialization(_) | Error::ApiServer(_) => {
                "Internal server error".to_string()
            }
            Error::EngineUnavailable(_) => "Internal server error".to_string(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        ApiError::new(error.client_message())
    }
}
