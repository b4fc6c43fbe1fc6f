//! HTTP error response handling for the API
//!
//! Converts domain errors to HTTP responses with the `{"error": <string>}`
//! body shape. Server-side faults are logged with full detail here and
//! reduced to a generic client message; nothing propagates as an unhandled
//! fault.

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Implement IntoResponse for Error to automatically convert errors to HTTP
/// responses at the endpoint boundary
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status_code.is_server_error() {
            // The only place raw detail is recorded; the client body below
            // carries the sanitized message
            tracing::error!(code = self.error_code(), error = %self, "Request failed");
        }

        let api_error: ApiError = self.into();
        (status_code, Json(api_error)).into_response()
    }
}
