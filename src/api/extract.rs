//! JSON body extraction mapped onto the error taxonomy
//!
//! Axum's stock `Json` rejections carry their own status codes and plain-text
//! bodies; this wrapper converts them so malformed/non-JSON bodies become
//! `InvalidInput` (400) and body-limit overruns keep their 413, both with the
//! standard `{"error": <string>}` body.

use crate::error::Error;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    Json,
};

/// `Json<T>` with rejections mapped to [`Error`]
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                Err(Error::PayloadTooLarge)
            }
            Err(rejection) => Err(Error::InvalidInput(rejection.body_text())),
        }
    }
}
