//! Health and OpenAPI handlers.

use crate::api::openapi::ApiDoc;
use axum::Json;
use serde_json::json;
use utoipa::OpenApi;

/// GET /health - Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is up")
    )
)]
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /openapi.json - Machine-readable API description
pub async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
