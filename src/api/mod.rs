//! REST API server module
//!
//! Thin HTTP surface over the conversion service: validation, body limits,
//! and response shaping live here; all lifecycle logic stays in
//! [`AudioConverter`](crate::converter::AudioConverter).

use crate::{Config, Result};
use crate::converter::AudioConverter;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub mod error_response;
pub mod extract;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Conversion
/// - `POST /video-info` - Probe source metadata without downloading
/// - `POST /convert` - Convert and return the MP3 in one response
/// - `GET /progress/:task_id` - Current state of a task
/// - `GET /progress/:task_id/stream` - Server-sent lifecycle events
/// - `GET /download/:task_id` - Claim a completed task's file
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
///
/// Every route is also reachable under the `/api` prefix for clients that
/// sit behind a path-rewriting proxy.
pub fn create_router(converter: Arc<AudioConverter>, config: Arc<Config>) -> Router {
    let state = AppState::new(converter, config.clone());

    let routes = Router::new()
        // Conversion
        .route("/video-info", post(routes::video_info))
        .route("/convert", post(routes::convert))
        .route("/progress/:task_id", get(routes::get_progress))
        .route("/progress/:task_id/stream", get(routes::progress_stream))
        .route("/download/:task_id", get(routes::download))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec));

    let router = Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .fallback(fallback_404)
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes));

    router.layer(build_cors_layer(&config))
}

/// Unknown routes get the standard `{"error": <string>}` body, not axum's
/// empty default
async fn fallback_404() -> crate::error::Error {
    crate::error::Error::NotFound("Endpoint".to_string())
}

/// Build a CORS layer from configuration
///
/// Permissive mode allows any origin (the local-development default); the
/// strict mode allows only the configured origin list.
fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.server.cors_permissive {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = config
            .server
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address
///
/// Binds a TCP listener and serves the router; runs until the server stops.
pub async fn start_api_server(converter: Arc<AudioConverter>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.bind_address;

    let app = create_router(converter, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServer(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
