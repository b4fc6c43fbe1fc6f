//! OpenAPI documentation and schema generation
//!
//! Compile-time OpenAPI spec for the REST API, served at `/openapi.json`.

use utoipa::OpenApi;

/// OpenAPI documentation for the yt2mp3 REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "yt2mp3 REST API",
        version = "0.2.0",
        description = "REST API for converting YouTube videos to MP3, with progress reporting and single-use downloads",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    paths(
        crate::api::routes::video_info,
        crate::api::routes::convert,
        crate::api::routes::get_progress,
        crate::api::routes::progress_stream,
        crate::api::routes::download,
        crate::api::routes::health_check,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::TaskId,
        crate::types::Status,
        crate::types::TaskProgress,
        crate::types::TaskMetadata,
        crate::types::TaskSnapshot,

        // API request types
        crate::api::routes::VideoInfoRequest,
        crate::api::routes::ConvertRequest,

        // Error body from error.rs
        crate::error::ApiError,
    )),
    tags(
        (name = "conversion", description = "Probe, convert, track, and download conversions"),
        (name = "system", description = "Health check and OpenAPI spec"),
    )
)]
pub struct ApiDoc;
