//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`info`] — metadata probe
//! - [`convert`] — synchronous conversion returning the file
//! - [`progress`] — progress polling and the per-task SSE stream
//! - [`download`] — download-by-id with claim semantics
//! - [`system`] — health and OpenAPI

use crate::error::Error;
use crate::types::FinishedFile;
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

mod convert;
mod download;
mod info;
mod progress;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use convert::*;
pub use download::*;
pub use info::*;
pub use progress::*;
pub use system::*;

// ============================================================================
// Request Types (shared across handlers)
// ============================================================================

/// Request body for POST /video-info
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct VideoInfoRequest {
    /// Source URL to probe
    pub url: String,
}

/// Request body for POST /convert
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ConvertRequest {
    /// Source URL to convert
    pub url: String,
    /// Target bitrate in kbps (default: 128)
    #[serde(default = "default_bitrate")]
    pub bitrate: u32,
}

fn default_bitrate() -> u32 {
    128
}

/// Stream a finished file as an `audio/mpeg` attachment
///
/// The body is handed to the runtime as a stream; callers schedule the
/// delayed delete before returning and never wait for the client to finish
/// reading.
pub(crate) async fn stream_file(finished: &FinishedFile) -> crate::Result<Response> {
    let file = tokio::fs::File::open(&finished.path)
        .await
        .map_err(|_| Error::NotFound("File".to_string()))?;
    let content_length = file.metadata().await.ok().map(|m| m.len());

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "audio/mpeg")
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"",
                finished.filename.replace('"', "'")
            ),
        );
    if let Some(length) = content_length {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }

    builder
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| Error::ApiServer(e.to_string()))
}
