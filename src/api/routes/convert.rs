//! Synchronous conversion handler.

use super::{stream_file, ConvertRequest};
use crate::api::extract::ApiJson;
use crate::api::AppState;
use axum::{extract::State, response::Response};

/// POST /convert - Convert a source to MP3 and return the file
///
/// Blocks for the whole conversion and streams the result back in the same
/// response. The task's registry entry is dropped once the body is handed to
/// the runtime, and the physical file is scheduled for its delayed delete, so
/// a converted file is served exactly once.
#[utoipa::path(
    post,
    path = "/convert",
    tag = "conversion",
    request_body = ConvertRequest,
    responses(
        (status = 200, description = "MP3 file attachment", content_type = "audio/mpeg"),
        (status = 400, description = "Invalid URL, bad bitrate, or duration over the cap"),
        (status = 413, description = "Request body too large"),
        (status = 500, description = "Conversion failed")
    )
)]
pub async fn convert(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ConvertRequest>,
) -> crate::Result<Response> {
    let finished = state.converter.convert(&request.url, request.bitrate).await?;

    let response = stream_file(&finished).await?;

    // The entry is gone before the client finishes reading; the file outlives
    // the response by the configured delay only
    state.converter.remove_task(&finished.task_id).await;
    state.converter.schedule_cleanup(finished.path.clone());

    tracing::info!(
        task_id = %finished.task_id,
        filename = %finished.filename,
        "Serving converted file"
    );
    Ok(response)
}
