//! Download-by-id handler.

use super::stream_file;
use crate::api::AppState;
use crate::types::TaskId;
use axum::{
    extract::{Path, State},
    response::Response,
};

/// GET /download/{task_id} - Fetch the finished file for a completed task
///
/// First successful download claims the task: the registry entry is removed
/// before the body is streamed, so repeat downloads and later progress polls
/// both report not-found.
#[utoipa::path(
    get,
    path = "/download/{task_id}",
    tag = "conversion",
    params(
        ("task_id" = String, Path, description = "Task identifier")
    ),
    responses(
        (status = 200, description = "MP3 file attachment", content_type = "audio/mpeg"),
        (status = 400, description = "Task not completed yet"),
        (status = 404, description = "Unknown task or file already gone")
    )
)]
pub async fn download(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> crate::Result<Response> {
    let task_id = TaskId::from(task_id);
    let finished = state.converter.claim_completed(&task_id).await?;

    let response = stream_file(&finished).await?;
    state.converter.schedule_cleanup(finished.path.clone());

    tracing::info!(task_id = %task_id, filename = %finished.filename, "Serving claimed file");
    Ok(response)
}
