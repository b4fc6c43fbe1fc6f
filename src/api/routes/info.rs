//! Metadata probe handler.

use super::VideoInfoRequest;
use crate::api::extract::ApiJson;
use crate::api::AppState;
use axum::{extract::State, Json};
use crate::types::TaskMetadata;

/// POST /video-info - Probe source metadata without downloading
///
/// An over-cap duration is reported as a non-fatal `duration_warning` field;
/// rejection only happens at conversion time.
#[utoipa::path(
    post,
    path = "/video-info",
    tag = "conversion",
    request_body = VideoInfoRequest,
    responses(
        (status = 200, description = "Source metadata", body = TaskMetadata),
        (status = 400, description = "Invalid URL or source unavailable"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn video_info(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VideoInfoRequest>,
) -> crate::Result<Json<TaskMetadata>> {
    let metadata = state.converter.probe(&request.url).await?;
    tracing::info!(title = %metadata.title, "Probe succeeded");
    Ok(Json(metadata))
}
