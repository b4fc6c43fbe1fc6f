//! Progress polling and the per-task event stream.

use crate::api::AppState;
use crate::error::Error;
use crate::types::{Event, TaskId, TaskSnapshot};
use axum::{
    extract::{Path, State},
    response::sse::{self, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use futures::StreamExt;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;

/// GET /progress/{task_id} - Current merged state of a task
///
/// Returns only the latest state; no history is kept. A finished task
/// disappears from here as soon as its file has been claimed.
#[utoipa::path(
    get,
    path = "/progress/{task_id}",
    tag = "conversion",
    params(
        ("task_id" = String, Path, description = "Task identifier")
    ),
    responses(
        (status = 200, description = "Task snapshot", body = TaskSnapshot),
        (status = 404, description = "Unknown or already-claimed task")
    )
)]
pub async fn get_progress(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> crate::Result<Json<TaskSnapshot>> {
    let task_id = TaskId::from(task_id);
    let snapshot = state.converter.snapshot(&task_id).await?;
    Ok(Json(snapshot))
}

/// GET /progress/{task_id}/stream - Server-sent lifecycle events for one task
///
/// Emits every lifecycle event for the task as it happens; the stream ends
/// when the server shuts down or the client disconnects. Slow consumers that
/// fall behind the bus simply miss the lagged events.
#[utoipa::path(
    get,
    path = "/progress/{task_id}/stream",
    tag = "conversion",
    params(
        ("task_id" = String, Path, description = "Task identifier")
    ),
    responses(
        (status = 200, description = "SSE stream of lifecycle events", content_type = "text/event-stream"),
        (status = 404, description = "Unknown task")
    )
)]
pub async fn progress_stream(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> crate::Result<Sse<impl Stream<Item = Result<sse::Event, Infallible>>>> {
    let task_id = TaskId::from(task_id);
    // Reject unknown ids up front so clients get a 404 instead of a silent
    // stream that never produces anything
    state.converter.snapshot(&task_id).await?;

    let receiver = state.converter.subscribe();
    let stream = BroadcastStream::new(receiver).filter_map(move |event| {
        let task_id = task_id.clone();
        async move {
            match event {
                Ok(event) if *event.task_id() == task_id => Some(Ok(to_sse_event(&event))),
                // Other tasks' events and lag errors are skipped
                _ => None,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse_event(event: &Event) -> sse::Event {
    let sse_event = sse::Event::default().event(event.kind());
    match serde_json::to_string(event) {
        Ok(json) => sse_event.data(json),
        Err(e) => sse_event.data(format!("{{\"error\":\"{}\"}}", Error::Serialization(e))),
    }
}
