//! Core types for yt2mp3

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

/// Unique identifier for a conversion task
///
/// Task ids are freshly generated UUIDv4 values and never reused, so a
/// completed task's id cannot collide with a later task while its output
/// file is still awaiting delayed deletion.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generate a fresh high-entropy task id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Conversion task status
///
/// Statuses form a monotonic progression: `Queued < Downloading < Processing
/// < Completed`. `Failed` is reachable from any non-terminal state and is
/// terminal. The registry rejects backward transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Created, engine not yet invoked
    Queued,
    /// Engine is fetching the source
    Downloading,
    /// Transcode/normalization in progress
    Processing,
    /// Output file ready for download
    Completed,
    /// Terminal failure
    Failed,
}

impl Status {
    /// Position of this status in the lifecycle ordering
    ///
    /// Used by the registry to enforce that transitions never move backward.
    /// `Failed` ranks above everything so it can be entered from any
    /// non-terminal state but never left.
    pub fn rank(&self) -> u8 {
        match self {
            Status::Queued => 0,
            Status::Downloading => 1,
            Status::Processing => 2,
            Status::Completed => 3,
            Status::Failed => 4,
        }
    }

    /// Whether this status is terminal (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Failed)
    }
}

/// Live progress state of one task
///
/// Each engine progress event overwrites the previous values; no history is
/// retained.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskProgress {
    /// Current lifecycle status
    pub status: Status,
    /// Percent complete, 0–100; `None` while probing or unknown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f32>,
    /// Transfer speed as reported by the engine ("N/A" when unavailable)
    pub speed: String,
    /// Estimated time remaining as reported by the engine ("N/A" when unavailable)
    pub eta: String,
    /// Timestamp of the last update
    pub updated_at: DateTime<Utc>,
    /// Failure reason (sanitized), present only for failed tasks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskProgress {
    /// Initial progress state for a freshly created task
    pub fn queued() -> Self {
        Self {
            status: Status::Queued,
            percent: None,
            speed: "N/A".to_string(),
            eta: "N/A".to_string(),
            updated_at: Utc::now(),
            error: None,
        }
    }
}

/// Partial update applied to a task's progress
///
/// Only the fields that are `Some` overwrite the stored state; the timestamp
/// is always refreshed. This mirrors the engine's push-style progress events.
#[derive(Clone, Debug, Default)]
pub struct ProgressUpdate {
    /// New status, if the lifecycle advanced
    pub status: Option<Status>,
    /// New percent-complete value
    pub percent: Option<f32>,
    /// New transfer speed string
    pub speed: Option<String>,
    /// New ETA string
    pub eta: Option<String>,
    /// Failure reason (set together with `Status::Failed`)
    pub error: Option<String>,
}

impl ProgressUpdate {
    /// Update that only advances the status
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Update for a terminal failure with a sanitized reason
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: Some(Status::Failed),
            error: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// Source metadata captured once at probe time
///
/// Immutable after capture; attached to the task for filename derivation and
/// merged into progress responses.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskMetadata {
    /// Source-side video id
    pub id: String,
    /// Video title
    pub title: String,
    /// Channel/uploader name
    pub uploader: String,
    /// Duration in seconds
    pub duration: u64,
    /// Human-readable duration ("12:34")
    pub duration_string: String,
    /// View count at probe time
    pub view_count: u64,
    /// Upload date (YYYYMMDD as reported by the engine)
    pub upload_date: String,
    /// Description excerpt (truncated to 500 characters)
    pub description: String,
    /// Thumbnail URL
    pub thumbnail: String,
    /// Canonical page URL
    pub webpage_url: String,
    /// Number of formats the source offers
    pub formats_available: usize,
    /// Whether the source is a live stream
    pub is_live: bool,
    /// Non-fatal warning set when the duration exceeds the configured cap
    ///
    /// Probing an over-cap source still succeeds; only an actual conversion
    /// is rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_warning: Option<String>,
}

/// Merged view of one task returned by the progress endpoint
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskSnapshot {
    /// Task id
    pub task_id: TaskId,
    /// Current progress state
    #[serde(flatten)]
    pub progress: TaskProgress,
    /// Probe metadata, once captured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_info: Option<TaskMetadata>,
}

/// A finished conversion ready to be streamed to the client
#[derive(Clone, Debug)]
pub struct FinishedFile {
    /// The task that produced the file
    pub task_id: TaskId,
    /// Location of the output file on disk
    pub path: PathBuf,
    /// Content-safe attachment filename derived from the title
    pub filename: String,
    /// Metadata captured at probe time
    pub metadata: TaskMetadata,
}

/// Events emitted on the broadcast bus as tasks move through their lifecycle
///
/// Consumed by the per-task SSE progress stream; slow receivers may miss
/// events (broadcast semantics), which is acceptable because every event
/// carries the full current state, not a delta.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// Task created and queued
    Queued {
        /// Task id
        task_id: TaskId,
    },
    /// Progress changed (download or processing)
    Progress {
        /// Task id
        task_id: TaskId,
        /// Full current progress state
        progress: TaskProgress,
    },
    /// Task completed, output file available
    Completed {
        /// Task id
        task_id: TaskId,
    },
    /// Task failed with a sanitized reason
    Failed {
        /// Task id
        task_id: TaskId,
        /// Sanitized failure reason
        reason: String,
    },
    /// Task removed from the registry (file served or abandoned)
    Removed {
        /// Task id
        task_id: TaskId,
    },
}

impl Event {
    /// The task this event concerns
    pub fn task_id(&self) -> &TaskId {
        match self {
            Event::Queued { task_id }
            | Event::Progress { task_id, .. }
            | Event::Completed { task_id }
            | Event::Failed { task_id, .. }
            | Event::Removed { task_id } => task_id,
        }
    }

    /// SSE event type name
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Queued { .. } => "queued",
            Event::Progress { .. } => "progress",
            Event::Completed { .. } => "completed",
            Event::Failed { .. } => "failed",
            Event::Removed { .. } => "removed",
        }
    }
}
