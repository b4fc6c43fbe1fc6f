//! Media Fetch & Transcode Engine
//!
//! The engine is the external collaborator that probes source metadata and
//! downloads + transcodes audio. It sits behind the [`MediaEngine`] trait so
//! the conversion worker can be tested with a mock instead of real network
//! and subprocess calls.
//!
//! Progress events are pushed through an explicit channel keyed by the
//! caller-supplied task id; the worker forwards them verbatim into the task
//! registry.

pub mod progress;
pub mod ytdlp;

pub use progress::{classify_engine_failure, parse_progress_line};
pub use ytdlp::YtDlpEngine;

use crate::types::{ProgressUpdate, TaskId, TaskMetadata};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;

/// One fetch-and-transcode invocation
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Source URL to fetch
    pub url: String,
    /// Target bitrate in kbps
    pub bitrate: u32,
    /// Task the request belongs to; progress events correlate to this id
    pub task_id: TaskId,
    /// Expected final output path (`<output_dir>/<task_id>.mp3`)
    pub output_path: PathBuf,
}

/// Trait for the external fetch/transcode engine
///
/// Implementations can shell out to yt-dlp/ffmpeg or provide scripted
/// behavior for tests.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Fetch source metadata without downloading anything
    ///
    /// Returns a `SourceUnavailable` error when the engine reports the
    /// source as private/removed, `ConversionFailed` for other faults.
    async fn probe(&self, url: &str) -> crate::Result<TaskMetadata>;

    /// Download and transcode the source to the requested output path
    ///
    /// Progress events are sent on `progress` as the engine emits them; the
    /// channel may be dropped by the receiver at any time, which must not
    /// abort the fetch.
    async fn fetch(
        &self,
        request: FetchRequest,
        progress: UnboundedSender<ProgressUpdate>,
    ) -> crate::Result<()>;

    /// Re-encode an output file to the exact requested bitrate
    ///
    /// Callers treat failures as soft: the original file is kept and the
    /// error is logged, never surfaced to the client.
    async fn normalize(&self, path: &Path, bitrate: u32) -> crate::Result<()>;

    /// Implementation name for logging
    fn name(&self) -> &'static str;
}
