//! Shared test helpers: a scriptable mock engine for worker and API tests.

use crate::engine::{FetchRequest, MediaEngine};
use crate::error::Error;
use crate::types::{ProgressUpdate, Status, TaskMetadata};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;

/// A well-formed source URL accepted by the validator
pub(crate) const VALID_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// Shared invocation counters so tests can assert which engine calls ran
#[derive(Clone, Default)]
pub(crate) struct CallCounts {
    probe: Arc<AtomicUsize>,
    fetch: Arc<AtomicUsize>,
}

impl CallCounts {
    pub(crate) fn probe_count(&self) -> usize {
        self.probe.load(Ordering::SeqCst)
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.fetch.load(Ordering::SeqCst)
    }
}

/// Scriptable engine double
///
/// By default: probe succeeds with fixed metadata, fetch writes the output
/// file, normalize succeeds. One-shot errors can be injected per call site.
#[derive(Default)]
pub(crate) struct MockEngine {
    duration: Option<u64>,
    probe_error: Mutex<Option<Error>>,
    fetch_error: Mutex<Option<Error>>,
    normalize_error: Mutex<Option<Error>>,
    skip_output_file: bool,
    emit_progress: bool,
    calls: CallCounts,
}

impl MockEngine {
    /// Report this duration from probes
    pub(crate) fn with_duration(mut self, duration: u64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Fail the next probe with this error
    pub(crate) fn with_probe_error(self, error: Error) -> Self {
        *self.probe_error.lock().unwrap() = Some(error);
        self
    }

    /// Fail the next fetch with this error
    pub(crate) fn with_fetch_error(self, error: Error) -> Self {
        *self.fetch_error.lock().unwrap() = Some(error);
        self
    }

    /// Fail the next normalization with this error
    pub(crate) fn with_normalize_error(self, error: Error) -> Self {
        *self.normalize_error.lock().unwrap() = Some(error);
        self
    }

    /// Report fetch success without writing the output file
    pub(crate) fn without_output_file(mut self) -> Self {
        self.skip_output_file = true;
        self
    }

    /// Emit a handful of progress events during fetch
    pub(crate) fn with_progress_events(mut self) -> Self {
        self.emit_progress = true;
        self
    }

    /// Handle onto the invocation counters
    pub(crate) fn calls(&self) -> CallCounts {
        self.calls.clone()
    }

    pub(crate) fn sample_metadata(&self) -> TaskMetadata {
        TaskMetadata {
            id: "dQw4w9WgXcQ".to_string(),
            title: "Test Video".to_string(),
            uploader: "Tester".to_string(),
            duration: self.duration.unwrap_or(213),
            duration_string: "3:33".to_string(),
            view_count: 42,
            upload_date: "20091025".to_string(),
            description: "A test video".to_string(),
            thumbnail: "https://example.invalid/thumb.jpg".to_string(),
            webpage_url: VALID_URL.to_string(),
            formats_available: 3,
            is_live: false,
            duration_warning: None,
        }
    }
}

#[async_trait]
impl MediaEngine for MockEngine {
    async fn probe(&self, _url: &str) -> crate::Result<TaskMetadata> {
        self.calls.probe.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.probe_error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self.sample_metadata())
    }

    async fn fetch(
        &self,
        request: FetchRequest,
        progress: UnboundedSender<ProgressUpdate>,
    ) -> crate::Result<()> {
        self.calls.fetch.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.fetch_error.lock().unwrap().take() {
            return Err(error);
        }

        if self.emit_progress {
            for percent in [10.0_f32, 50.0, 90.0] {
                let _ = progress.send(ProgressUpdate {
                    status: Some(Status::Downloading),
                    percent: Some(percent),
                    speed: Some("1.0MiB/s".to_string()),
                    eta: Some("00:10".to_string()),
                    error: None,
                });
            }
        }

        if !self.skip_output_file {
            tokio::fs::write(&request.output_path, b"mp3 bytes").await?;
        }
        Ok(())
    }

    async fn normalize(&self, _path: &Path, _bitrate: u32) -> crate::Result<()> {
        if let Some(error) = self.normalize_error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
