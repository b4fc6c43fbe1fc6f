//! Conversion worker and service facade
//!
//! [`AudioConverter`] owns the task registry, the engine, and the event bus,
//! and drives one task through its lifecycle: validate → probe → fetch →
//! verify → normalize → complete. It is the object handed to API handlers
//! through shared state; handlers never touch the engine directly.

use crate::config::Config;
use crate::engine::{FetchRequest, MediaEngine};
use crate::error::{Error, ToHttpStatus};
use crate::janitor::{self, JanitorTask};
use crate::registry::TaskRegistry;
use crate::types::{
    Event, FinishedFile, ProgressUpdate, Status, TaskId, TaskMetadata, TaskSnapshot,
};
use crate::utils::{is_valid_bitrate, is_valid_source_url, sanitize_filename};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Capacity of the lifecycle event bus
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Main service facade: registry + engine + event bus + file-lifetime policy
pub struct AudioConverter {
    /// Service configuration
    pub config: Arc<Config>,
    /// Task registry, shared with the janitor
    pub registry: Arc<TaskRegistry>,
    engine: Arc<dyn MediaEngine>,
    events: broadcast::Sender<Event>,
    shutdown: Arc<AtomicBool>,
}

impl AudioConverter {
    /// Create a converter, ensuring the output directory exists
    pub fn new(config: Config, engine: Arc<dyn MediaEngine>) -> crate::Result<Self> {
        std::fs::create_dir_all(&config.conversion.output_dir)?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        info!(
            engine = engine.name(),
            output_dir = %config.conversion.output_dir.display(),
            "Converter ready"
        );

        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(TaskRegistry::new()),
            engine,
            events,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Subscribe to lifecycle events (consumed by the SSE progress stream)
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Raise the shutdown flag; background tasks exit at their next tick
    pub fn shutdown(&self) {
        info!("Shutdown requested");
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown has been requested
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Spawn the periodic janitor for the output directory and registry
    ///
    /// Runs one sweep immediately, then on the configured interval, until
    /// shutdown.
    pub fn spawn_janitor(&self) -> JoinHandle<()> {
        let conversion = &self.config.conversion;
        let task = JanitorTask::new(
            conversion.output_dir.clone(),
            conversion.stale_after(),
            conversion.sweep_interval(),
            self.shutdown.clone(),
        )
        .with_registry(self.registry.clone());
        tokio::spawn(task.run())
    }

    /// Expected output path for a task
    pub fn output_path(&self, task_id: &TaskId) -> PathBuf {
        self.config
            .conversion
            .output_dir
            .join(format!("{}.mp3", task_id))
    }

    /// Probe source metadata without downloading
    ///
    /// An over-cap duration does not reject here; the metadata carries a
    /// non-fatal warning instead. Rejection only happens at conversion time.
    pub async fn probe(&self, url: &str) -> crate::Result<TaskMetadata> {
        let url = url.trim();
        if !is_valid_source_url(url) {
            return Err(Error::InvalidInput("Invalid YouTube URL".to_string()));
        }

        let mut metadata = self.engine.probe(url).await?;
        let cap = self.config.conversion.duration_cap_secs;
        if metadata.duration > cap {
            metadata.duration_warning = Some(format!(
                "Video exceeds the {}-minute limit and cannot be converted",
                cap / 60
            ));
        }
        Ok(metadata)
    }

    /// Convert one source end-to-end and return the finished file
    ///
    /// Creates the task, runs the worker, and leaves the registry entry in
    /// place (completed or failed) for progress polls; the caller removes it
    /// once the file has been handed to the client. No retries: the caller
    /// must resubmit after a failure.
    pub async fn convert(&self, url: &str, bitrate: u32) -> crate::Result<FinishedFile> {
        let url = url.trim();
        if !is_valid_source_url(url) {
            return Err(Error::InvalidInput("Invalid YouTube URL".to_string()));
        }
        let conversion = &self.config.conversion;
        if !is_valid_bitrate(bitrate, conversion.min_bitrate, conversion.max_bitrate) {
            return Err(Error::InvalidInput(format!(
                "Bitrate must be between {} and {} kbps",
                conversion.min_bitrate, conversion.max_bitrate
            )));
        }

        let task_id = self.registry.create().await;
        self.emit(Event::Queued {
            task_id: task_id.clone(),
        });

        match self.run_task(&task_id, url, bitrate).await {
            Ok(finished) => {
                self.emit(Event::Completed {
                    task_id: task_id.clone(),
                });
                Ok(finished)
            }
            Err(error) => {
                // Store the sanitized reason, never raw engine output
                let reason = error.client_message();
                self.registry
                    .update(&task_id, ProgressUpdate::failed(reason.clone()))
                    .await;
                self.emit(Event::Failed {
                    task_id: task_id.clone(),
                    reason,
                });
                Err(error)
            }
        }
    }

    /// Execute the task lifecycle for an already-created task
    async fn run_task(
        &self,
        task_id: &TaskId,
        url: &str,
        bitrate: u32,
    ) -> crate::Result<FinishedFile> {
        // Probe first: it is cheap, the download is not. The duration cap is
        // enforced here, before any fetch work starts.
        let metadata = self.probe(url).await?;
        self.registry
            .attach_metadata(task_id, metadata.clone())
            .await;

        let cap = self.config.conversion.duration_cap_secs;
        if metadata.duration > cap {
            return Err(Error::DurationExceeded {
                limit: cap,
                actual: metadata.duration,
            });
        }

        let output_path = self.output_path(task_id);
        let request = FetchRequest {
            url: url.to_string(),
            bitrate,
            task_id: task_id.clone(),
            output_path: output_path.clone(),
        };

        // Engine progress events flow through this channel into the registry
        // and onto the event bus; each update overwrites the previous one.
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<ProgressUpdate>();
        let forwarder = {
            let registry = self.registry.clone();
            let events = self.events.clone();
            let task_id = task_id.clone();
            tokio::spawn(async move {
                while let Some(update) = progress_rx.recv().await {
                    if let Some(progress) = registry.update(&task_id, update).await {
                        let _ = events.send(Event::Progress {
                            task_id: task_id.clone(),
                            progress,
                        });
                    }
                }
            })
        };

        let fetch_result = self.engine.fetch(request, progress_tx).await;
        // Channel sender is dropped; wait for queued updates to land before
        // advancing the lifecycle
        let _ = forwarder.await;
        fetch_result?;

        if !output_path.exists() {
            return Err(Error::ConversionFailed(format!(
                "engine reported success but {} does not exist",
                output_path.display()
            )));
        }

        self.registry
            .update(
                task_id,
                ProgressUpdate {
                    status: Some(Status::Processing),
                    percent: Some(100.0),
                    eta: Some("Processing...".to_string()),
                    ..Default::default()
                },
            )
            .await;

        if self.config.engine.normalize {
            // Soft-fail: the engine's native output is good enough when the
            // exact-bitrate re-encode does not work out
            if let Err(e) = self.engine.normalize(&output_path, bitrate).await {
                warn!(task_id = %task_id, error = %e, "Normalization failed, keeping engine output");
            }
        }

        self.registry
            .update(
                task_id,
                ProgressUpdate {
                    status: Some(Status::Completed),
                    percent: Some(100.0),
                    speed: Some("N/A".to_string()),
                    eta: Some("Done".to_string()),
                    ..Default::default()
                },
            )
            .await;

        info!(task_id = %task_id, title = %metadata.title, "Conversion completed");

        Ok(FinishedFile {
            task_id: task_id.clone(),
            path: output_path,
            filename: sanitize_filename(&metadata.title),
            metadata,
        })
    }

    /// Current merged state of a task for the progress endpoint
    pub async fn snapshot(&self, task_id: &TaskId) -> crate::Result<TaskSnapshot> {
        self.registry
            .snapshot(task_id)
            .await
            .ok_or_else(|| Error::NotFound("Task".to_string()))
    }

    /// Claim a completed task's file for download
    ///
    /// Removes the registry entry synchronously, so a second progress poll
    /// or download for the same id reports not-found even while the file
    /// still exists on disk awaiting its delayed delete.
    pub async fn claim_completed(&self, task_id: &TaskId) -> crate::Result<FinishedFile> {
        let progress = self
            .registry
            .get(task_id)
            .await
            .ok_or_else(|| Error::NotFound("Task".to_string()))?;

        if progress.status != Status::Completed {
            return Err(Error::NotReady(task_id.to_string()));
        }

        let path = self.output_path(task_id);
        if !path.exists() {
            return Err(Error::NotFound("File".to_string()));
        }

        let metadata = self.registry.get_metadata(task_id).await;
        let filename = metadata
            .as_ref()
            .map(|m| sanitize_filename(&m.title))
            .unwrap_or_else(|| "audio.mp3".to_string());

        // The remove is the claim: of several concurrent downloads that all
        // observed the completed state above, only the one that actually
        // removes the entry gets the file.
        if !self.registry.remove(task_id).await {
            return Err(Error::NotFound("Task".to_string()));
        }
        self.emit(Event::Removed {
            task_id: task_id.clone(),
        });

        Ok(FinishedFile {
            task_id: task_id.clone(),
            path,
            filename,
            metadata: metadata.unwrap_or_else(|| placeholder_metadata(task_id)),
        })
    }

    /// Drop a served task's registry entry and schedule the physical delete
    ///
    /// Called by handlers after the response body has been handed to the
    /// runtime; the delete runs detached and is never awaited here.
    pub fn schedule_cleanup(&self, path: PathBuf) {
        janitor::schedule_delayed_delete(path, self.config.conversion.delete_delay());
    }

    /// Remove a task's registry entry after its file has been served
    pub async fn remove_task(&self, task_id: &TaskId) {
        if self.registry.remove(task_id).await {
            self.emit(Event::Removed {
                task_id: task_id.clone(),
            });
        }
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine; SSE streams come and go
        let _ = self.events.send(event);
    }
}

/// Metadata stand-in for the edge case of a completed task whose metadata
/// was never attached
fn placeholder_metadata(task_id: &TaskId) -> TaskMetadata {
    TaskMetadata {
        id: task_id.to_string(),
        title: "audio".to_string(),
        uploader: "Unknown".to_string(),
        duration: 0,
        duration_string: "Unknown".to_string(),
        view_count: 0,
        upload_date: "Unknown".to_string(),
        description: String::new(),
        thumbnail: String::new(),
        webpage_url: String::new(),
        formats_available: 0,
        is_live: false,
        duration_warning: None,
    }
}
