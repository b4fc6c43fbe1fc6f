//! In-memory task registry
//!
//! Maps task ids to live progress state and to cached probe metadata. The
//! registry is read by progress-polling requests and written by in-flight
//! conversion workers at the same time, so each map sits behind its own
//! `RwLock` rather than one global lock on business logic.
//!
//! The registry is an explicit, injectable service (held by
//! [`crate::converter::AudioConverter`] and handed to API handlers through
//! shared state) so tests can drive it directly with deterministic ids.

use crate::types::{ProgressUpdate, TaskId, TaskMetadata, TaskProgress, TaskSnapshot};
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Concurrent map of task id → progress state and task id → metadata
#[derive(Debug, Default)]
pub struct TaskRegistry {
    progress: RwLock<HashMap<TaskId, TaskProgress>>,
    metadata: RwLock<HashMap<TaskId, TaskMetadata>>,
}

impl TaskRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new task in the `queued` state and return its fresh id
    pub async fn create(&self) -> TaskId {
        let task_id = TaskId::generate();
        self.progress
            .write()
            .await
            .insert(task_id.clone(), TaskProgress::queued());
        task_id
    }

    /// Get the current progress state of a task
    pub async fn get(&self, task_id: &TaskId) -> Option<TaskProgress> {
        self.progress.read().await.get(task_id).cloned()
    }

    /// Apply a partial update to a task's progress
    ///
    /// Only the fields provided overwrite stored values; the timestamp is
    /// always refreshed. Status transitions are monotonic: an update that
    /// would move the lifecycle backward, or out of a terminal state, keeps
    /// the stored status and is logged. Unknown ids are ignored (the task
    /// may have been removed while an engine event was in flight).
    ///
    /// Returns the state after the update, if the task exists.
    pub async fn update(&self, task_id: &TaskId, update: ProgressUpdate) -> Option<TaskProgress> {
        let mut progress = self.progress.write().await;
        let entry = progress.get_mut(task_id)?;

        if let Some(status) = update.status {
            if entry.status.is_terminal() && status != entry.status {
                tracing::warn!(
                    task_id = %task_id,
                    from = ?entry.status,
                    to = ?status,
                    "Ignoring status transition out of terminal state"
                );
            } else if status.rank() < entry.status.rank() {
                tracing::warn!(
                    task_id = %task_id,
                    from = ?entry.status,
                    to = ?status,
                    "Ignoring backward status transition"
                );
            } else {
                entry.status = status;
            }
        }
        if let Some(percent) = update.percent {
            entry.percent = Some(percent.clamp(0.0, 100.0));
        }
        if let Some(speed) = update.speed {
            entry.speed = speed;
        }
        if let Some(eta) = update.eta {
            entry.eta = eta;
        }
        if let Some(error) = update.error {
            entry.error = Some(error);
        }
        entry.updated_at = Utc::now();

        Some(entry.clone())
    }

    /// Attach probe metadata to a task
    ///
    /// Metadata is captured once and immutable thereafter; a second attach
    /// for the same id is ignored.
    pub async fn attach_metadata(&self, task_id: &TaskId, metadata: TaskMetadata) {
        let mut map = self.metadata.write().await;
        map.entry(task_id.clone()).or_insert(metadata);
    }

    /// Get the metadata attached to a task, if any
    pub async fn get_metadata(&self, task_id: &TaskId) -> Option<TaskMetadata> {
        self.metadata.read().await.get(task_id).cloned()
    }

    /// Remove a task and its metadata
    ///
    /// This is the single authoritative point that makes a completed task
    /// invisible to future polls and downloads, independent of whether the
    /// physical file still exists on disk. Returns true if the task existed.
    pub async fn remove(&self, task_id: &TaskId) -> bool {
        let existed = self.progress.write().await.remove(task_id).is_some();
        self.metadata.write().await.remove(task_id);
        existed
    }

    /// Merged progress + metadata view for the progress endpoint
    pub async fn snapshot(&self, task_id: &TaskId) -> Option<TaskSnapshot> {
        let progress = self.get(task_id).await?;
        let video_info = self.get_metadata(task_id).await;
        Some(TaskSnapshot {
            task_id: task_id.clone(),
            progress,
            video_info,
        })
    }

    /// Remove terminal tasks that have not been touched within `max_age`
    ///
    /// Completed tasks are normally removed when their file is served;
    /// failed or abandoned ones would otherwise accumulate. Called by the
    /// janitor alongside the file sweep. Returns the number removed.
    pub async fn prune_stale(&self, max_age: std::time::Duration) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(max_age).unwrap_or_else(|_| chrono::Duration::zero());

        let stale: Vec<TaskId> = {
            let progress = self.progress.read().await;
            progress
                .iter()
                .filter(|(_, p)| p.status.is_terminal() && p.updated_at < cutoff)
                .map(|(id, _)| id.clone())
                .collect()
        };

        for task_id in &stale {
            tracing::debug!(task_id = %task_id, "Pruning stale terminal task");
            self.remove(task_id).await;
        }
        stale.len()
    }

    /// Number of tasks currently tracked
    pub async fn len(&self) -> usize {
        self.progress.read().await.len()
    }

    /// Whether the registry is empty
    pub async fn is_empty(&self) -> bool {
        self.progress.read().await.is_empty()
    }
}
