//! Filesystem janitor: output-directory sweeps and post-serve delayed deletes
//!
//! Two mechanisms keep the shared output directory bounded:
//!
//! - A periodic sweep deletes any file older than the staleness threshold,
//!   catching output abandoned by clients that never fetched it.
//! - After a file has been streamed, its deletion is scheduled a short delay
//!   later (tolerating slow client reads) as a detached task that the
//!   response path never awaits.
//!
//! Both paths may race on the same file; deletion is idempotent and treats
//! "already gone" as success. Janitor errors are logged and swallowed; they
//! never fail a request.

use crate::registry::TaskRegistry;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Delete every file in `dir` older than `max_age`
///
/// Per-file errors are logged and do not abort the sweep. Subdirectories are
/// left alone. Returns the number of files deleted.
pub async fn sweep(dir: &Path, max_age: Duration) -> usize {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Sweep could not read output directory");
            return 0;
        }
    };

    let now = SystemTime::now();
    let mut deleted = 0;

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Sweep failed to read directory entry");
                break;
            }
        };

        let path = entry.path();
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Sweep could not stat file");
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        // Creation time where the platform supports it, modification time
        // otherwise
        let file_time = metadata.created().or_else(|_| metadata.modified());
        let age = match file_time {
            Ok(time) => now.duration_since(time).unwrap_or(Duration::ZERO),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Sweep could not read file timestamps");
                continue;
            }
        };

        if age > max_age {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    info!(path = %path.display(), age_secs = age.as_secs(), "Swept stale file");
                    deleted += 1;
                }
                // Lost the race with a delayed delete; that is fine
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Sweep failed to delete file");
                }
            }
        }
    }

    deleted
}

/// Schedule a file for deletion after a fixed delay
///
/// Runs as a detached task that outlives the request that scheduled it; the
/// response path must not await the returned handle (it is returned for
/// tests). The file already being gone is success.
pub fn schedule_delayed_delete(path: PathBuf, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        sleep(delay).await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(path = %path.display(), "Deleted served file");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Served file already deleted");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to delete served file");
            }
        }
    })
}

/// Periodic sweep task for the shared output directory
///
/// Runs one sweep immediately at startup and then on a fixed interval until
/// the shutdown flag is raised.
pub struct JanitorTask {
    output_dir: PathBuf,
    stale_after: Duration,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
    registry: Option<Arc<TaskRegistry>>,
}

impl JanitorTask {
    /// Create a new janitor task
    pub fn new(
        output_dir: PathBuf,
        stale_after: Duration,
        interval: Duration,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            output_dir,
            stale_after,
            interval,
            shutdown,
            registry: None,
        }
    }

    /// Also prune stale terminal registry entries on each sweep
    pub fn with_registry(mut self, registry: Arc<TaskRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Run the sweep loop until shutdown
    pub async fn run(self) {
        info!(
            dir = %self.output_dir.display(),
            stale_after_secs = self.stale_after.as_secs(),
            "Janitor task started"
        );

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("Janitor task shutting down");
                break;
            }

            let deleted = sweep(&self.output_dir, self.stale_after).await;
            if deleted > 0 {
                info!(deleted, "Sweep removed stale files");
            }

            if let Some(registry) = &self.registry {
                let pruned = registry.prune_stale(self.stale_after).await;
                if pruned > 0 {
                    info!(pruned, "Sweep pruned stale registry entries");
                }
            }

            sleep(self.interval).await;
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn sweep_deletes_files_past_the_threshold() {
        let dir = tempdir().unwrap();
        let stale = dir.path().join("stale.mp3");
        std::fs::write(&stale, b"data").unwrap();

        // Zero threshold: any existing file is older than the cutoff
        tokio::time::sleep(Duration::from_millis(20)).await;
        let deleted = sweep(dir.path(), Duration::ZERO).await;

        assert_eq!(deleted, 1);
        assert!(!stale.exists());
    }

    #[tokio::test]
    async fn sweep_keeps_files_younger_than_the_threshold() {
        let dir = tempdir().unwrap();
        let fresh = dir.path().join("fresh.mp3");
        std::fs::write(&fresh, b"data").unwrap();

        let deleted = sweep(dir.path(), Duration::from_secs(3600)).await;

        assert_eq!(deleted, 0);
        assert!(fresh.exists());
    }

    #[tokio::test]
    async fn sweep_ignores_subdirectories() {
        let dir = tempdir().unwrap();
        let subdir = dir.path().join("nested");
        std::fs::create_dir(&subdir).unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let deleted = sweep(dir.path(), Duration::ZERO).await;

        assert_eq!(deleted, 0);
        assert!(subdir.exists());
    }

    #[tokio::test]
    async fn sweep_of_missing_directory_is_harmless() {
        let deleted = sweep(Path::new("/definitely/not/here"), Duration::ZERO).await;
        assert_eq!(deleted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_delete_fires_after_the_delay() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("served.mp3");
        std::fs::write(&path, b"data").unwrap();

        let handle = schedule_delayed_delete(path.clone(), Duration::from_secs(5));
        // Paused clock: awaiting the handle auto-advances the timer instead
        // of sleeping for real
        handle.await.unwrap();

        assert!(!path.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_delete_tolerates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gone.mp3");

        let handle = schedule_delayed_delete(path, Duration::from_secs(5));
        // Must complete without panicking even though the file never existed
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn racing_deletes_are_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("raced.mp3");
        std::fs::write(&path, b"data").unwrap();

        let first = schedule_delayed_delete(path.clone(), Duration::from_secs(5));
        let second = schedule_delayed_delete(path.clone(), Duration::from_secs(5));
        first.await.unwrap();
        second.await.unwrap();

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn janitor_task_exits_on_shutdown() {
        let dir = tempdir().unwrap();
        let shutdown = Arc::new(AtomicBool::new(true));

        let task = JanitorTask::new(
            dir.path().to_path_buf(),
            Duration::from_secs(3600),
            Duration::from_secs(600),
            shutdown,
        );
        // Flag already raised: run() must return promptly
        task.run().await;
    }
}
