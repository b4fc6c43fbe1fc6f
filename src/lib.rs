//! # yt2mp3
//!
//! Backend service for converting YouTube videos to MP3.
//!
//! The crate is built around three cooperating pieces:
//! - **Task registry** - in-memory, latest-state-only progress tracking
//! - **Conversion worker** - probe, fetch, verify, normalize, one task at a
//!   time per request, no retries
//! - **Janitor** - delayed post-serve deletes plus a periodic sweep of the
//!   shared output directory
//!
//! The REST API in [`api`] is a thin layer over [`AudioConverter`]; files are
//! served exactly once and removed from disk shortly after.
//!
//! ## Quick Start
//!
//! ```no_run
//! use yt2mp3::{AudioConverter, Config, YtDlpEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env();
//!     let engine = Arc::new(YtDlpEngine::from_config(&config.engine)?);
//!     let converter = Arc::new(AudioConverter::new(config, engine)?);
//!
//!     converter.spawn_janitor();
//!     let config = converter.config.clone();
//!     yt2mp3::api::start_api_server(converter, config).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Conversion worker and service facade
pub mod converter;
/// Media engine trait and yt-dlp implementation
pub mod engine;
/// Error types
pub mod error;
/// File-lifetime management
pub mod janitor;
/// In-memory task registry
pub mod registry;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, ConversionConfig, EngineConfig, ServerConfig};
pub use converter::AudioConverter;
pub use engine::{FetchRequest, MediaEngine, YtDlpEngine};
pub use error::{ApiError, Error, Result, ToHttpStatus};
pub use types::{
    Event, FinishedFile, ProgressUpdate, Status, TaskId, TaskMetadata, TaskProgress, TaskSnapshot,
};

/// Block until a termination signal, then raise the converter's shutdown
/// flag so the janitor and any in-flight watchers exit.
///
/// On unix this waits for SIGTERM or SIGINT (degrading to whichever handler
/// could be installed); elsewhere it waits for Ctrl+C.
pub async fn run_with_shutdown(converter: std::sync::Arc<AudioConverter>) {
    wait_for_signal().await;
    converter.shutdown();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    // Registration can fail in minimal containers; wait on whichever
    // handlers we managed to install
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut term), Ok(mut int)) => {
            tokio::select! {
                _ = term.recv() => tracing::info!("SIGTERM received, stopping"),
                _ = int.recv() => tracing::info!("SIGINT received, stopping"),
            }
        }
        (Ok(mut term), Err(e)) => {
            tracing::warn!(error = %e, "No SIGINT handler, waiting on SIGTERM only");
            term.recv().await;
            tracing::info!("SIGTERM received, stopping");
        }
        (Err(e), Ok(mut int)) => {
            tracing::warn!(error = %e, "No SIGTERM handler, waiting on SIGINT only");
            int.recv().await;
            tracing::info!("SIGINT received, stopping");
        }
        (Err(_), Err(_)) => {
            tracing::warn!("Unix signal handlers unavailable, falling back to ctrl_c");
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Ctrl+C received, stopping");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Ctrl+C listener failed");
        return;
    }
    tracing::info!("Ctrl+C received, stopping");
}
