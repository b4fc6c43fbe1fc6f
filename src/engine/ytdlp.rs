//! yt-dlp engine implementation
//!
//! Shells out to the external `yt-dlp` binary for metadata probes and
//! download+transcode runs, and to `ffmpeg` for the bitrate normalization
//! pass. Binaries are auto-discovered on PATH unless explicit paths are
//! configured.

use super::{FetchRequest, MediaEngine};
use crate::config::EngineConfig;
use crate::engine::progress::{classify_engine_failure, PROGRESS_TEMPLATE};
use crate::error::Error;
use crate::types::{ProgressUpdate, TaskMetadata};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;

/// Maximum number of description characters carried into probe metadata
const MAX_DESCRIPTION_CHARS: usize = 500;

/// Engine implementation backed by the yt-dlp and ffmpeg binaries
pub struct YtDlpEngine {
    ytdlp_path: PathBuf,
    ffmpeg_path: Option<PathBuf>,
    user_agent: String,
    accept_language: String,
}

impl YtDlpEngine {
    /// Build an engine from configuration
    ///
    /// yt-dlp is required: an explicit `ytdlp_path` wins, otherwise PATH is
    /// searched (when `search_path` allows). ffmpeg is optional; without it
    /// the normalization pass reports unavailable and callers keep the
    /// engine's native output.
    pub fn from_config(config: &EngineConfig) -> crate::Result<Self> {
        let ytdlp_path = match &config.ytdlp_path {
            Some(path) => path.clone(),
            None if config.search_path => which::which("yt-dlp").map_err(|_| {
                Error::EngineUnavailable("yt-dlp not found in PATH".to_string())
            })?,
            None => {
                return Err(Error::EngineUnavailable(
                    "no yt-dlp path configured and PATH search disabled".to_string(),
                ))
            }
        };

        let ffmpeg_path = match &config.ffmpeg_path {
            Some(path) => Some(path.clone()),
            None if config.search_path => which::which("ffmpeg").ok(),
            None => None,
        };

        if ffmpeg_path.is_none() {
            tracing::warn!("ffmpeg not found; bitrate normalization will be skipped");
        }

        Ok(Self {
            ytdlp_path,
            ffmpeg_path,
            user_agent: config.user_agent.clone(),
            accept_language: config.accept_language.clone(),
        })
    }

    fn header_args(&self) -> Vec<String> {
        vec![
            "--add-header".to_string(),
            format!("User-Agent:{}", self.user_agent),
            "--add-header".to_string(),
            format!("Accept-Language:{}", self.accept_language),
        ]
    }
}

/// Subset of the engine's `--dump-json` output we care about
#[derive(Debug, Deserialize)]
struct RawProbe {
    #[serde(default)]
    id: String,
    #[serde(default = "unknown_title")]
    title: String,
    #[serde(default = "unknown_field")]
    uploader: String,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    duration_string: Option<String>,
    #[serde(default)]
    view_count: Option<u64>,
    #[serde(default)]
    upload_date: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    webpage_url: Option<String>,
    #[serde(default)]
    formats: Vec<serde_json::Value>,
    #[serde(default)]
    is_live: Option<bool>,
}

fn unknown_title() -> String {
    "Unknown Title".to_string()
}

fn unknown_field() -> String {
    "Unknown".to_string()
}

impl RawProbe {
    fn into_metadata(self, requested_url: &str) -> TaskMetadata {
        let description: String = self
            .description
            .unwrap_or_default()
            .chars()
            .take(MAX_DESCRIPTION_CHARS)
            .collect();

        TaskMetadata {
            id: if self.id.is_empty() {
                "unknown".to_string()
            } else {
                self.id
            },
            title: self.title,
            uploader: self.uploader,
            duration: self.duration.unwrap_or(0.0).max(0.0) as u64,
            duration_string: self.duration_string.unwrap_or_else(|| "Unknown".to_string()),
            view_count: self.view_count.unwrap_or(0),
            upload_date: self.upload_date.unwrap_or_else(|| "Unknown".to_string()),
            description,
            thumbnail: self.thumbnail.unwrap_or_default(),
            webpage_url: self
                .webpage_url
                .unwrap_or_else(|| requested_url.to_string()),
            formats_available: self.formats.len(),
            is_live: self.is_live.unwrap_or(false),
            duration_warning: None,
        }
    }
}

#[async_trait]
impl MediaEngine for YtDlpEngine {
    async fn probe(&self, url: &str) -> crate::Result<TaskMetadata> {
        let mut command = Command::new(&self.ytdlp_path);
        command
            .arg("--dump-json")
            .arg("--skip-download")
            .arg("--no-warnings")
            .arg("--no-playlist")
            .args(self.header_args())
            .arg("--")
            .arg(url);

        tracing::debug!(%url, "Probing source metadata");
        let output = command
            .output()
            .await
            .map_err(|e| Error::ConversionFailed(format!("failed to execute yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(%url, stderr = %stderr, "Probe failed");
            return Err(classify_engine_failure(&stderr));
        }

        let raw: RawProbe = serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::ConversionFailed(format!("unparseable probe output: {}", e)))?;
        Ok(raw.into_metadata(url))
    }

    async fn fetch(
        &self,
        request: FetchRequest,
        progress: UnboundedSender<ProgressUpdate>,
    ) -> crate::Result<()> {
        // The engine chooses the intermediate extension; extraction renames
        // to .mp3, which is what output_path expects.
        let output_template = request.output_path.with_extension("%(ext)s");

        let mut command = Command::new(&self.ytdlp_path);
        command
            .arg("--newline")
            .arg("-f")
            .arg("bestaudio/best")
            .arg("-x")
            .arg("--audio-format")
            .arg("mp3")
            .arg("--audio-quality")
            .arg(format!("{}K", request.bitrate))
            .arg("--no-warnings")
            .arg("--no-playlist")
            .arg("--prefer-ffmpeg")
            .arg("--retries")
            .arg("3")
            .arg("--fragment-retries")
            .arg("3")
            .arg("--progress-template")
            .arg(PROGRESS_TEMPLATE)
            .args(self.header_args())
            .arg("-o")
            .arg(&output_template)
            .arg("--")
            .arg(&request.url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::info!(
            task_id = %request.task_id,
            url = %request.url,
            bitrate = request.bitrate,
            "Starting fetch"
        );

        let mut child = command
            .spawn()
            .map_err(|e| Error::ConversionFailed(format!("failed to spawn yt-dlp: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::ConversionFailed("yt-dlp stdout not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::ConversionFailed("yt-dlp stderr not captured".to_string()))?;

        // Drain stderr concurrently so the child never blocks on a full pipe
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(update) = super::parse_progress_line(&line) {
                // Receiver may be gone if the task was abandoned; keep going
                let _ = progress.send(update);
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| Error::ConversionFailed(format!("yt-dlp wait failed: {}", e)))?;
        let stderr_text = stderr_task.await.unwrap_or_default();

        if !status.success() {
            tracing::error!(
                task_id = %request.task_id,
                stderr = %stderr_text,
                "Fetch failed"
            );
            return Err(classify_engine_failure(&stderr_text));
        }

        Ok(())
    }

    async fn normalize(&self, path: &Path, bitrate: u32) -> crate::Result<()> {
        let ffmpeg = self.ffmpeg_path.as_ref().ok_or_else(|| {
            Error::EngineUnavailable("ffmpeg not available for normalization".to_string())
        })?;

        let temp_path = path.with_extension("normalized.mp3");
        let output = Command::new(ffmpeg)
            .arg("-y")
            .arg("-i")
            .arg(path)
            .arg("-codec:a")
            .arg("libmp3lame")
            .arg("-b:a")
            .arg(format!("{}k", bitrate))
            .arg(&temp_path)
            .output()
            .await
            .map_err(|e| Error::ConversionFailed(format!("failed to execute ffmpeg: {}", e)))?;

        if !output.status.success() {
            // Leave no partial temp file behind
            let _ = tokio::fs::remove_file(&temp_path).await;
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::ConversionFailed(format!(
                "ffmpeg re-encode failed: {}",
                stderr
            )));
        }

        tokio::fs::rename(&temp_path, path).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}
