//! Configuration types for yt2mp3
//!
//! All knobs are plain data with serde defaults, so the service works out of
//! the box with zero configuration. `Config::from_env` applies
//! environment-variable overrides for deployment (see the `YT2MP3_*`
//! variables documented on each field).

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use utoipa::ToSchema;

/// HTTP server configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ServerConfig {
    /// Bind address (default: 0.0.0.0:5000, env: `YT2MP3_BIND_ADDRESS`)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Maximum request body size in bytes (default: 1 MiB, env:
    /// `YT2MP3_MAX_BODY_BYTES`). Oversized bodies are rejected with 413.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Permissive CORS profile for development: any origin, any method,
    /// any header (default: true, env: `YT2MP3_CORS_PERMISSIVE`)
    #[serde(default = "default_true")]
    pub cors_permissive: bool,

    /// Origin allow-list used when `cors_permissive` is false
    /// (env: `YT2MP3_CORS_ORIGINS`, comma-separated)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            max_body_bytes: default_max_body_bytes(),
            cors_permissive: true,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Conversion policy and file-lifetime configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ConversionConfig {
    /// Directory for output files, shared by all in-flight tasks; files are
    /// namespaced by task id (default: "./downloads", env: `YT2MP3_OUTPUT_DIR`)
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Maximum source duration in seconds; longer sources are rejected at
    /// conversion time (default: 1800, env: `YT2MP3_DURATION_CAP_SECS`)
    #[serde(default = "default_duration_cap")]
    pub duration_cap_secs: u64,

    /// Lowest accepted bitrate in kbps, inclusive (default: 64)
    #[serde(default = "default_min_bitrate")]
    pub min_bitrate: u32,

    /// Highest accepted bitrate in kbps, inclusive (default: 320)
    #[serde(default = "default_max_bitrate")]
    pub max_bitrate: u32,

    /// Age in seconds past which an orphaned output file is deleted by the
    /// janitor sweep (default: 3600, env: `YT2MP3_STALE_AFTER_SECS`)
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: u64,

    /// Delay in seconds between serving a file and deleting it, to tolerate
    /// slow client reads (default: 5, env: `YT2MP3_DELETE_DELAY_SECS`)
    #[serde(default = "default_delete_delay")]
    pub delete_delay_secs: u64,

    /// Interval in seconds between janitor sweeps
    /// (default: 600, env: `YT2MP3_SWEEP_INTERVAL_SECS`)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            duration_cap_secs: default_duration_cap(),
            min_bitrate: default_min_bitrate(),
            max_bitrate: default_max_bitrate(),
            stale_after_secs: default_stale_after(),
            delete_delay_secs: default_delete_delay(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl ConversionConfig {
    /// Staleness threshold as a `Duration`
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    /// Post-serve delete delay as a `Duration`
    pub fn delete_delay(&self) -> Duration {
        Duration::from_secs(self.delete_delay_secs)
    }

    /// Sweep interval as a `Duration`
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// External engine (yt-dlp/ffmpeg) configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EngineConfig {
    /// Path to the yt-dlp executable (auto-detected on PATH if None,
    /// env: `YT2MP3_YTDLP_PATH`)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Path to the ffmpeg executable used for the normalization pass
    /// (auto-detected on PATH if None, env: `YT2MP3_FFMPEG_PATH`)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for engine binaries when explicit paths are
    /// not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Re-encode the engine's output to the exact requested bitrate.
    /// Normalization failures are soft: the engine's original output is
    /// served instead (default: true)
    #[serde(default = "default_true")]
    pub normalize: bool,

    /// User-Agent header the engine sends to the source
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Accept-Language header the engine sends to the source
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_path: None,
            search_path: true,
            normalize: true,
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
        }
    }
}

/// Main configuration for the conversion service
///
/// Fields are organized into logical sub-configs:
/// - [`server`](ServerConfig) — bind address, body limits, CORS profile
/// - [`conversion`](ConversionConfig) — output dir, policy caps, file lifetimes
/// - [`engine`](EngineConfig) — external binary paths and fetch headers
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Conversion policy and file-lifetime settings
    #[serde(default)]
    pub conversion: ConversionConfig,

    /// External engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Config {
    /// Build a configuration from defaults with environment overrides
    ///
    /// Unparseable values are logged and ignored rather than failing startup.
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Some(addr) = env_parse::<SocketAddr>("YT2MP3_BIND_ADDRESS") {
            config.server.bind_address = addr;
        }
        if let Some(bytes) = env_parse::<usize>("YT2MP3_MAX_BODY_BYTES") {
            config.server.max_body_bytes = bytes;
        }
        if let Some(permissive) = env_parse::<bool>("YT2MP3_CORS_PERMISSIVE") {
            config.server.cors_permissive = permissive;
        }
        if let Ok(origins) = std::env::var("YT2MP3_CORS_ORIGINS") {
            config.server.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Ok(dir) = std::env::var("YT2MP3_OUTPUT_DIR") {
            config.conversion.output_dir = PathBuf::from(dir);
        }
        if let Some(secs) = env_parse::<u64>("YT2MP3_DURATION_CAP_SECS") {
            config.conversion.duration_cap_secs = secs;
        }
        if let Some(secs) = env_parse::<u64>("YT2MP3_STALE_AFTER_SECS") {
            config.conversion.stale_after_secs = secs;
        }
        if let Some(secs) = env_parse::<u64>("YT2MP3_DELETE_DELAY_SECS") {
            config.conversion.delete_delay_secs = secs;
        }
        if let Some(secs) = env_parse::<u64>("YT2MP3_SWEEP_INTERVAL_SECS") {
            config.conversion.sweep_interval_secs = secs;
        }
        if let Ok(path) = std::env::var("YT2MP3_YTDLP_PATH") {
            config.engine.ytdlp_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("YT2MP3_FFMPEG_PATH") {
            config.engine.ffmpeg_path = Some(PathBuf::from(path));
        }

        config
    }
}

/// Read and parse an environment variable, logging on parse failure
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

fn default_bind_address() -> SocketAddr {
    // Safe: literal always parses
    #[allow(clippy::unwrap_used)]
    "0.0.0.0:5000".parse().unwrap()
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_duration_cap() -> u64 {
    1800
}

fn default_min_bitrate() -> u32 {
    64
}

fn default_max_bitrate() -> u32 {
    320
}

fn default_stale_after() -> u64 {
    3600
}

fn default_delete_delay() -> u64 {
    5
}

fn default_sweep_interval() -> u64 {
    600
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/122.0 Safari/537.36"
        .to_string()
}

fn default_accept_language() -> String {
    "en-US,en;q=0.5".to_string()
}

fn default_true() -> bool {
    true
}
