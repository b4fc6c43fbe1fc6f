//! Parsing of engine stdout progress lines and stderr failure text
//!
//! The engine is invoked with `--newline` and a progress template that emits
//! one machine-readable line per progress tick:
//!
//! ```text
//! progress: 12.3%|1.21MiB/s|00:45
//! ```
//!
//! Post-processing markers (`[ExtractAudio]`, `[ffmpeg]`) indicate the
//! download finished and transcoding started.

use crate::error::Error;
use crate::types::{ProgressUpdate, Status};

/// Prefix of template-generated progress lines
pub const PROGRESS_LINE_PREFIX: &str = "progress:";

/// The progress template handed to the engine
pub const PROGRESS_TEMPLATE: &str =
    "progress:%(progress._percent_str)s|%(progress._speed_str)s|%(progress._eta_str)s";

/// Parse a single engine stdout line into a progress update
///
/// Returns `None` for lines that carry no progress information. Template
/// lines map to `downloading` updates; post-processing markers map to a
/// `processing` update at 100%.
pub fn parse_progress_line(line: &str) -> Option<ProgressUpdate> {
    let trimmed = line.trim();

    if let Some(rest) = trimmed.strip_prefix(PROGRESS_LINE_PREFIX) {
        let mut parts = rest.splitn(3, '|');
        let percent = parts
            .next()
            .and_then(|p| p.trim().strip_suffix('%').map(str::trim))
            .and_then(|p| p.parse::<f32>().ok());
        let speed = parts.next().map(normalize_field);
        let eta = parts.next().map(normalize_field);

        return Some(ProgressUpdate {
            status: Some(Status::Downloading),
            percent,
            speed,
            eta,
            error: None,
        });
    }

    // Download finished, audio extraction running
    if trimmed.starts_with("[ExtractAudio]") || trimmed.starts_with("[ffmpeg]") {
        return Some(ProgressUpdate {
            status: Some(Status::Processing),
            percent: Some(100.0),
            speed: Some("N/A".to_string()),
            eta: Some("Processing...".to_string()),
            error: None,
        });
    }

    None
}

/// Best-effort field cleanup: empty or placeholder values become "N/A"
fn normalize_field(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "Unknown" || trimmed == "NA" {
        "N/A".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Markers the engine prints when the source itself is the problem
const SOURCE_UNAVAILABLE_MARKERS: &[&str] = &[
    "private video",
    "video unavailable",
    "this video is not available",
    "has been removed",
    "account associated with this video has been terminated",
    "not available in your country",
    "sign in to confirm",
    "members-only",
    "unsupported url",
];

/// Classify an engine failure from its stderr text
///
/// Source-side problems (private, removed, geo-blocked) become
/// `SourceUnavailable` so the client gets a 400 with a sanitized message;
/// everything else is a generic `ConversionFailed`. The raw stderr is kept
/// in the variant for server-side logging only and never reaches the client.
pub fn classify_engine_failure(stderr: &str) -> Error {
    let lowered = stderr.to_lowercase();
    if SOURCE_UNAVAILABLE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        Error::SourceUnavailable(stderr.to_string())
    } else {
        Error::ConversionFailed(stderr.to_string())
    }
}
