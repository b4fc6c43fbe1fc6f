//! Utility functions for input validation and filename handling

use regex::Regex;
use std::sync::OnceLock;

/// Maximum number of title characters carried into an attachment filename
const MAX_FILENAME_TITLE_CHARS: usize = 50;

/// Accepted source URL pattern: youtube.com / youtu.be / youtube-nocookie.com
/// with an 11-character video token
fn source_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Safe: literal pattern always compiles
        #[allow(clippy::unwrap_used)]
        Regex::new(
            r"^(https?://)?(www\.)?(youtube|youtu|youtube-nocookie)\.(com|be)/(watch\?v=|embed/|v/|shorts/|.+\?v=)?([^&=%\?]{11})",
        )
        .unwrap()
    })
}

/// Check whether a URL is a well-formed, accepted source URL
///
/// Accepts the usual watch/shorts/embed/youtu.be forms carrying an
/// 11-character video token. Everything else (including otherwise valid
/// URLs on other hosts) is rejected to prevent abuse.
///
/// # Examples
///
/// ```
/// use yt2mp3::utils::is_valid_source_url;
///
/// assert!(is_valid_source_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
/// assert!(is_valid_source_url("https://youtu.be/dQw4w9WgXcQ"));
/// assert!(!is_valid_source_url("https://example.com"));
/// ```
#[must_use]
pub fn is_valid_source_url(url: &str) -> bool {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return false;
    }
    // Reject URLs the url crate cannot parse once a scheme is present;
    // scheme-less forms are matched by the pattern alone.
    if trimmed.contains("://") && url::Url::parse(trimmed).is_err() {
        return false;
    }
    source_url_regex().is_match(trimmed)
}

/// Derive a content-safe attachment filename from a media title
///
/// The title is truncated to a bounded length on a character boundary, path
/// separator characters are replaced, and the `.mp3` extension is appended.
/// An empty title falls back to "audio.mp3".
///
/// # Examples
///
/// ```
/// use yt2mp3::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("My Song"), "My Song.mp3");
/// assert_eq!(sanitize_filename("a/b\\c"), "a-b-c.mp3");
/// ```
#[must_use]
pub fn sanitize_filename(title: &str) -> String {
    let truncated: String = title.chars().take(MAX_FILENAME_TITLE_CHARS).collect();
    let cleaned: String = truncated
        .chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            // Strip control characters that would corrupt the header
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "audio.mp3".to_string()
    } else {
        format!("{}.mp3", cleaned)
    }
}

/// Validate a bitrate against the accepted closed range (inclusive bounds)
pub fn is_valid_bitrate(bitrate: u32, min: u32, max: u32) -> bool {
    (min..=max).contains(&bitrate)
}
