//! Source video identity and admission metadata.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Storage-unique identifier for an admitted source video.
///
/// Derived from the original filename with every non-alphanumeric character
/// replaced by `_`, which keeps the id safe for both URLs and disk paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub String);

impl SourceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Build a [`SourceId`] from an original filename (extension excluded).
///
/// Non-alphanumerics become `_` so `My Talk (final).mp4` and
/// `My_Talk__final_.mp4` collide intentionally: the store is keyed by the
/// sanitized name.
pub fn sanitize_source_id(filename: &str) -> SourceId {
    let stem = filename.rsplit_once('.').map(|(s, _)| s).unwrap_or(filename);
    let sanitized: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    SourceId(sanitized)
}

/// An admitted source video. Immutable after admission; deleted only by an
/// explicit cleanup call, never by job completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceVideo {
    /// Storage-unique id
    pub id: SourceId,

    /// Path of the container file under the upload directory
    pub path: PathBuf,

    /// Duration in seconds
    pub duration: f64,

    /// Frame rate
    pub fps: f64,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Container codec family (e.g. "h264")
    pub codec: String,

    /// Title reported by the fetcher, when fetched from a URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Channel/uploader reported by the fetcher
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}
