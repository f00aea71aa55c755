//! Source retrieval from public video URLs via yt-dlp.
//!
//! Metadata is probed first (`yt-dlp -J`) so duration and size limits are
//! enforced before any bytes are transferred. Network failures are
//! classified into transient (retried with exponential backoff) and
//! permanent (surfaced immediately).

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{MediaError, MediaResult};

/// Limits enforced on fetched sources.
#[derive(Debug, Clone)]
pub struct FetchLimits {
    /// Maximum source duration, seconds
    pub max_duration: f64,
    /// Maximum source size, bytes
    pub max_size: u64,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            max_duration: 3600.0,
            max_size: 2 * 1024 * 1024 * 1024,
        }
    }
}

impl FetchLimits {
    pub fn from_env() -> Self {
        Self {
            max_duration: std::env::var("MAX_SOURCE_DURATION")
                .ok()
                .and_then(|s| s.trim_end_matches('s').parse().ok())
                .unwrap_or(3600.0),
            max_size: std::env::var("MAX_SOURCE_SIZE")
                .ok()
                .and_then(|s| parse_size(&s))
                .unwrap_or(2 * 1024 * 1024 * 1024),
        }
    }
}

/// Parse a size string like "2GiB", "500MiB" or plain bytes.
fn parse_size(s: &str) -> Option<u64> {
    let s = s.trim();
    let lowered = s.to_lowercase();
    let (number, multiplier) = if let Some(n) = lowered.strip_suffix("gib") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = lowered.strip_suffix("mib") {
        (n, 1024 * 1024)
    } else if let Some(n) = lowered.strip_suffix("kib") {
        (n, 1024)
    } else {
        (lowered.as_str(), 1)
    };
    number.trim().parse::<u64>().ok().map(|n| n * multiplier)
}

/// Remote metadata reported by `yt-dlp -J`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub filesize_approx: Option<u64>,
    #[serde(default)]
    pub ext: Option<String>,
}

impl RemoteInfo {
    pub fn size_estimate(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx)
    }
}

/// Maximum quality label for a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    #[default]
    Best,
    P1080,
    P720,
    P480,
}

impl Quality {
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "1080" | "1080p" => Quality::P1080,
            "720" | "720p" => Quality::P720,
            "480" | "480p" => Quality::P480,
            _ => Quality::Best,
        }
    }

    /// yt-dlp format selector for this label.
    fn format_selector(&self) -> &'static str {
        match self {
            Quality::Best => "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best",
            Quality::P1080 => "bestvideo[height<=1080][ext=mp4]+bestaudio[ext=m4a]/best[height<=1080]",
            Quality::P720 => "bestvideo[height<=720][ext=mp4]+bestaudio[ext=m4a]/best[height<=720]",
            Quality::P480 => "bestvideo[height<=480][ext=mp4]+bestaudio[ext=m4a]/best[height<=480]",
        }
    }
}

/// Classify yt-dlp stderr into transient vs permanent failures.
fn classify_failure(stderr: &str) -> MediaError {
    let lowered = stderr.to_lowercase();
    let permanent = [
        "unsupported url",
        "private video",
        "video unavailable",
        "members-only",
        "http error 403",
        "http error 404",
        "sign in to confirm",
    ];
    if permanent.iter().any(|p| lowered.contains(p)) {
        MediaError::download_permanent(first_error_line(stderr))
    } else {
        MediaError::download_transient(first_error_line(stderr))
    }
}

fn first_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .find(|l| l.contains("ERROR"))
        .unwrap_or("yt-dlp failed")
        .trim()
        .to_string()
}

fn cookies_args() -> Vec<String> {
    match std::env::var("FETCHER_COOKIES_FILE") {
        Ok(path) if Path::new(&path).exists() => vec!["--cookies".to_string(), path],
        _ => Vec::new(),
    }
}

/// Probe remote metadata without downloading.
pub async fn probe_remote(url: &str) -> MediaResult<RemoteInfo> {
    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)?;

    let mut cmd = Command::new("yt-dlp");
    cmd.args(["-J", "--no-playlist", "--no-warnings"]);
    for arg in cookies_args() {
        cmd.arg(arg);
    }
    cmd.arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = tokio::time::timeout(Duration::from_secs(60), cmd.output())
        .await
        .map_err(|_| MediaError::download_transient("metadata probe timed out"))??;

    if !output.status.success() {
        return Err(classify_failure(&String::from_utf8_lossy(&output.stderr)));
    }

    let info: RemoteInfo = serde_json::from_slice(&output.stdout)?;
    Ok(info)
}

/// Enforce the configured limits against probed metadata.
pub fn check_limits(info: &RemoteInfo, limits: &FetchLimits) -> MediaResult<()> {
    if let Some(duration) = info.duration {
        if duration > limits.max_duration {
            return Err(MediaError::SourceTooLarge(format!(
                "duration {:.0}s exceeds maximum {:.0}s",
                duration, limits.max_duration
            )));
        }
    }
    if let Some(size) = info.size_estimate() {
        if size > limits.max_size {
            return Err(MediaError::SourceTooLarge(format!(
                "size {} bytes exceeds maximum {} bytes",
                size, limits.max_size
            )));
        }
    }
    Ok(())
}

/// Download a source into `output_path`, retrying transient failures up to
/// three times with exponential backoff starting at 2 s.
pub async fn download_source(
    url: &str,
    quality: Quality,
    output_path: &Path,
    limits: &FetchLimits,
) -> MediaResult<PathBuf> {
    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)?;

    let mut backoff = Duration::from_secs(2);
    let mut last_err = None;

    for attempt in 1..=3 {
        match download_once(url, quality, output_path, limits).await {
            Ok(path) => return Ok(path),
            Err(err) if err.is_transient() && attempt < 3 => {
                warn!(attempt, error = %err, "Transient download failure, backing off");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                last_err = Some(err);
            }
            Err(err) => return Err(err),
        }
    }

    Err(last_err.unwrap_or_else(|| MediaError::download_transient("download retries exhausted")))
}

async fn download_once(
    url: &str,
    quality: Quality,
    output_path: &Path,
    limits: &FetchLimits,
) -> MediaResult<PathBuf> {
    info!(url, output = %output_path.display(), "Downloading source");

    let max_filesize = format!("{}", limits.max_size);
    let output_str = output_path.to_string_lossy().to_string();

    let mut cmd = Command::new("yt-dlp");
    cmd.args([
        "--no-playlist",
        "--no-warnings",
        "--max-filesize",
        &max_filesize,
        "-f",
        quality.format_selector(),
        "-o",
        &output_str,
    ]);
    for arg in cookies_args() {
        cmd.arg(arg);
    }
    cmd.arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = cmd.output().await?;

    if !output.status.success() {
        return Err(classify_failure(&String::from_utf8_lossy(&output.stderr)));
    }

    if !output_path.exists() {
        return Err(MediaError::download_permanent(
            "yt-dlp reported success but produced no file",
        ));
    }

    Ok(output_path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("2GiB"), Some(2 * 1024 * 1024 * 1024));
        assert_eq!(parse_size("500MiB"), Some(500 * 1024 * 1024));
        assert_eq!(parse_size("1048576"), Some(1048576));
        assert_eq!(parse_size("abc"), None);
    }

    #[test]
    fn test_quality_parse() {
        assert_eq!(Quality::parse("1080p"), Quality::P1080);
        assert_eq!(Quality::parse("720"), Quality::P720);
        assert_eq!(Quality::parse("anything"), Quality::Best);
    }

    #[test]
    fn test_classify_failure() {
        let err = classify_failure("ERROR: Private video");
        assert!(matches!(err, MediaError::DownloadFailed { transient: false, .. }));

        let err = classify_failure("ERROR: Connection reset by peer");
        assert!(matches!(err, MediaError::DownloadFailed { transient: true, .. }));
    }

    #[test]
    fn test_check_limits() {
        let limits = FetchLimits { max_duration: 3600.0, max_size: 1000 };
        let over_duration = RemoteInfo {
            title: None,
            channel: None,
            duration: Some(18000.0),
            filesize: None,
            filesize_approx: None,
            ext: None,
        };
        assert!(matches!(
            check_limits(&over_duration, &limits),
            Err(MediaError::SourceTooLarge(_))
        ));

        let over_size = RemoteInfo {
            duration: Some(60.0),
            filesize: Some(2000),
            ..over_duration
        };
        assert!(matches!(
            check_limits(&over_size, &limits),
            Err(MediaError::SourceTooLarge(_))
        ));

        let fine = RemoteInfo {
            duration: Some(60.0),
            filesize: Some(500),
            ..over_size
        };
        assert!(check_limits(&fine, &limits).is_ok());
    }
}
