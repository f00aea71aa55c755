//! Container probing via ffprobe, with a per-path cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use std::time::SystemTime;

use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Probed video information.
#[derive(Debug, Clone)]
pub struct VideoInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate
    pub fps: f64,
    /// Video codec name
    pub codec: String,
    /// File size in bytes
    pub size: u64,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Cache keyed by path, valid until the file's mtime changes.
static PROBE_CACHE: Mutex<Option<HashMap<PathBuf, (SystemTime, VideoInfo)>>> = Mutex::new(None);

/// Probe a video file, returning cached results while the file is unchanged.
///
/// Fails with `InvalidVideo` when no video stream is present or the duration
/// cannot be determined.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let mtime = tokio::fs::metadata(path).await?.modified()?;

    {
        let cache = PROBE_CACHE.lock().unwrap();
        if let Some(map) = cache.as_ref() {
            if let Some((cached_mtime, info)) = map.get(path) {
                if *cached_mtime == mtime {
                    debug!(path = %path.display(), "Probe cache hit");
                    return Ok(info.clone());
                }
            }
        }
    }

    let info = run_ffprobe(path).await?;

    let mut cache = PROBE_CACHE.lock().unwrap();
    cache
        .get_or_insert_with(HashMap::new)
        .insert(path.to_path_buf(), (mtime, info.clone()));

    Ok(info)
}

async fn run_ffprobe(path: &Path) -> MediaResult<VideoInfo> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::InvalidVideo("No video stream found".to_string()))?;

    let duration = probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| *d > 0.0)
        .ok_or_else(|| MediaError::InvalidVideo("Duration could not be determined".to_string()))?;

    let size = probe
        .format
        .size
        .as_ref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let fps = video_stream
        .avg_frame_rate
        .as_ref()
        .or(video_stream.r_frame_rate.as_ref())
        .and_then(|r| parse_frame_rate(r))
        .unwrap_or(30.0);

    Ok(VideoInfo {
        duration,
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        fps,
        codec: video_stream.codec_name.clone().unwrap_or_default(),
        size,
    })
}

/// Parse a frame rate string (e.g. "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("30/0").is_none());
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let err = probe_video("/nonexistent/video.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
