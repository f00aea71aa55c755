//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while driving external media tools.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("yt-dlp not found in PATH")]
    YtDlpNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Download failed: {message}")]
    DownloadFailed { message: String, transient: bool },

    #[error("Source exceeds limits: {0}")]
    SourceTooLarge(String),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl MediaError {
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn download_transient(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
            transient: true,
        }
    }

    pub fn download_permanent(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
            transient: false,
        }
    }

    /// True when retrying the same operation could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MediaError::DownloadFailed { transient: true, .. } | MediaError::Timeout(_)
        )
    }
}
