//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Builder for FFmpeg invocations.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path; `None` renders to the null muxer (analysis runs)
    output: Option<PathBuf>,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: Some(output.as_ref().to_path_buf()),
            input_args: Vec::new(),
            output_args: Vec::new(),
        }
    }

    /// An analysis-only run: the full filter graph executes but output goes
    /// to the null muxer (used by silencedetect).
    pub fn analysis(input: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: None,
            input_args: Vec::new(),
            output_args: Vec::new(),
        }
    }

    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Seek position (before input, fast seek).
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Output duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    pub fn audio_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-af").output_arg(filter)
    }

    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    pub fn video_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:v").output_arg(bitrate)
    }

    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Strip the video stream (audio extraction runs).
    pub fn no_video(self) -> Self {
        self.output_arg("-vn")
    }

    /// Build the argument list.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-nostdin".to_string(),
        ];

        args.extend(self.input_args.clone());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());
        args.extend(self.output_args.clone());

        match &self.output {
            Some(path) => args.push(path.to_string_lossy().to_string()),
            None => {
                args.push("-f".to_string());
                args.push("null".to_string());
                args.push("-".to_string());
            }
        }

        args
    }
}

/// Runs FFmpeg commands with a hard deadline and cooperative cancellation.
///
/// On deadline or cancellation the child is killed and reaped; stderr is
/// captured on a separate task so a chatty child never deadlocks on a full
/// pipe buffer.
pub struct FfmpegRunner {
    cancel: Option<Arc<AtomicBool>>,
    timeout_secs: Option<u64>,
    log_level: String,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self {
            cancel: None,
            timeout_secs: None,
            log_level: "error".to_string(),
        }
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Capture stderr at the given ffmpeg log level (silencedetect output
    /// arrives at `info`).
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Run the command, discarding stderr on success.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_capturing(cmd).await.map(|_| ())
    }

    /// Run the command, returning captured stderr.
    pub async fn run_capturing(&self, cmd: &FfmpegCommand) -> MediaResult<String> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        if let Some(cancel) = &self.cancel {
            if cancel.load(Ordering::Relaxed) {
                return Err(MediaError::Cancelled);
            }
        }

        let mut args = cmd.build_args();
        // Replace the default log level chosen by build_args
        if let Some(pos) = args.iter().position(|a| a == "-v") {
            args[pos + 1] = self.log_level.clone();
        }
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let stderr = child.stderr.take().expect("stderr not captured");
        let drain = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut buf = String::new();
            reader.read_to_string(&mut buf).await.ok();
            buf
        });

        let status = match self.timeout_secs {
            Some(timeout_secs) => {
                let deadline = std::time::Duration::from_secs(timeout_secs);
                match tokio::time::timeout(deadline, child.wait()).await {
                    Ok(result) => result?,
                    Err(_) => {
                        warn!(timeout_secs, "FFmpeg deadline hit, killing process");
                        child.kill().await.ok();
                        drain.await.ok();
                        return Err(MediaError::Timeout(timeout_secs));
                    }
                }
            }
            None => child.wait().await?,
        };

        let stderr_text = drain.await.unwrap_or_default();

        if let Some(cancel) = &self.cancel {
            if cancel.load(Ordering::Relaxed) {
                return Err(MediaError::Cancelled);
            }
        }

        if status.success() {
            Ok(stderr_text)
        } else {
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(stderr_text),
                status.code(),
            ))
        }
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

/// Check if yt-dlp is available.
pub fn check_ytdlp() -> MediaResult<PathBuf> {
    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = FfmpegCommand::new("input.mp4", "output.mp4")
            .seek(10.0)
            .duration(30.0)
            .video_codec("libx264")
            .video_bitrate("4M");

        let args = cmd.build_args();
        assert!(args.contains(&"-ss".to_string()));
        assert!(args.contains(&"10.000".to_string()));
        assert!(args.contains(&"-c:v".to_string()));
        assert!(args.contains(&"libx264".to_string()));
        assert_eq!(args.last().unwrap(), "output.mp4");
    }

    #[test]
    fn test_seek_precedes_input() {
        let args = FfmpegCommand::new("in.mp4", "out.mp4").seek(5.0).build_args();
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input);
    }

    #[test]
    fn test_analysis_targets_null_muxer() {
        let args = FfmpegCommand::analysis("in.mp4").build_args();
        assert_eq!(args[args.len() - 3..], ["-f", "null", "-"]);
    }
}
