//! Speech transcription with confidence-tracked retries.
//!
//! Three passes, each optional after the first:
//! 1. Primary decode of the full audio track.
//! 2. Hybrid retry: low-confidence segments re-decoded on a ±0.25 s
//!    expanded window with the larger model at beam 5.
//! 3. Hosted fallback: segments still below threshold submitted to the
//!    external backend, lowest confidence first.
//!
//! The whole invocation runs under an adaptive deadline; on deadline the
//! audio is re-decoded in independent 5-minute chunks with per-chunk
//! deadlines and placeholder segments standing in for failed chunks.

pub mod backend;
pub mod decoder;

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use clipsmith_media::{FfmpegCommand, FfmpegRunner};
use clipsmith_models::{normalize_segments, HardwareProfile, SpeechSegment};

use crate::error::{EngineError, EngineResult};
use backend::BackendConfig;
use decoder::DecodeRequest;

/// Seconds each side of a retried segment's window.
const RETRY_WINDOW_PAD: f64 = 0.25;

/// Chunk length used after a deadline hit, seconds.
const CHUNK_SECONDS: f64 = 300.0;

/// Per-chunk decode deadline, seconds.
const CHUNK_DEADLINE_SECS: u64 = 300;

/// Per-window deadline for retry and hosted passes, seconds.
const WINDOW_DEADLINE_SECS: u64 = 120;

/// Minimum share of the source duration that must be covered by real
/// segments for a best-effort result to be returned after a pass failed.
const MIN_COVERAGE: f64 = 0.6;

/// Serializes invocations of the larger retry model so at most one big
/// model is resident at a time, independent of any job lock.
static RETRY_MODEL_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn retry_model_lock() -> &'static Mutex<()> {
    RETRY_MODEL_LOCK.get_or_init(|| Mutex::new(()))
}

/// Transcriber configuration, frozen per process from env + hardware.
#[derive(Debug, Clone)]
pub struct TranscriberConfig {
    pub model: String,
    pub retry_model: String,
    pub beam: u32,
    pub default_language: String,
    pub vad: bool,
    pub hybrid_retry: bool,
    pub retry_threshold: f64,
    pub compute_type: String,
}

impl TranscriberConfig {
    pub fn from_env(hardware: &HardwareProfile) -> Self {
        Self {
            model: hardware.decoder_model.clone(),
            retry_model: hardware.retry_model.clone(),
            beam: std::env::var("TRANSCRIBER_BEAM")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            default_language: std::env::var("TRANSCRIBER_LANG")
                .unwrap_or_else(|_| "auto".to_string()),
            vad: std::env::var("TRANSCRIBER_VAD")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            hybrid_retry: std::env::var("HYBRID_RETRY")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            retry_threshold: std::env::var("RETRY_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.7),
            compute_type: hardware.precision.as_str().to_string(),
        }
    }
}

/// The transcriber. One instance is shared across workers.
pub struct Transcriber {
    config: TranscriberConfig,
    backend: Option<BackendConfig>,
}

impl Transcriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self {
            backend: BackendConfig::from_env(),
            config,
        }
    }

    /// The adaptive deadline for a full transcription:
    /// `max(10 min, 2 × duration + 5 min)`.
    pub fn deadline_for(duration: f64) -> Duration {
        Duration::from_secs_f64((2.0 * duration + 300.0).max(600.0))
    }

    /// Transcribe a source's audio track into normalized speech segments.
    pub async fn transcribe(
        &self,
        source: &Path,
        duration: f64,
        language: &str,
    ) -> EngineResult<Vec<SpeechSegment>> {
        let workdir = tempfile::tempdir()?;
        let audio = workdir.path().join("audio.wav");
        extract_audio(source, &audio).await?;

        let language = if language.is_empty() {
            self.config.default_language.clone()
        } else {
            language.to_string()
        };

        let mut pass_failure: Option<EngineError> = None;

        // Primary pass
        let request = DecodeRequest {
            model: self.config.model.clone(),
            beam: self.config.beam,
            language: language.clone(),
            vad: self.config.vad,
            compute_type: self.config.compute_type.clone(),
            deadline: Self::deadline_for(duration),
        };

        let mut segments = match decoder::decode_file(&audio, 0.0, &request).await {
            Ok(segments) => {
                info!(count = segments.len(), "Primary transcription pass complete");
                segments
            }
            Err(EngineError::TranscriptionUnreliable(reason)) => {
                warn!(%reason, "Primary pass hit its deadline, decoding in chunks");
                pass_failure = Some(EngineError::transcription_unreliable(reason));
                self.decode_chunked(&audio, duration, &language, workdir.path())
                    .await?
            }
            Err(err) => return Err(err),
        };

        // Hybrid retry pass
        if self.config.hybrid_retry {
            if let Err(err) = self
                .retry_low_confidence(source, &mut segments, &language)
                .await
            {
                warn!(error = %err, "Hybrid retry pass failed");
                pass_failure = Some(err);
            }
        }

        // Hosted fallback pass
        if let Some(backend_config) = &self.backend {
            if let Err(err) = self
                .hosted_fallback(source, &mut segments, &language, backend_config)
                .await
            {
                warn!(error = %err, "Hosted fallback pass failed");
                pass_failure = Some(err);
            }
        }

        let covered: f64 = segments
            .iter()
            .filter(|s| !s.is_placeholder())
            .map(|s| s.duration())
            .sum();

        let segments = normalize_segments(segments);

        if let Some(err) = pass_failure {
            if duration > 0.0 && covered / duration < MIN_COVERAGE {
                return Err(err);
            }
            debug!(
                coverage = covered / duration.max(1e-9),
                "Returning best-effort transcript despite pass failure"
            );
        }

        info!(count = segments.len(), covered, "Transcription complete");
        Ok(segments)
    }

    /// Chunked decode used after the primary pass misses its deadline.
    async fn decode_chunked(
        &self,
        audio: &Path,
        duration: f64,
        language: &str,
        workdir: &Path,
    ) -> EngineResult<Vec<SpeechSegment>> {
        let mut segments = Vec::new();
        let mut consecutive_failures = 0u32;
        let mut start = 0.0_f64;
        let mut index = 0u32;

        while start < duration {
            let end = (start + CHUNK_SECONDS).min(duration);
            let chunk_path = workdir.join(format!("chunk_{index:03}.wav"));

            let result = async {
                extract_window(audio, &chunk_path, start, end - start).await?;
                let request = DecodeRequest {
                    model: self.config.model.clone(),
                    beam: self.config.beam,
                    language: language.to_string(),
                    vad: self.config.vad,
                    compute_type: self.config.compute_type.clone(),
                    deadline: Duration::from_secs(CHUNK_DEADLINE_SECS),
                };
                decoder::decode_file(&chunk_path, start, &request).await
            }
            .await;

            match result {
                Ok(chunk_segments) => {
                    consecutive_failures = 0;
                    segments.extend(chunk_segments);
                }
                Err(err) => {
                    warn!(chunk = index, error = %err, "Chunk decode failed");
                    consecutive_failures += 1;
                    if consecutive_failures >= 2 {
                        return Err(EngineError::transcription_unreliable(format!(
                            "{consecutive_failures} consecutive chunk failures"
                        )));
                    }
                    segments.push(SpeechSegment::placeholder(start, end));
                }
            }

            tokio::fs::remove_file(&chunk_path).await.ok();
            start = end;
            index += 1;
        }

        info!(chunks = index, count = segments.len(), "Chunked decode complete");
        Ok(segments)
    }

    /// Re-decode low-confidence segments with the larger model.
    async fn retry_low_confidence(
        &self,
        source: &Path,
        segments: &mut [SpeechSegment],
        language: &str,
    ) -> EngineResult<()> {
        let candidates: Vec<usize> = segments
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_placeholder() && s.confidence < self.config.retry_threshold)
            .map(|(i, _)| i)
            .collect();

        if candidates.is_empty() {
            return Ok(());
        }
        info!(count = candidates.len(), "Retrying low-confidence segments");

        let workdir = tempfile::tempdir()?;

        for i in candidates {
            let (start, end) = {
                let seg = &segments[i];
                ((seg.start - RETRY_WINDOW_PAD).max(0.0), seg.end + RETRY_WINDOW_PAD)
            };
            let window = workdir.path().join(format!("retry_{i}.wav"));
            extract_window(source, &window, start, end - start).await?;

            // Only one retry-model invocation at a time; the larger model is
            // swapped in outside any job lock
            let decoded = {
                let _guard = retry_model_lock().lock().await;
                let request = DecodeRequest {
                    model: self.config.retry_model.clone(),
                    beam: 5,
                    language: language.to_string(),
                    vad: self.config.vad,
                    compute_type: self.config.compute_type.clone(),
                    deadline: Duration::from_secs(WINDOW_DEADLINE_SECS),
                };
                decoder::decode_file(&window, start, &request).await
            };
            tokio::fs::remove_file(&window).await.ok();

            match decoded {
                Ok(retried) if !retried.is_empty() => {
                    let confidence = mean_confidence(&retried);
                    let seg = &mut segments[i];
                    // Ties keep the primary result
                    if confidence > seg.confidence {
                        debug!(
                            index = i,
                            old = seg.confidence,
                            new = confidence,
                            "Retry pass improved segment"
                        );
                        seg.text = joined_text(&retried);
                        seg.confidence = confidence;
                    }
                }
                Ok(_) => {}
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    /// Submit remaining low-confidence segments to the hosted decoder,
    /// lowest confidence first.
    async fn hosted_fallback(
        &self,
        source: &Path,
        segments: &mut [SpeechSegment],
        language: &str,
        backend_config: &BackendConfig,
    ) -> EngineResult<()> {
        let mut candidates: Vec<usize> = segments
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_placeholder() && s.confidence < self.config.retry_threshold)
            .map(|(i, _)| i)
            .collect();
        candidates.sort_by(|&a, &b| {
            segments[a]
                .confidence
                .partial_cmp(&segments[b].confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        if candidates.is_empty() {
            return Ok(());
        }
        info!(count = candidates.len(), "Submitting segments to hosted decoder");

        let workdir = tempfile::tempdir()?;

        for i in candidates {
            let (start, end) = (segments[i].start, segments[i].end);
            let window = workdir.path().join(format!("hosted_{i}.wav"));
            extract_window(source, &window, start, end - start).await?;

            let result = backend::transcribe_window(backend_config, &window, language).await;
            tokio::fs::remove_file(&window).await.ok();

            let transcript = result?;
            let seg = &mut segments[i];
            if transcript.confidence > seg.confidence && !transcript.text.is_empty() {
                debug!(
                    index = i,
                    old = seg.confidence,
                    new = transcript.confidence,
                    "Hosted decoder improved segment"
                );
                seg.text = transcript.text;
                seg.confidence = transcript.confidence;
            }
        }

        Ok(())
    }
}

fn mean_confidence(segments: &[SpeechSegment]) -> f64 {
    if segments.is_empty() {
        return 0.0;
    }
    segments.iter().map(|s| s.confidence).sum::<f64>() / segments.len() as f64
}

fn joined_text(segments: &[SpeechSegment]) -> String {
    segments
        .iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Demux the audio track to 16 kHz mono WAV.
async fn extract_audio(source: &Path, output: &Path) -> EngineResult<()> {
    let cmd = FfmpegCommand::new(source, output)
        .no_video()
        .output_args(["-ar", "16000", "-ac", "1"]);
    FfmpegRunner::new().with_timeout(600).run(&cmd).await?;
    Ok(())
}

/// Cut one audio window to 16 kHz mono WAV.
async fn extract_window(
    source: &Path,
    output: &Path,
    start: f64,
    duration: f64,
) -> EngineResult<()> {
    let cmd = FfmpegCommand::new(source, output)
        .seek(start)
        .duration(duration.max(0.1))
        .no_video()
        .output_args(["-ar", "16000", "-ac", "1"]);
    FfmpegRunner::new().with_timeout(120).run(&cmd).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_ladder() {
        // Short sources keep the 10 minute floor
        assert_eq!(Transcriber::deadline_for(60.0), Duration::from_secs(600));
        // Long sources scale: 2x + 5min
        assert_eq!(
            Transcriber::deadline_for(3600.0),
            Duration::from_secs(2 * 3600 + 300)
        );
    }

    #[test]
    fn test_mean_confidence() {
        let segments = vec![
            SpeechSegment::new(0.0, 1.0, "a", 0.4),
            SpeechSegment::new(1.0, 2.0, "b", 0.8),
        ];
        assert!((mean_confidence(&segments) - 0.6).abs() < 1e-9);
        assert!(mean_confidence(&[]).abs() < 1e-9);
    }

    #[test]
    fn test_joined_text() {
        let segments = vec![
            SpeechSegment::new(0.0, 1.0, " first ", 0.9),
            SpeechSegment::new(1.0, 2.0, "", 0.9),
            SpeechSegment::new(2.0, 3.0, "second", 0.9),
        ];
        assert_eq!(joined_text(&segments), "first second");
    }

    #[test]
    fn test_config_defaults() {
        std::env::remove_var("TRANSCRIBER_BEAM");
        std::env::remove_var("RETRY_THRESHOLD");
        let config = TranscriberConfig::from_env(&HardwareProfile::cpu());
        assert_eq!(config.beam, 5);
        assert!((config.retry_threshold - 0.7).abs() < 1e-9);
        assert!(config.vad);
        assert!(config.hybrid_retry);
        assert_eq!(config.compute_type, "int8");
    }
}
