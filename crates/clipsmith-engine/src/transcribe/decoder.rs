//! External speech decoder invocation.
//!
//! The decoder is a `whisper-ctranslate2`-compatible CLI producing a JSON
//! report with per-segment mean token log-probabilities. One invocation
//! decodes one audio file; the caller owns windowing and deadlines.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use clipsmith_models::SpeechSegment;

use crate::error::{EngineError, EngineResult};

/// One decoder invocation request.
#[derive(Debug, Clone)]
pub struct DecodeRequest {
    /// Model name (e.g. "medium", "large")
    pub model: String,
    /// Beam width, clamped to 1..=5
    pub beam: u32,
    /// Language hint; "auto" lets the decoder detect
    pub language: String,
    /// Voice-activity gating
    pub vad: bool,
    /// Compute precision string passed to the decoder
    pub compute_type: String,
    /// Hard deadline for this invocation
    pub deadline: Duration,
}

/// JSON report produced by the decoder (`--output_format json`).
#[derive(Debug, Deserialize)]
struct DecoderReport {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Vec<DecoderSegment>,
}

#[derive(Debug, Deserialize)]
struct DecoderSegment {
    start: f64,
    end: f64,
    text: String,
    #[serde(default)]
    avg_logprob: Option<f64>,
}

/// Map a mean token log-probability to a [0, 1] confidence.
///
/// `exp` of a mean log-probability is the geometric mean token probability,
/// which is monotone in the input and naturally bounded.
pub fn confidence_from_logprob(avg_logprob: f64) -> f64 {
    avg_logprob.exp().clamp(0.0, 1.0)
}

/// The decoder binary, `WHISPER_BIN` or `whisper-ctranslate2`.
pub fn decoder_bin() -> String {
    std::env::var("WHISPER_BIN").unwrap_or_else(|_| "whisper-ctranslate2".to_string())
}

/// Check the decoder binary is reachable.
pub fn check_decoder() -> EngineResult<PathBuf> {
    let bin = decoder_bin();
    which::which(&bin).map_err(|_| EngineError::DecoderNotFound(bin))
}

/// Decode one audio file. Segment timestamps are shifted by `offset`
/// seconds so windowed decodes land in source time.
pub async fn decode_file(
    audio: &Path,
    offset: f64,
    request: &DecodeRequest,
) -> EngineResult<Vec<SpeechSegment>> {
    check_decoder()?;

    let out_dir = tempfile::tempdir()?;
    let bin = decoder_bin();
    let beam = request.beam.clamp(1, 5);

    let mut cmd = Command::new(&bin);
    cmd.arg(audio)
        .args(["--model", &request.model])
        .args(["--output_format", "json"])
        .args(["--output_dir", &out_dir.path().to_string_lossy()])
        .args(["--beam_size", &beam.to_string()])
        .args(["--temperature", "0"])
        .args(["--compute_type", &request.compute_type])
        .args(["--vad_filter", if request.vad { "True" } else { "False" }]);

    if request.language != "auto" {
        cmd.args(["--language", &request.language]);
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(
        audio = %audio.display(),
        model = %request.model,
        beam,
        "Running speech decoder"
    );

    let mut child = cmd.spawn()?;

    // Drain both pipes concurrently so a chatty decoder cannot deadlock on
    // a full pipe buffer while we wait on it
    let stdout = child.stdout.take().expect("stdout not captured");
    let stderr = child.stderr.take().expect("stderr not captured");
    let stdout_drain = tokio::spawn(drain_pipe(stdout));
    let stderr_drain = tokio::spawn(drain_pipe(stderr));

    let status = match tokio::time::timeout(request.deadline, child.wait()).await {
        Ok(result) => result?,
        Err(_) => {
            warn!(
                deadline_secs = request.deadline.as_secs(),
                "Decoder deadline hit, killing process"
            );
            child.kill().await.ok();
            stdout_drain.await.ok();
            stderr_drain.await.ok();
            return Err(EngineError::transcription_unreliable(format!(
                "decoder exceeded {}s deadline",
                request.deadline.as_secs()
            )));
        }
    };

    stdout_drain.await.ok();
    let stderr_text = stderr_drain.await.unwrap_or_default();

    if !status.success() {
        return Err(EngineError::backend_unavailable(format!(
            "decoder exited with {:?}: {}",
            status.code(),
            stderr_text.lines().last().unwrap_or_default()
        )));
    }

    let report = read_report(out_dir.path(), audio).await?;
    Ok(report_to_segments(report, offset))
}

/// Locate and parse the JSON report the decoder wrote next to the audio stem.
async fn read_report(out_dir: &Path, audio: &Path) -> EngineResult<DecoderReport> {
    let stem = audio
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let expected = out_dir.join(format!("{stem}.json"));

    let path = if expected.exists() {
        expected
    } else {
        // Some decoder versions name the report differently; take the only
        // JSON file in the output directory
        let mut found = None;
        let mut entries = tokio::fs::read_dir(out_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().and_then(|e| e.to_str()) == Some("json") {
                found = Some(entry.path());
                break;
            }
        }
        found.ok_or_else(|| {
            EngineError::backend_unavailable("decoder produced no JSON report")
        })?
    };

    let bytes = tokio::fs::read(&path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn drain_pipe<R: tokio::io::AsyncRead + Unpin>(pipe: R) -> String {
    use tokio::io::AsyncReadExt;
    let mut reader = tokio::io::BufReader::new(pipe);
    let mut buf = String::new();
    reader.read_to_string(&mut buf).await.ok();
    buf
}

fn report_to_segments(report: DecoderReport, offset: f64) -> Vec<SpeechSegment> {
    let language = report.language.unwrap_or_default();
    report
        .segments
        .into_iter()
        .map(|seg| {
            let confidence = seg
                .avg_logprob
                .map(confidence_from_logprob)
                .unwrap_or(0.5);
            let mut out = SpeechSegment::new(
                seg.start + offset,
                seg.end + offset,
                seg.text.trim(),
                confidence,
            );
            out.language = language.clone();
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_mapping() {
        assert!((confidence_from_logprob(0.0) - 1.0).abs() < 1e-9);
        let mid = confidence_from_logprob(-0.5);
        assert!(mid > 0.0 && mid < 1.0);
        // Monotone
        assert!(confidence_from_logprob(-0.1) > confidence_from_logprob(-1.0));
        // Extremes stay bounded
        assert!(confidence_from_logprob(-50.0) >= 0.0);
        assert!(confidence_from_logprob(10.0) <= 1.0);
    }

    #[test]
    fn test_report_parse_and_offset() {
        let json = r#"{
            "language": "en",
            "segments": [
                {"start": 0.0, "end": 2.5, "text": " hello there ", "avg_logprob": -0.2},
                {"start": 2.5, "end": 5.0, "text": "second", "avg_logprob": -1.5}
            ]
        }"#;
        let report: DecoderReport = serde_json::from_str(json).unwrap();
        let segments = report_to_segments(report, 100.0);
        assert_eq!(segments.len(), 2);
        assert!((segments[0].start - 100.0).abs() < 1e-9);
        assert!((segments[1].end - 105.0).abs() < 1e-9);
        assert_eq!(segments[0].text, "hello there");
        assert_eq!(segments[0].language, "en");
        assert!(segments[0].confidence > segments[1].confidence);
    }
}
