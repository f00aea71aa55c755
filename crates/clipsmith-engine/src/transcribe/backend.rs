//! External hosted decoder fallback.
//!
//! Low-confidence segments can be re-submitted to a hosted transcription
//! endpoint. The pass is skipped entirely when no credential is configured,
//! and a segment only accepts the hosted result when it improves on the
//! local confidence.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};

/// Hosted backend configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub api_key: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl BackendConfig {
    /// `None` when `EXTERNAL_BACKEND_KEY` is unset: the pass is skipped.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("EXTERNAL_BACKEND_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        Some(Self {
            api_key,
            endpoint: std::env::var("EXTERNAL_BACKEND_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/audio/transcriptions".to_string()),
            timeout: Duration::from_secs(60),
        })
    }
}

#[derive(Debug, Deserialize)]
struct BackendResponse {
    text: String,
    #[serde(default)]
    segments: Vec<BackendSegment>,
}

#[derive(Debug, Deserialize)]
struct BackendSegment {
    #[serde(default)]
    avg_logprob: Option<f64>,
}

/// Result of one hosted decode.
#[derive(Debug, Clone)]
pub struct BackendTranscript {
    pub text: String,
    pub confidence: f64,
}

/// Submit one audio window to the hosted decoder.
pub async fn transcribe_window(
    config: &BackendConfig,
    audio: &Path,
    language: &str,
) -> EngineResult<BackendTranscript> {
    let bytes = tokio::fs::read(audio).await?;
    let filename = audio
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "window.wav".to_string());

    let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
    let mut form = reqwest::multipart::Form::new()
        .part("file", part)
        .text("model", "whisper-1")
        .text("response_format", "verbose_json");
    if language != "auto" {
        form = form.text("language", language.to_string());
    }

    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| EngineError::backend_unavailable(e.to_string()))?;

    let response = client
        .post(&config.endpoint)
        .bearer_auth(&config.api_key)
        .multipart(form)
        .send()
        .await
        .map_err(|e| EngineError::backend_unavailable(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        warn!(status = %status, "Hosted decoder rejected request");
        return Err(EngineError::backend_unavailable(format!(
            "hosted decoder returned {status}"
        )));
    }

    let parsed: BackendResponse = response
        .json()
        .await
        .map_err(|e| EngineError::backend_unavailable(e.to_string()))?;

    let confidence = mean_confidence(&parsed.segments);
    debug!(confidence, "Hosted decode complete");

    Ok(BackendTranscript {
        text: parsed.text.trim().to_string(),
        confidence,
    })
}

/// Mean of per-segment confidences; a conservative prior when the response
/// carries no log-probabilities.
fn mean_confidence(segments: &[BackendSegment]) -> f64 {
    let values: Vec<f64> = segments
        .iter()
        .filter_map(|s| s.avg_logprob)
        .map(super::decoder::confidence_from_logprob)
        .collect();
    if values.is_empty() {
        0.75
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_requires_key() {
        std::env::remove_var("EXTERNAL_BACKEND_KEY");
        assert!(BackendConfig::from_env().is_none());
    }

    #[test]
    fn test_mean_confidence_empty_prior() {
        assert!((mean_confidence(&[]) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_mean_confidence_from_logprobs() {
        let segments = vec![
            BackendSegment { avg_logprob: Some(0.0) },
            BackendSegment { avg_logprob: Some(0.0) },
        ];
        assert!((mean_confidence(&segments) - 1.0).abs() < 1e-9);
    }
}
