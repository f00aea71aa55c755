//! Engine error types.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Transcription unreliable: {0}")]
    TranscriptionUnreliable(String),

    #[error("All transcription backends failed: {0}")]
    BackendUnavailable(String),

    #[error("Visual analysis failed: {0}")]
    VisualAnalysisFailed(String),

    #[error("Insufficient material: {0}")]
    InsufficientMaterial(String),

    #[error("Decoder not found: {0}")]
    DecoderNotFound(String),

    #[error("Media error: {0}")]
    Media(#[from] clipsmith_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl EngineError {
    pub fn transcription_unreliable(msg: impl Into<String>) -> Self {
        Self::TranscriptionUnreliable(msg.into())
    }

    pub fn backend_unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    pub fn visual_failed(msg: impl Into<String>) -> Self {
        Self::VisualAnalysisFailed(msg.into())
    }

    pub fn insufficient_material(msg: impl Into<String>) -> Self {
        Self::InsufficientMaterial(msg.into())
    }
}
