//! Worker error types and their mapping onto the public error kinds.

use thiserror::Error;

use clipsmith_engine::EngineError;
use clipsmith_media::MediaError;
use clipsmith_models::ErrorKind;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job cancelled")]
    Cancelled,

    #[error("All clip renders failed: {0}")]
    RenderFailedAll(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkerError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The public error kind surfaced in `Job.message`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::Cancelled => ErrorKind::Cancelled,
            WorkerError::RenderFailedAll(_) => ErrorKind::RenderFailedAll,
            WorkerError::Engine(err) => match err {
                EngineError::TranscriptionUnreliable(_) => ErrorKind::TranscriptionUnreliable,
                EngineError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
                EngineError::VisualAnalysisFailed(_) => ErrorKind::VisualAnalysisFailed,
                EngineError::InsufficientMaterial(_) => ErrorKind::InsufficientMaterial,
                EngineError::Media(media) => media_kind(media),
                _ => ErrorKind::Internal,
            },
            WorkerError::Media(media) => media_kind(media),
            WorkerError::Io(_) | WorkerError::Internal(_) => ErrorKind::Internal,
        }
    }
}

fn media_kind(err: &MediaError) -> ErrorKind {
    match err {
        MediaError::InvalidVideo(_)
        | MediaError::FfprobeFailed { .. }
        | MediaError::FileNotFound(_) => ErrorKind::UnreadableMedia,
        MediaError::SourceTooLarge(_) => ErrorKind::SourceTooLarge,
        MediaError::Cancelled => ErrorKind::Cancelled,
        _ => ErrorKind::Internal,
    }
}
