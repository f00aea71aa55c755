//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use clipsmith_media::MediaError;
use clipsmith_worker::CoordinatorError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payload too large: {0}")]
    TooLarge(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedType(String),

    #[error("Unreadable media: {0}")]
    Unreadable(String),

    #[error("Upstream fetch exhausted: {0}")]
    FetchExhausted(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Unreadable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::FetchExhausted(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoordinatorError> for ApiError {
    fn from(err: CoordinatorError) -> Self {
        match err {
            CoordinatorError::Busy => ApiError::Conflict("busy".to_string()),
            CoordinatorError::NotFound => ApiError::NotFound("job not found".to_string()),
            CoordinatorError::Conflict(state) => ApiError::Conflict(state.to_string()),
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::SourceTooLarge(msg) => ApiError::TooLarge(msg),
            MediaError::InvalidVideo(msg) => ApiError::Unreadable(msg),
            MediaError::FfprobeFailed { message, .. } => ApiError::Unreadable(message),
            MediaError::FileNotFound(path) => {
                ApiError::NotFound(path.to_string_lossy().to_string())
            }
            MediaError::DownloadFailed { message, transient } => {
                if transient {
                    ApiError::FetchExhausted(message)
                } else {
                    ApiError::BadRequest(message)
                }
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = match &self {
            // Internal detail stays in the logs, not the response
            ApiError::Internal(_) => "an internal error occurred".to_string(),
            other => other.to_string(),
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::TooLarge("x".into()).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::UnsupportedType("x".into()).status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            ApiError::Unreadable("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::FetchExhausted("x".into()).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_coordinator_error_mapping() {
        assert_eq!(
            ApiError::from(CoordinatorError::Busy).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(CoordinatorError::NotFound).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_download_error_mapping() {
        let transient = MediaError::download_transient("net down");
        assert_eq!(
            ApiError::from(transient).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        let permanent = MediaError::download_permanent("bad url");
        assert_eq!(
            ApiError::from(permanent).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
