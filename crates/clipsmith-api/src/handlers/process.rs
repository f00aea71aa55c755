//! Job admission and the status query path.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use clipsmith_models::{
    AspectRatio, ClipStyle, DurationClass, JobId, JobSnapshot, ProcessOptions, SourceId,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ProcessRequest {
    pub source_id: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub target_duration: Option<DurationClass>,
    #[serde(default)]
    pub style: Option<ClipStyle>,
    #[serde(default)]
    pub use_hook: bool,
    #[serde(default)]
    pub auto_caption: bool,
    #[serde(default)]
    pub aspect_ratio: Option<AspectRatio>,
}

#[derive(Serialize)]
pub struct ProcessResponse {
    pub job_id: String,
}

/// `POST /process` — enqueue a job for an admitted source.
pub async fn process(
    State(state): State<AppState>,
    Json(request): Json<ProcessRequest>,
) -> ApiResult<(StatusCode, Json<ProcessResponse>)> {
    let source_id = SourceId(request.source_id.clone());
    let source = state
        .source(&source_id)
        .ok_or_else(|| ApiError::not_found(format!("no source '{}'", request.source_id)))?;

    let options = ProcessOptions {
        language: request.language.unwrap_or_else(|| "auto".to_string()),
        target_duration: request.target_duration.unwrap_or_default(),
        style: request.style.unwrap_or_default(),
        use_hook: request.use_hook,
        auto_caption: request.auto_caption,
        aspect_ratio: request.aspect_ratio.unwrap_or_default(),
    };

    let job_id = state.coordinator.enqueue(source, options)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ProcessResponse {
            job_id: job_id.to_string(),
        }),
    ))
}

/// `GET /status/{job_id}` — poll a job snapshot.
pub async fn status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobSnapshot>> {
    let snapshot = state.coordinator.status(&JobId(job_id))?;
    Ok(Json(snapshot))
}
