//! Job cancel and cleanup.

use axum::extract::{Path, State};
use axum::http::StatusCode;

use clipsmith_models::JobId;

use crate::error::ApiResult;
use crate::state::AppState;

/// `POST /cancel/{job_id}` — cooperative cancel.
pub async fn cancel(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.coordinator.cancel(&JobId(job_id))?;
    Ok(StatusCode::ACCEPTED)
}

/// `DELETE /cleanup/{job_id}` — drop artifacts and the job record.
pub async fn cleanup(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.coordinator.cleanup(&JobId(job_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
