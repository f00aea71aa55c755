//! Artifact downloads.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::body::Body;

use clipsmith_models::{JobId, JobStatus};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn file_response(bytes: Vec<u8>, filename: &str, content_type: &str) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(bytes))
        .expect("static response construction")
}

fn content_type_for(filename: &str) -> &'static str {
    if filename.ends_with(".mp4") {
        "video/mp4"
    } else if filename.ends_with(".captions") {
        "text/plain; charset=utf-8"
    } else if filename.ends_with(".json") {
        "application/json"
    } else {
        "application/octet-stream"
    }
}

/// `GET /download/{job_id}/{file}` — fetch one clip or sidecar.
pub async fn download_file(
    State(state): State<AppState>,
    Path((job_id, file)): Path<(String, String)>,
) -> ApiResult<Response> {
    let job_id = JobId(job_id);
    if !state.coordinator.exists(&job_id) {
        return Err(ApiError::not_found("job not found"));
    }

    let path = state.store.resolve_artifact(&job_id, &file)?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(file_response(bytes, &file, content_type_for(&file)))
}

/// `GET /download-all/{job_id}` — fetch every artifact as one archive.
pub async fn download_all(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let job_id = JobId(job_id);
    let snapshot = state.coordinator.status(&job_id)?;
    if snapshot.status == JobStatus::Running || snapshot.status == JobStatus::Queued {
        return Err(ApiError::conflict("job is still running"));
    }

    let archive = state.store.archive_job(&job_id).await?;
    let bytes = tokio::fs::read(&archive)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let filename = format!("{}_clips.zip", job_id.as_str());
    Ok(file_response(bytes, &filename, "application/zip"))
}
