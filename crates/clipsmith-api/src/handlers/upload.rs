//! Local source admission.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::info;

use clipsmith_media::probe_video;
use clipsmith_models::{sanitize_source_id, SourceVideo};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Accepted container extensions.
const ALLOWED_EXTENSIONS: [&str; 4] = ["mp4", "mov", "avi", "mkv"];

#[derive(Serialize)]
pub struct UploadResponse {
    pub source_id: String,
    pub duration: f64,
    pub size: u64,
}

/// `POST /upload` — admit a multipart-uploaded source file.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
        .ok_or_else(|| ApiError::bad_request("no file field in request"))?;

    let filename = field
        .file_name()
        .map(|n| n.to_string())
        .ok_or_else(|| ApiError::bad_request("upload is missing a filename"))?;

    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ApiError::UnsupportedType(format!(
            "extension '{ext}' not allowed; expected one of {ALLOWED_EXTENSIONS:?}"
        )));
    }

    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    if bytes.len() as u64 > state.limits.max_size {
        return Err(ApiError::TooLarge(format!(
            "{} bytes exceeds the {} byte limit",
            bytes.len(),
            state.limits.max_size
        )));
    }

    let source_id = sanitize_source_id(&filename);
    let path = state.store.upload_path(&source_id, &ext);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    // Reject unreadable or over-long sources after the fact, removing the file
    let info = match probe_video(&path).await {
        Ok(info) => info,
        Err(err) => {
            tokio::fs::remove_file(&path).await.ok();
            return Err(err.into());
        }
    };
    if info.duration > state.limits.max_duration {
        tokio::fs::remove_file(&path).await.ok();
        return Err(ApiError::TooLarge(format!(
            "duration {:.0}s exceeds maximum {:.0}s",
            info.duration, state.limits.max_duration
        )));
    }

    let size = bytes.len() as u64;
    let source = SourceVideo {
        id: source_id.clone(),
        path,
        duration: info.duration,
        fps: info.fps,
        width: info.width,
        height: info.height,
        codec: info.codec,
        title: None,
        channel: None,
    };
    state.register_source(source);

    info!(source_id = %source_id, size, "Source uploaded");
    Ok(Json(UploadResponse {
        source_id: source_id.to_string(),
        duration: info.duration,
        size,
    }))
}
