//! Remote source admission via the fetcher.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use clipsmith_media::{check_limits, download_source, probe_remote, probe_video, Quality};
use clipsmith_models::{sanitize_source_id, SourceVideo};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct FetchRequest {
    pub url: String,
    #[serde(default)]
    pub quality: Option<String>,
}

#[derive(Serialize)]
pub struct FetchResponse {
    pub source_id: String,
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

/// `POST /fetch` — download a public URL into the upload directory.
pub async fn fetch(
    State(state): State<AppState>,
    Json(request): Json<FetchRequest>,
) -> ApiResult<Json<FetchResponse>> {
    if request.url.trim().is_empty() {
        return Err(ApiError::bad_request("url is required"));
    }
    if !request.url.starts_with("http://") && !request.url.starts_with("https://") {
        return Err(ApiError::bad_request("url must be http(s)"));
    }

    let quality = Quality::parse(request.quality.as_deref().unwrap_or("best"));

    // Limits are enforced on probed metadata before any bytes move
    let remote = probe_remote(&request.url).await?;
    check_limits(&remote, &state.limits)?;

    let ext = remote.ext.clone().unwrap_or_else(|| "mp4".to_string());
    let display_name = remote
        .title
        .clone()
        .unwrap_or_else(|| "fetched_source".to_string());
    let source_id = sanitize_source_id(&format!("{display_name}.{ext}"));
    let path = state.store.upload_path(&source_id, &ext);

    download_source(&request.url, quality, &path, &state.limits).await?;

    let info = probe_video(&path).await?;
    if info.duration > state.limits.max_duration {
        tokio::fs::remove_file(&path).await.ok();
        return Err(ApiError::TooLarge(format!(
            "duration {:.0}s exceeds maximum {:.0}s",
            info.duration, state.limits.max_duration
        )));
    }

    let source = SourceVideo {
        id: source_id.clone(),
        path,
        duration: info.duration,
        fps: info.fps,
        width: info.width,
        height: info.height,
        codec: info.codec,
        title: remote.title.clone(),
        channel: remote.channel.clone(),
    };
    state.register_source(source);

    info!(source_id = %source_id, url = %request.url, "Source fetched");
    Ok(Json(FetchResponse {
        source_id: source_id.to_string(),
        duration: info.duration,
        title: remote.title,
        channel: remote.channel,
    }))
}
