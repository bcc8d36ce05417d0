//! Video inspection endpoints.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use atci_media::command::resolve_tool;
use atci_media::probe_media;
use atci_store::VideoRecord;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `GET /api/videos` — the indexed library.
pub async fn list_videos(State(state): State<AppState>) -> ApiResult<Json<Vec<VideoRecord>>> {
    Ok(Json(state.db.list_videos()?))
}

#[derive(Debug, Deserialize)]
pub struct SubtitleStreamsQuery {
    pub path: std::path::PathBuf,
}

#[derive(Debug, Serialize)]
pub struct SubtitleStreamInfo {
    pub index: usize,
    pub codec: String,
    pub language: String,
    pub text: bool,
}

/// `GET /api/video/subtitle-streams?path=...`
pub async fn subtitle_streams(
    State(state): State<AppState>,
    Query(query): Query<SubtitleStreamsQuery>,
) -> ApiResult<Json<Vec<SubtitleStreamInfo>>> {
    if !query.path.is_file() {
        return Err(ApiError::not_found(format!(
            "video file not found: {}",
            query.path.display()
        )));
    }

    let cfg = state.config()?;
    let ffprobe = resolve_tool("ffprobe", &cfg.ffprobe_path)?;
    let info = probe_media(&ffprobe, &query.path).await?;

    Ok(Json(
        info.subtitle_streams
            .iter()
            .map(|s| SubtitleStreamInfo {
                index: s.index,
                codec: s.codec.clone(),
                language: s.language_display(),
                text: s.is_text(),
            })
            .collect(),
    ))
}
