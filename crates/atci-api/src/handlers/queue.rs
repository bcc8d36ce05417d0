//! Queue inspection and manipulation endpoints.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use atci_models::{is_video_path, Job, ProcessType};
use atci_queue::CurrentJob;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `GET /api/queue/status` response.
#[derive(Debug, Serialize)]
pub struct QueueStatus {
    pub queue: Vec<Job>,
    pub processing: &'static str,
    pub current_processing: Option<CurrentJob>,
}

/// `GET /api/queue/status`
pub async fn get_queue_status(State(state): State<AppState>) -> ApiResult<Json<QueueStatus>> {
    let queue = state.queue.pending()?;
    let current = state.queue.peek_current()?;
    Ok(Json(QueueStatus {
        queue,
        processing: if current.is_some() { "processing" } else { "idle" },
        current_processing: current,
    }))
}

/// `POST /api/queue/add` body.
#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub path: std::path::PathBuf,
    #[serde(default)]
    pub process_type: Option<ProcessType>,
    #[serde(default)]
    pub time: Option<String>,
}

/// `POST /api/queue/add`
pub async fn add_to_queue(
    State(state): State<AppState>,
    Json(request): Json<AddRequest>,
) -> ApiResult<Json<Value>> {
    if !request.path.is_file() {
        return Err(ApiError::not_found(format!(
            "video file not found: {}",
            request.path.display()
        )));
    }
    if !is_video_path(&request.path) {
        return Err(ApiError::bad_request("not a recognized video file"));
    }

    let process_type = request.process_type.unwrap_or(ProcessType::All);
    let job = match process_type {
        ProcessType::Partial => {
            let time = request
                .time
                .ok_or_else(|| ApiError::bad_request("partial jobs require a time"))?;
            Job::partial(request.path, time)
        }
        ProcessType::All => Job::all(request.path),
        ProcessType::Length => Job::length(request.path),
    };

    let added = state.queue.enqueue(&job)?;
    info!("queue add via API: {} (added: {added})", job.path.display());
    Ok(Json(json!({ "added": added })))
}

/// `DELETE /api/queue/remove`
pub async fn remove_from_queue(
    State(state): State<AppState>,
    Json(job): Json<Job>,
) -> ApiResult<Json<Value>> {
    state.queue.remove(&job)?;
    Ok(Json(json!({ "removed": true })))
}

/// `POST /api/queue/reorder` body.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub queue: Vec<Job>,
}

/// `POST /api/queue/reorder`
pub async fn reorder_queue(
    State(state): State<AppState>,
    Json(request): Json<ReorderRequest>,
) -> ApiResult<Json<Value>> {
    state.queue.reorder(&request.queue)?;
    Ok(Json(json!({ "reordered": true })))
}

/// `DELETE /api/queue/cancel-current`
pub async fn cancel_current(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let cancelled = state.queue.cancel_current(&state.cancel)?;
    Ok(Json(json!({ "cancelled": cancelled })))
}
