//! API routes.

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::files::serve_file;
use crate::handlers::health;
use crate::handlers::queue::{
    add_to_queue, cancel_current, get_queue_status, remove_from_queue, reorder_queue,
};
use crate::handlers::video::{list_videos, subtitle_streams};
use crate::middleware::password_gate;
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let queue_routes = Router::new()
        .route("/queue/status", get(get_queue_status))
        .route("/queue/add", post(add_to_queue))
        .route("/queue/remove", delete(remove_from_queue))
        .route("/queue/reorder", post(reorder_queue))
        .route("/queue/cancel-current", delete(cancel_current));

    let video_routes = Router::new()
        .route("/videos", get(list_videos))
        .route("/video/subtitle-streams", get(subtitle_streams));

    let protected = Router::new()
        .nest("/api", queue_routes.merge(video_routes))
        .route("/files/*path", get(serve_file))
        .route_layer(middleware::from_fn(password_gate));

    Router::new()
        .merge(protected)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
