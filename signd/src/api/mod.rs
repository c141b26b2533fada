//! REST API implementation
//!
//! Routes are shape-compatible with the Anthias v1.2 signage API so existing
//! remote controllers keep working against this daemon.

pub mod handlers;

use crate::engine::SignageEngine;
use crate::status::StatusReporter;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub engine: Arc<SignageEngine>,
    pub status: Arc<StatusReporter>,
}

/// Create the API router
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        // Status page and health check
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        // Signage API v1.2
        .route("/api/v1.2/info", get(handlers::get_info))
        .route("/api/v1.2/assets", get(handlers::list_assets))
        .route("/api/v1.2/file_asset", post(handlers::upload_asset))
        .route("/api/v1.2/assets/:asset_id", delete(handlers::delete_asset))
        .route("/api/v1.2/restart_vlc", post(handlers::restart_player))
        .route("/api/v1.2/reboot", post(handlers::reboot))
        // On-disk video listing
        .route("/api/videos", get(handlers::list_video_files))
        .with_state(ctx)
        // Uploads are whole video files; the 2 MB default is far too small
        .layer(DefaultBodyLimit::max(512 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
