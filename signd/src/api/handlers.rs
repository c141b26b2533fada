//! HTTP request handlers
//!
//! Implements the signage REST endpoints. Catalog mutations report success
//! independently of playback state: uploading or deleting the last asset
//! succeeds even when the player ends up stopped.

use crate::api::AppContext;
use crate::catalog::Asset;
use crate::error::{Error, Result};
use crate::status::DeviceInfo;
use axum::{
    extract::{Multipart, Path, State},
    response::Html,
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    success: bool,
    asset: Asset,
}

#[derive(Debug, Serialize)]
pub struct VideoFileInfo {
    filename: String,
    size_mb: f64,
}

/// Parsed form fields of a file_asset upload
#[derive(Debug)]
struct UploadForm {
    filename: String,
    data: Vec<u8>,
    name: Option<String>,
    duration: u32,
    is_enabled: bool,
    play_order: i64,
}

// ============================================================================
// Health & Status Endpoints
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "signd".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/v1.2/info - Device status
pub async fn get_info(State(ctx): State<AppContext>) -> Json<DeviceInfo> {
    Json(ctx.status.info().await)
}

/// GET / - Minimal server-rendered status page
pub async fn index(State(ctx): State<AppContext>) -> Result<Html<String>> {
    let info = ctx.status.info().await;
    let assets = ctx.engine.list_assets().await?;

    let player_state = if info.vlc_running { "Running" } else { "Stopped" };
    let items: String = assets
        .iter()
        .map(|a| format!("<li>{} ({}s)</li>", a.name, a.duration))
        .collect();

    let html = format!(
        "<html>\n\
         <head><title>signd - {hostname}</title></head>\n\
         <body style=\"font-family: sans-serif; padding: 20px;\">\n\
         <h1>Digital Signage</h1>\n\
         <p><strong>Hostname:</strong> {hostname}</p>\n\
         <p><strong>Player:</strong> {player_state}</p>\n\
         <p><strong>Videos:</strong> {count}</p>\n\
         <h2>Playlist</h2>\n\
         <ul>{items}</ul>\n\
         <p><a href=\"/api/v1.2/info\">API Info</a> | <a href=\"/api/v1.2/assets\">Assets</a></p>\n\
         </body>\n\
         </html>\n",
        hostname = info.hostname,
        player_state = player_state,
        count = assets.len(),
        items = items,
    );
    Ok(Html(html))
}

// ============================================================================
// Asset Endpoints
// ============================================================================

/// GET /api/v1.2/assets - Full catalog view, in playback order
pub async fn list_assets(State(ctx): State<AppContext>) -> Result<Json<Vec<Asset>>> {
    Ok(Json(ctx.engine.list_assets().await?))
}

/// POST /api/v1.2/file_asset - Upload a video and upsert its catalog record
///
/// Multipart form: `file_upload` (required), `name`, `duration`,
/// `is_enabled` ("1"/"0"), `play_order`. Replaces any existing asset with the
/// same filename, then restarts playback over the updated catalog.
pub async fn upload_asset(
    State(ctx): State<AppContext>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let form = parse_upload_form(multipart).await?;

    let file_path = ctx.engine.video_dir().join(&form.filename);
    tokio::fs::write(&file_path, &form.data).await?;
    info!(
        "Stored upload {:?} ({} bytes)",
        file_path,
        form.data.len()
    );

    let asset = Asset::new(
        form.filename,
        form.name,
        form.duration,
        form.is_enabled,
        form.play_order,
    );
    let stored = ctx.engine.upsert_asset(asset).await?;

    Ok(Json(UploadResponse {
        success: true,
        asset: stored,
    }))
}

/// DELETE /api/v1.2/assets/{asset_id} - Remove an asset and its file
///
/// The identifier matches by filename first, then by display name.
pub async fn delete_asset(
    State(ctx): State<AppContext>,
    Path(asset_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    ctx.engine.remove_asset(&asset_id).await?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/v1.2/restart_vlc - Force a playlist regeneration and restart
pub async fn restart_player(State(ctx): State<AppContext>) -> Json<serde_json::Value> {
    let success = ctx.engine.restart_playback().await;
    Json(json!({ "success": success }))
}

// ============================================================================
// Device Endpoints
// ============================================================================

/// POST /api/v1.2/reboot - Reboot the device after a short delay
pub async fn reboot() -> Json<serde_json::Value> {
    warn!("Reboot requested; rebooting in 2 seconds");
    tokio::spawn(async {
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        match tokio::process::Command::new("sudo").arg("reboot").status().await {
            Ok(status) if status.success() => {}
            Ok(status) => error!("Reboot command exited with {}", status),
            Err(e) => error!("Failed to run reboot command: {}", e),
        }
    });
    Json(json!({ "success": true, "message": "Rebooting in 2 seconds" }))
}

/// GET /api/videos - Video files currently on disk
pub async fn list_video_files(
    State(ctx): State<AppContext>,
) -> Result<Json<Vec<VideoFileInfo>>> {
    const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mov", "avi", "mkv", "webm"];

    let mut videos = Vec::new();
    let mut entries = tokio::fs::read_dir(ctx.engine.video_dir()).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_video = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| VIDEO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !is_video {
            continue;
        }
        let size = entry.metadata().await?.len();
        videos.push(VideoFileInfo {
            filename: entry.file_name().to_string_lossy().into_owned(),
            size_mb: (size as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0,
        });
    }
    Ok(Json(videos))
}

// ============================================================================
// Upload form parsing
// ============================================================================

async fn parse_upload_form(mut multipart: Multipart) -> Result<UploadForm> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut name = None;
    let mut duration = 10u32;
    let mut is_enabled = true;
    let mut play_order = 0i64;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let field_name = field.name().map(|n| n.to_string());
        match field_name.as_deref() {
            Some("file_upload") => {
                let filename = field
                    .file_name()
                    .map(|f| f.to_string())
                    .filter(|f| !f.is_empty())
                    .ok_or_else(|| Error::BadRequest("No file selected".to_string()))?;
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| Error::BadRequest(format!("Failed to read upload: {}", e)))?;
                file = Some((filename, data.to_vec()));
            }
            Some("name") => {
                name = Some(read_text_field(field).await?);
            }
            Some("duration") => {
                let text = read_text_field(field).await?;
                duration = text
                    .parse::<u32>()
                    .ok()
                    .filter(|d| *d > 0)
                    .ok_or_else(|| {
                        Error::BadRequest(format!("duration must be a positive integer: '{}'", text))
                    })?;
            }
            Some("is_enabled") => {
                is_enabled = read_text_field(field).await? == "1";
            }
            Some("play_order") => {
                let text = read_text_field(field).await?;
                play_order = text.parse::<i64>().map_err(|_| {
                    Error::BadRequest(format!("play_order must be an integer: '{}'", text))
                })?;
            }
            _ => {}
        }
    }

    let (filename, data) = file.ok_or_else(|| Error::BadRequest("No file provided".to_string()))?;

    // The filename addresses a file directly inside the video directory.
    if filename.contains('/') || filename.contains('\\') || filename.starts_with('.') {
        return Err(Error::BadRequest(format!(
            "Invalid upload filename: '{}'",
            filename
        )));
    }

    Ok(UploadForm {
        filename,
        data,
        name,
        duration,
        is_enabled,
        play_order,
    })
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| Error::BadRequest(format!("Malformed form field: {}", e)))
}
