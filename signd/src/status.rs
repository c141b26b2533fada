//! Device status aggregation
//!
//! Read-only view over the engine for the info endpoint and the status page.
//! Uptime is the wall-clock delta from daemon start; the reporter is
//! constructed once at startup and held in the app context.

use crate::engine::SignageEngine;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Device info response
///
/// Wire field names follow the emulated signage API for client compatibility.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub online: bool,
    pub uptime: String,
    pub uptime_seconds: u64,
    pub hostname: String,
    pub video_count: usize,
    pub vlc_running: bool,
    pub system: String,
}

pub struct StatusReporter {
    engine: Arc<SignageEngine>,
    started: Instant,
    hostname: String,
}

impl StatusReporter {
    pub fn new(engine: Arc<SignageEngine>) -> Self {
        Self {
            engine,
            started: Instant::now(),
            hostname: sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string()),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub async fn info(&self) -> DeviceInfo {
        let uptime_seconds = self.started.elapsed().as_secs();
        DeviceInfo {
            online: true,
            uptime: format_uptime(uptime_seconds),
            uptime_seconds,
            hostname: self.hostname.clone(),
            video_count: self.engine.asset_count().await.unwrap_or(0),
            vlc_running: self.engine.player_running().await,
            system: "signd".to_string(),
        }
    }
}

fn format_uptime(seconds: u64) -> String {
    format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
}
