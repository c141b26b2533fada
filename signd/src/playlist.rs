//! Player-facing playlist derivation
//!
//! A playlist is derived from a catalog snapshot plus filesystem reality:
//! one entry per enabled asset whose backing file currently exists, in
//! catalog order. It is never domain state; the M3U artifact written for the
//! external player is regenerated from scratch every time.

use crate::catalog::AssetCatalog;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One line-pair of the playlist artifact
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistEntry {
    /// Absolute path of the backing file
    pub path: PathBuf,
    /// Display duration in seconds
    pub duration: u32,
    /// Display label
    pub name: String,
}

/// Derived, ephemeral playback sequence
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    pub entries: Vec<PlaylistEntry>,
}

impl Playlist {
    /// True iff there is nothing to play
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Serialize to extended M3U
    pub fn to_m3u(&self) -> String {
        let mut out = String::from("#EXTM3U\n");
        for entry in &self.entries {
            out.push_str(&format!("#EXTINF:{},{}\n", entry.duration, entry.name));
            out.push_str(&format!("{}\n", entry.path.display()));
        }
        out
    }

    /// Write the M3U artifact for the external player
    pub async fn write(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, self.to_m3u()).await?;
        Ok(())
    }
}

/// Derive a playlist from a catalog snapshot
///
/// The catalog is already sorted by `play_order`, so output order equals
/// input order. Disabled assets are excluded; assets whose backing file is
/// absent are skipped silently since catalog edits can race with manual file
/// removal.
pub fn generate(catalog: &AssetCatalog, video_dir: &Path) -> Playlist {
    let mut entries = Vec::new();
    for asset in &catalog.assets {
        if !asset.is_enabled {
            continue;
        }
        let path = video_dir.join(&asset.filename);
        if !path.exists() {
            debug!("Skipping '{}': backing file missing", asset.filename);
            continue;
        }
        entries.push(PlaylistEntry {
            path,
            duration: asset.duration,
            name: asset.name.clone(),
        });
    }
    Playlist { entries }
}
