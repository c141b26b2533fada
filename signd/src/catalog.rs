//! Persisted asset catalog
//!
//! The catalog is a single human-readable JSON document holding every asset
//! record for the device. It is loaded fully on every read and rewritten in
//! full on every mutation; `AssetStore` is the only writer.
//!
//! Invariants:
//! - filenames are unique across all records,
//! - the stored order is ascending by `play_order` (stable on ties), and is
//!   exactly the playback order.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

fn default_duration() -> u32 {
    10
}

fn default_enabled() -> bool {
    true
}

/// One playable unit: a video file on local storage plus display metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Backing file name inside the video directory; unique within the catalog
    pub filename: String,

    /// Display label
    #[serde(default)]
    pub name: String,

    /// Display duration in seconds
    #[serde(default = "default_duration")]
    pub duration: u32,

    /// Disabled assets stay in the catalog but are excluded from playback
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,

    /// Playback sequence; ties broken by catalog storage order
    #[serde(default)]
    pub play_order: i64,

    /// Set once at creation, never mutated
    pub uploaded_at: DateTime<Utc>,
}

impl Asset {
    /// Create a new record; the display name falls back to the filename
    pub fn new(
        filename: String,
        name: Option<String>,
        duration: u32,
        is_enabled: bool,
        play_order: i64,
    ) -> Self {
        let name = name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| filename.clone());
        Self {
            filename,
            name,
            duration,
            is_enabled,
            play_order,
            uploaded_at: Utc::now(),
        }
    }
}

/// The full persisted collection of assets for the device
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetCatalog {
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl AssetCatalog {
    /// Re-establish the ordering invariant after a mutation
    ///
    /// Stable sort: records sharing a `play_order` keep their storage order.
    pub fn sort_by_play_order(&mut self) {
        self.assets.sort_by_key(|a| a.play_order);
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Owner of the persisted catalog document and the backing video files
#[derive(Debug, Clone)]
pub struct AssetStore {
    catalog_path: PathBuf,
    video_dir: PathBuf,
}

impl AssetStore {
    pub fn new(catalog_path: PathBuf, video_dir: PathBuf) -> Self {
        Self {
            catalog_path,
            video_dir,
        }
    }

    pub fn video_dir(&self) -> &Path {
        &self.video_dir
    }

    /// Load the full catalog
    ///
    /// A missing document yields an empty catalog; a document that exists but
    /// cannot be read or parsed is surfaced as a persistence error, never
    /// silently dropped.
    pub async fn load(&self) -> Result<AssetCatalog> {
        match tokio::fs::read_to_string(&self.catalog_path).await {
            Ok(contents) => {
                let catalog: AssetCatalog = serde_json::from_str(&contents).map_err(|e| {
                    Error::Persistence(format!(
                        "Failed to parse catalog {:?}: {}",
                        self.catalog_path, e
                    ))
                })?;
                Ok(catalog)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AssetCatalog::default()),
            Err(e) => Err(Error::Persistence(format!(
                "Failed to read catalog {:?}: {}",
                self.catalog_path, e
            ))),
        }
    }

    /// Write the full catalog back
    ///
    /// Writes to a sibling temp file and renames it over the document so a
    /// concurrent `load` observes either the old or the new catalog, never a
    /// partial write.
    pub async fn save(&self, catalog: &AssetCatalog) -> Result<()> {
        let contents = serde_json::to_string_pretty(catalog)
            .map_err(|e| Error::Persistence(format!("Failed to serialize catalog: {}", e)))?;

        let tmp_path = self.catalog_path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, contents).await.map_err(|e| {
            Error::Persistence(format!("Failed to write catalog {:?}: {}", tmp_path, e))
        })?;
        tokio::fs::rename(&tmp_path, &self.catalog_path)
            .await
            .map_err(|e| {
                Error::Persistence(format!(
                    "Failed to replace catalog {:?}: {}",
                    self.catalog_path, e
                ))
            })?;

        debug!("Saved catalog with {} assets", catalog.len());
        Ok(())
    }

    /// Insert or replace a record
    ///
    /// Any existing record with the same filename is dropped first, then the
    /// new record is appended and the catalog re-sorted and persisted.
    pub async fn upsert(&self, asset: Asset) -> Result<Asset> {
        let mut catalog = self.load().await?;

        catalog.assets.retain(|a| a.filename != asset.filename);
        catalog.assets.push(asset.clone());
        catalog.sort_by_play_order();

        self.save(&catalog).await?;
        info!(
            "Upserted asset '{}' (play_order {})",
            asset.filename, asset.play_order
        );
        Ok(asset)
    }

    /// Remove a record and its backing file
    ///
    /// The identifier matches by filename first, then by display name as a
    /// fallback; first match in catalog order wins. File removal is
    /// best-effort; record removal is what the operation guarantees.
    pub async fn remove(&self, identifier: &str) -> Result<Asset> {
        let mut catalog = self.load().await?;

        let index = catalog
            .assets
            .iter()
            .position(|a| a.filename == identifier)
            .or_else(|| catalog.assets.iter().position(|a| a.name == identifier))
            .ok_or_else(|| Error::NotFound(format!("No asset matches '{}'", identifier)))?;

        let removed = catalog.assets.remove(index);

        let file_path = self.video_dir.join(&removed.filename);
        if let Err(e) = tokio::fs::remove_file(&file_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove backing file {:?}: {}", file_path, e);
            }
        }

        self.save(&catalog).await?;
        info!("Removed asset '{}'", removed.filename);
        Ok(removed)
    }
}
