//! Signage engine: catalog mutations driving playback
//!
//! Every mutating catalog operation runs the same synchronous sequence before
//! reporting success: mutate the store, regenerate the playlist from a fresh
//! catalog load, restart the player (or leave it stopped when there is
//! nothing to play). An engine-level mutex serializes the whole sequence so a
//! restart always observes the catalog state its mutation produced.
//!
//! Playback failures are recovered by the supervisor and never fail the
//! catalog operation that triggered them.

use crate::catalog::{Asset, AssetStore};
use crate::config::Config;
use crate::error::Result;
use crate::player::PlayerSupervisor;
use crate::playlist;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::error;

pub struct SignageEngine {
    store: AssetStore,
    player: PlayerSupervisor,
    video_dir: PathBuf,
    op_lock: Mutex<()>,
}

impl SignageEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            store: AssetStore::new(config.catalog_path.clone(), config.video_dir.clone()),
            player: PlayerSupervisor::new(config.player.clone(), config.playlist_path.clone()),
            video_dir: config.video_dir.clone(),
            op_lock: Mutex::new(()),
        }
    }

    pub fn video_dir(&self) -> &Path {
        &self.video_dir
    }

    /// Read-only catalog view, in playback order
    pub async fn list_assets(&self) -> Result<Vec<Asset>> {
        Ok(self.store.load().await?.assets)
    }

    pub async fn asset_count(&self) -> Result<usize> {
        Ok(self.store.load().await?.len())
    }

    /// Insert or replace an asset, then restart playback over the new catalog
    pub async fn upsert_asset(&self, asset: Asset) -> Result<Asset> {
        let _guard = self.op_lock.lock().await;
        let stored = self.store.upsert(asset).await?;
        self.regenerate_and_restart().await;
        Ok(stored)
    }

    /// Remove an asset (and its backing file), then restart playback
    ///
    /// `NotFound` propagates; playback failures do not.
    pub async fn remove_asset(&self, identifier: &str) -> Result<Asset> {
        let _guard = self.op_lock.lock().await;
        let removed = self.store.remove(identifier).await?;
        self.regenerate_and_restart().await;
        Ok(removed)
    }

    /// Regenerate the playlist from the current catalog and restart the player
    ///
    /// Returns true iff the player is running afterwards.
    pub async fn restart_playback(&self) -> bool {
        let _guard = self.op_lock.lock().await;
        self.regenerate_and_restart().await
    }

    /// Lazily-checked player liveness
    pub async fn player_running(&self) -> bool {
        self.player.currently_running().await
    }

    /// Stop playback for daemon shutdown
    pub async fn shutdown(&self) {
        let _guard = self.op_lock.lock().await;
        self.player.stop().await;
    }

    async fn regenerate_and_restart(&self) -> bool {
        let catalog = match self.store.load().await {
            Ok(catalog) => catalog,
            Err(e) => {
                // Playback state is decoupled from catalog operations; a
                // catalog that cannot be re-read here only means no restart.
                error!("Failed to load catalog for restart: {}", e);
                return false;
            }
        };
        let playlist = playlist::generate(&catalog, &self.video_dir);
        self.player.restart(&playlist).await
    }
}
