//! End-to-end engine tests: catalog mutations driving the player
//!
//! These run the real mutate → regenerate → restart sequence against a stub
//! player process (`sh`), exercising the contract that catalog changes always
//! restart playback, or leave it stopped when nothing is playable.

use signd::catalog::Asset;
use signd::config::{Config, LoggingConfig, PlayerConfig};
use signd::engine::SignageEngine;
use signd::Error;
use tempfile::TempDir;

/// Engine over a scratch root folder and a stub player
fn setup_engine(dir: &TempDir, script: &str) -> SignageEngine {
    let config = Config::from_root(
        0,
        dir.path().to_path_buf(),
        PlayerConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string(), "player".to_string()],
            grace_period_secs: 1,
        },
        LoggingConfig::default(),
    );
    config.ensure_dirs().unwrap();
    SignageEngine::new(&config)
}

/// Write a backing file and return an asset record for it
fn backed_asset(engine: &SignageEngine, filename: &str, play_order: i64) -> Asset {
    std::fs::write(engine.video_dir().join(filename), b"video bytes").unwrap();
    Asset::new(filename.to_string(), None, 10, true, play_order)
}

fn read_playlist(dir: &TempDir) -> String {
    std::fs::read_to_string(dir.path().join("playlist.m3u")).unwrap()
}

#[tokio::test]
async fn test_upsert_starts_playback() {
    let dir = TempDir::new().unwrap();
    let engine = setup_engine(&dir, "sleep 30");

    let asset = backed_asset(&engine, "promo.mp4", 0);
    engine.upsert_asset(asset).await.unwrap();

    assert!(engine.player_running().await);
    let playlist = read_playlist(&dir);
    assert!(playlist.contains("promo.mp4"));

    engine.shutdown().await;
}

#[tokio::test]
async fn test_removing_last_asset_stops_playback() {
    let dir = TempDir::new().unwrap();
    let engine = setup_engine(&dir, "sleep 30");

    let asset = backed_asset(&engine, "only.mp4", 0);
    engine.upsert_asset(asset).await.unwrap();
    assert!(engine.player_running().await);

    engine.remove_asset("only.mp4").await.unwrap();

    assert!(!engine.player_running().await);
    assert_eq!(read_playlist(&dir), "#EXTM3U\n");
    assert_eq!(engine.asset_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_playlist_follows_play_order() {
    let dir = TempDir::new().unwrap();
    let engine = setup_engine(&dir, "sleep 30");

    let a = backed_asset(&engine, "a.mp4", 2);
    let b = backed_asset(&engine, "b.mp4", 1);
    engine.upsert_asset(a).await.unwrap();
    engine.upsert_asset(b).await.unwrap();

    let playlist = read_playlist(&dir);
    let a_pos = playlist.find("a.mp4").unwrap();
    let b_pos = playlist.find("b.mp4").unwrap();
    assert!(b_pos < a_pos, "b.mp4 (play_order 1) must precede a.mp4");

    let listed: Vec<String> = engine
        .list_assets()
        .await
        .unwrap()
        .into_iter()
        .map(|x| x.filename)
        .collect();
    assert_eq!(listed, vec!["b.mp4".to_string(), "a.mp4".to_string()]);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_disabled_assets_stay_in_catalog_but_not_in_playlist() {
    let dir = TempDir::new().unwrap();
    let engine = setup_engine(&dir, "sleep 30");

    let mut asset = backed_asset(&engine, "off.mp4", 0);
    asset.is_enabled = false;
    engine.upsert_asset(asset).await.unwrap();

    assert_eq!(engine.asset_count().await.unwrap(), 1);
    assert!(!engine.player_running().await);
    assert_eq!(read_playlist(&dir), "#EXTM3U\n");
}

#[tokio::test]
async fn test_remove_unknown_identifier_leaves_catalog_unchanged() {
    let dir = TempDir::new().unwrap();
    let engine = setup_engine(&dir, "sleep 30");

    let asset = backed_asset(&engine, "keep.mp4", 0);
    engine.upsert_asset(asset).await.unwrap();

    let result = engine.remove_asset("no-such-asset").await;
    assert!(matches!(result, Err(Error::NotFound(_))));
    assert_eq!(engine.asset_count().await.unwrap(), 1);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_restart_playback_on_empty_catalog_reports_not_started() {
    let dir = TempDir::new().unwrap();
    let engine = setup_engine(&dir, "sleep 30");

    assert!(!engine.restart_playback().await);
    assert!(!engine.player_running().await);
}

#[tokio::test]
async fn test_mutation_succeeds_even_when_player_cannot_spawn() {
    let dir = TempDir::new().unwrap();
    let config = Config::from_root(
        0,
        dir.path().to_path_buf(),
        PlayerConfig {
            command: "/nonexistent/player-binary".to_string(),
            args: vec![],
            grace_period_secs: 1,
        },
        LoggingConfig::default(),
    );
    config.ensure_dirs().unwrap();
    let engine = SignageEngine::new(&config);

    let asset = backed_asset(&engine, "clip.mp4", 0);
    let stored = engine.upsert_asset(asset).await.unwrap();

    // The catalog mutation reports success; only playback state reflects the failure.
    assert_eq!(stored.filename, "clip.mp4");
    assert_eq!(engine.asset_count().await.unwrap(), 1);
    assert!(!engine.player_running().await);
}

#[tokio::test]
async fn test_upsert_same_filename_replaces_record() {
    let dir = TempDir::new().unwrap();
    let engine = setup_engine(&dir, "sleep 30");

    let first = backed_asset(&engine, "x.mp4", 0);
    engine.upsert_asset(first).await.unwrap();

    let mut second = backed_asset(&engine, "x.mp4", 7);
    second.name = "Replacement".to_string();
    engine.upsert_asset(second).await.unwrap();

    let assets = engine.list_assets().await.unwrap();
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].name, "Replacement");
    assert_eq!(assets[0].play_order, 7);

    engine.shutdown().await;
}
