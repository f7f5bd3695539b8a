// Config file handling through the async loader.

use hugoland::config::{Config, StorageBackend};
use tempfile::tempdir;

#[tokio::test]
async fn default_file_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hugoland.toml");
    let path = path.to_str().unwrap();

    Config::create_default(path).await.unwrap();
    let config = Config::load(path).await.unwrap();
    assert_eq!(config.storage.backend, StorageBackend::Sled);
    assert_eq!(config.scheduler.gem_trickle_secs, 60);
    assert_eq!(config.game.market_refresh_minutes, 5);
}

#[tokio::test]
async fn sparse_file_keeps_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sparse.toml");
    tokio::fs::write(&path, "[scheduler]\ngem_trickle_secs = 30\n")
        .await
        .unwrap();

    let config = Config::load(path.to_str().unwrap()).await.unwrap();
    assert_eq!(config.scheduler.gem_trickle_secs, 30);
    assert_eq!(config.scheduler.tick_ms, 1000);
    assert_eq!(config.storage.state_key, "hugoland_game_state");
}

#[tokio::test]
async fn invalid_values_are_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    tokio::fs::write(&path, "[game]\nmarket_refresh_minutes = 0\n")
        .await
        .unwrap();
    let err = Config::load(path.to_str().unwrap()).await.unwrap_err();
    assert!(err.to_string().contains("market_refresh_minutes"));

    assert!(Config::load("/definitely/not/here.toml").await.is_err());
}
