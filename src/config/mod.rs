//! # Configuration Management Module
//!
//! TOML configuration for the Hugoland engine and its CLI.
//!
//! ## Configuration Structure
//!
//! - [`StorageConfig`] - where and how the save blob is kept
//! - [`SchedulerConfig`] - tick rate and per-task intervals of the background systems
//! - [`GameConfig`] - tunables applied to the game state at startup
//! - [`LoggingConfig`] - log level and optional log file
//!
//! Every section and field is optional in the file; anything missing takes its default.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hugoland::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("hugoland.toml").await?;
//!     let config = Config::load("hugoland.toml").await?;
//!     println!("Saves live in {}", config.storage.data_dir);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [storage]
//! data_dir = "./data"
//! state_key = "hugoland_game_state"
//! backend = "sled"
//!
//! [scheduler]
//! tick_ms = 1000
//! gem_trickle_secs = 60
//!
//! [game]
//! max_offline_hours = 8
//! market_refresh_minutes = 5
//!
//! [logging]
//! level = "info"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub scheduler: SchedulerConfig,
    pub game: GameConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Sled database under `data_dir`.
    #[default]
    Sled,
    /// Process-local map; nothing survives a restart.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Key under which the save blob is stored.
    pub state_key: String,
    pub backend: StorageBackend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            state_key: "hugoland_game_state".to_string(),
            backend: StorageBackend::Sled,
        }
    }
}

impl StorageConfig {
    /// Directory of the sled database.
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("hugoland.sled")
    }
}

/// Intervals of the background systems. All values in seconds except `tick_ms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How often the runtime checks for due tasks.
    pub tick_ms: u64,
    pub play_time_secs: u64,
    pub gem_trickle_secs: u64,
    pub garden_secs: u64,
    pub market_secs: u64,
    pub daily_reward_secs: u64,
    pub time_attack_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            play_time_secs: 1,
            gem_trickle_secs: 60,
            garden_secs: 60,
            market_secs: 1,
            daily_reward_secs: 60,
            time_attack_secs: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Cap on credited offline time.
    pub max_offline_hours: u32,
    /// Lifetime of one set of market offers.
    pub market_refresh_minutes: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_offline_hours: 8,
            market_refresh_minutes: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject values that would stall the scheduler or make saves unaddressable.
    pub fn validate(&self) -> Result<()> {
        if self.storage.state_key.trim().is_empty() {
            return Err(anyhow!("storage.state_key must not be empty"));
        }
        let s = &self.scheduler;
        let intervals = [
            ("tick_ms", s.tick_ms),
            ("play_time_secs", s.play_time_secs),
            ("gem_trickle_secs", s.gem_trickle_secs),
            ("garden_secs", s.garden_secs),
            ("market_secs", s.market_secs),
            ("daily_reward_secs", s.daily_reward_secs),
            ("time_attack_secs", s.time_attack_secs),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, v)| *v == 0) {
            return Err(anyhow!("scheduler.{} must be greater than zero", name));
        }
        if self.game.market_refresh_minutes == 0 {
            return Err(anyhow!("game.market_refresh_minutes must be greater than zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.storage.backend, StorageBackend::Sled);
        assert_eq!(config.scheduler.gem_trickle_secs, 60);
        assert_eq!(config.game.max_offline_hours, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            backend = "memory"

            [game]
            max_offline_hours = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.state_key, "hugoland_game_state");
        assert_eq!(config.game.max_offline_hours, 2);
        assert_eq!(config.game.market_refresh_minutes, 5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = Config::default();
        config.scheduler.garden_secs = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("garden_secs"));
    }

    #[test]
    fn test_round_trip_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.storage.data_dir, config.storage.data_dir);
        assert_eq!(back.scheduler.tick_ms, config.scheduler.tick_ms);
    }
}
