//! Configuration management

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants;
use crate::error::{Error, Result};
use crate::player::PlayerSettings;

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub player: PlayerConfig,
    pub probe: ProbeConfig,
    pub ui: UiConfig,
    pub catalog: CatalogConfig,
}

/// Retry and monitoring behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Total attempts per play request
    pub max_retries: u32,
    pub load_timeout_ms: u64,
    pub backup_retry_delay_ms: u64,
    pub retry_delay_ms: u64,
    pub health_check_interval_ms: u64,
    /// Starting volume, 0-100
    pub initial_volume: u8,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_retries: constants::MAX_RETRIES,
            load_timeout_ms: millis(constants::LOAD_TIMEOUT),
            backup_retry_delay_ms: millis(constants::BACKUP_RETRY_DELAY),
            retry_delay_ms: millis(constants::RETRY_DELAY),
            health_check_interval_ms: millis(constants::HEALTH_CHECK_INTERVAL),
            initial_volume: constants::DEFAULT_VOLUME,
        }
    }
}

/// Health probe settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub timeout_ms: u64,
    /// Sent with probes and stream requests; some servers reject anonymous clients
    pub user_agent: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: millis(constants::PROBE_TIMEOUT),
            user_agent: constants::USER_AGENT.to_string(),
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Web UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub enabled: bool,
    pub bind_address: String,
    pub http_port: u16,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1".to_string(),
            http_port: constants::DEFAULT_HTTP_PORT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Stations file; falls back to `stations.toml` next to the config file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl AppConfig {
    /// Per-user config file location
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "CommunityRadio", "radio-failover")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Read and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;

        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let player = &self.player;
        if player.max_retries == 0 {
            return Err(Error::Config("player.max_retries must be at least 1".into()));
        }
        if player.initial_volume > 100 {
            return Err(Error::Config(format!(
                "player.initial_volume must be 0-100, got {}",
                player.initial_volume
            )));
        }

        let timeouts = [
            ("player.load_timeout_ms", player.load_timeout_ms),
            ("player.health_check_interval_ms", player.health_check_interval_ms),
            ("probe.timeout_ms", self.probe.timeout_ms),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(Error::Config(format!("{} must be greater than zero", name)));
            }
        }

        Ok(())
    }

    pub fn player_settings(&self) -> PlayerSettings {
        let player = &self.player;
        PlayerSettings {
            max_retries: player.max_retries,
            load_timeout: Duration::from_millis(player.load_timeout_ms),
            backup_retry_delay: Duration::from_millis(player.backup_retry_delay_ms),
            retry_delay: Duration::from_millis(player.retry_delay_ms),
            health_check_interval: Duration::from_millis(player.health_check_interval_ms),
            initial_volume: player.initial_volume,
        }
    }

    /// Stations file to load, given where the config itself lives
    pub fn catalog_path(&self, config_path: &Path) -> PathBuf {
        match &self.catalog.path {
            Some(path) => path.clone(),
            None => config_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("stations.toml"),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_player_settings() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.player_settings(), PlayerSettings::default());
        assert_eq!(config.probe.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [player]
            max_retries = 5

            [ui]
            http_port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.player.max_retries, 5);
        assert_eq!(config.player.load_timeout_ms, 15_000);
        assert_eq!(config.ui.http_port, 9000);
        assert!(config.ui.enabled);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.player.max_retries = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.player.initial_volume = 120;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.probe.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.player.initial_volume = 55;
        config.catalog.path = Some(PathBuf::from("/srv/radio/stations.toml"));
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[player]\nmax_retries = 0\n").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_catalog_path_defaults_next_to_config() {
        let config = AppConfig::default();
        assert_eq!(
            config.catalog_path(Path::new("/etc/radio/config.toml")),
            PathBuf::from("/etc/radio/stations.toml")
        );
    }
}
