use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub osd: OsdConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsdConfig {
    /// Seconds of inactivity before the transport bar hides itself.
    #[serde(default = "default_auto_hide_secs")]
    pub auto_hide_secs: u64,

    /// Refresh cadence for the paused-status and clock overlays.
    #[serde(default = "default_paused_refresh_ms")]
    pub paused_refresh_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_volume_step")]
    pub volume_step: i64,

    #[serde(default)]
    pub mpv_verbose_logging: bool,

    #[serde(default = "default_cache_size_mb")]
    pub mpv_cache_size_mb: u32,

    #[serde(default = "default_cache_backbuffer_mb")]
    pub mpv_cache_backbuffer_mb: u32,

    #[serde(default = "default_cache_secs")]
    pub mpv_cache_secs: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_image_cache_capacity")]
    pub image_cache_capacity: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            debug!("Loading config from {:?}", config_path);
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
            info!("Config loaded successfully");
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, contents).context("Failed to write config file")?;

        debug!("Config saved to {:?}", config_path);
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(config_dir.join("clicker").join("config.toml"))
    }
}

impl Default for OsdConfig {
    fn default() -> Self {
        Self {
            auto_hide_secs: default_auto_hide_secs(),
            paused_refresh_ms: default_paused_refresh_ms(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            volume_step: default_volume_step(),
            mpv_verbose_logging: false,
            mpv_cache_size_mb: default_cache_size_mb(),
            mpv_cache_backbuffer_mb: default_cache_backbuffer_mb(),
            mpv_cache_secs: default_cache_secs(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_timeout(),
            image_cache_capacity: default_image_cache_capacity(),
        }
    }
}

// Default value functions
fn default_auto_hide_secs() -> u64 {
    4
}
fn default_paused_refresh_ms() -> u64 {
    1000
}
fn default_volume_step() -> i64 {
    5
}
fn default_cache_size_mb() -> u32 {
    150
}
fn default_cache_backbuffer_mb() -> u32 {
    50
}
fn default_cache_secs() -> u32 {
    30
}
fn default_timeout() -> u64 {
    30
}
fn default_image_cache_capacity() -> usize {
    64
}
