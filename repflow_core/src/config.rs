//! Configuration file support for repflow.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/repflow/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub progression: ProgressionConfig,

    #[serde(default)]
    pub timer: TimerConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Auto-fill progression parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressionConfig {
    /// Per-round weight increment for pound units
    #[serde(default = "default_pound_increment")]
    pub pound_increment: f64,

    /// Per-round weight increment for kilogram units
    #[serde(default = "default_kilogram_increment")]
    pub kilogram_increment: f64,

    /// Per-round rep decrement for descending rep fills
    #[serde(default = "default_rep_decrement")]
    pub rep_decrement: u32,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            pound_increment: default_pound_increment(),
            kilogram_increment: default_kilogram_increment(),
            rep_decrement: default_rep_decrement(),
        }
    }
}

/// Rest timer configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Seconds used when a rest duration string cannot be parsed
    #[serde(default = "default_fallback_seconds")]
    pub fallback_seconds: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            fallback_seconds: default_fallback_seconds(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").expect("HOME environment variable not set");
        PathBuf::from(home).join(".local/share")
    });
    base.join("repflow")
}

fn default_pound_increment() -> f64 {
    10.0
}

fn default_kilogram_increment() -> f64 {
    5.0
}

fn default_rep_decrement() -> u32 {
    1
}

fn default_fallback_seconds() -> u32 {
    60
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").expect("HOME environment variable not set");
            PathBuf::from(home).join(".config")
        });
        base.join("repflow").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
