//! Configuration file handling for scanloop.
//!
//! Loads configuration from `<config_dir>/scanloop/config.toml` or a custom path.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::camera::CameraConfig;
use crate::decode::ScanStrategy;

/// Configuration file structure for scanloop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub decode: DecodeConfig,
}

/// The `[decode]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    pub strategy: ScanStrategy,
    /// Power-of-two downscale factor applied before decoding.
    pub scale: u32,
    /// Framing rectangle margin as a fraction of each preview dimension.
    pub margin: f32,
    /// Restrict decoding to the framing rectangle.
    pub crop: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            strategy: ScanStrategy::Normal,
            scale: 1,
            margin: 0.1,
            crop: false,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            source: e,
        })?;
        if !config.decode.scale.is_power_of_two() {
            return Err(ConfigError::Invalid {
                path,
                message: format!("decode.scale must be a power of two, got {}", config.decode.scale),
            });
        }
        Ok(config)
    }

    /// Render as TOML, the same format [`Config::load`] reads.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid config file '{}': {message}", .path.display())]
    Invalid { path: PathBuf, message: String },
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("scanloop").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/scanloop/config.toml")
        })
}
