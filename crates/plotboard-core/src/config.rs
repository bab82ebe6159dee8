//! Session configuration, loadable from TOML.

use crate::snap::GridConfig;
use crate::viewport::{MAX_ZOOM, MIN_ZOOM};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to encode configuration: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Tunables for an editing session. Every field has a default, so a TOML
/// file only needs the keys it wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub grid: GridConfig,
    /// Offset applied to copies made by `duplicate`.
    pub duplicate_offset: f64,
    /// Gap between a shape and its copy in duplicate-and-connect.
    pub connect_gap: f64,
    /// How close (scene units) a dragged line point must come to an anchor to attach.
    pub anchor_snap_radius: f64,
    /// Line hit-test tolerance in scene units.
    pub hit_tolerance: f64,
    pub max_history: Option<usize>,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            duplicate_offset: 20.0,
            connect_gap: 80.0,
            anchor_snap_radius: 12.0,
            hit_tolerance: 4.0,
            max_history: None,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
        }
    }
}

impl SessionConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Write configuration as pretty TOML.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("Saved configuration to {}", path.display());
        Ok(())
    }
}
