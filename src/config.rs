//! Viewer and renderer settings, read from a JSON file.
//!
//! Every section and field has a default, so a partial file (or none at all) is fine.

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{
    camera::{DEFAULT_FAR, DEFAULT_FOV, DEFAULT_NEAR},
    colour::Colour,
    errors::ConfigError,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// A `log` level name such as `"info"` or `"debug"`.
    pub log_level: String,
    pub window: WindowConfig,
    pub renderer: RendererConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            window: WindowConfig::default(),
            renderer: RendererConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "srender".to_string(),
            width: 1280,
            height: 720,
            fullscreen: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Horizontal field of view in degrees.
    pub field_of_view: f32,
    pub camera_position: Vec3,
    pub near: f32,
    pub far: f32,
    pub clear_colour: Colour,
    pub depth_test: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            field_of_view: DEFAULT_FOV,
            camera_position: Vec3::new(0.0, 0.0, 6.0),
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            clear_colour: Colour::rgb(0.1, 0.1, 0.1),
            depth_test: true,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// `<config dir>/srender/config.json`, if the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("srender").join("config.json"))
    }

    /// Loads `path`, or the default path when `None`. A missing file yields the defaults; a file
    /// that exists but does not parse is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            log::info!("No config directory, using default settings");
            return Ok(Self::default());
        };
        if !path.exists() {
            log::info!("{} not found, using default settings", path.display());
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// The configured level, or `Info` if the name is not recognised.
    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}
