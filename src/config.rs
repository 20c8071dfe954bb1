// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// Every field has a default, so a missing file or a partial file both work.
// The build profile still has the last word on validation layers.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::backend::GpuSelection;

pub const CONFIG_PATH: &str = "config.toml";

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub debug: DebugConfig,
    pub gpu: GpuConfig,
}

/// Window settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan".to_string(),
            width: 800,
            height: 600,
            resizable: false,
        }
    }
}

/// Debug settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Only honoured in debug builds
    pub validation_layers: bool,
    /// env_logger filter, e.g. "debug" or "vulkan_bringup=debug,vulkan=warn"
    pub log_level: Option<String>,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation_layers: true,
            log_level: None,
        }
    }
}

/// GPU selection
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct GpuConfig {
    pub selection: GpuSelection,
}

impl Config {
    /// Load configuration from a specific path. `Ok(None)` if the file does not exist.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(Some(config))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.window.title, "Vulkan");
        assert_eq!((config.window.width, config.window.height), (800, 600));
        assert!(!config.window.resizable);
        assert!(config.debug.validation_layers);
        assert_eq!(config.debug.log_level, None);
        assert_eq!(config.gpu.selection, GpuSelection::FirstSuitable);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            r#"
            [window]
            title = "Bring-up"

            [gpu]
            selection = "prefer_discrete"
            "#,
        )
        .unwrap();

        assert_eq!(config.window.title, "Bring-up");
        assert_eq!(config.window.width, 800);
        assert_eq!(config.gpu.selection, GpuSelection::PreferDiscrete);
        assert!(config.debug.validation_layers);
    }

    #[test]
    fn debug_section_parses() {
        let config = Config::from_toml(
            r#"
            [debug]
            validation_layers = false
            log_level = "debug"
            "#,
        )
        .unwrap();

        assert!(!config.debug.validation_layers);
        assert_eq!(config.debug.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn unknown_gpu_policy_is_rejected() {
        assert!(Config::from_toml("[gpu]\nselection = \"fastest\"").is_err());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let loaded = Config::load_from_path("definitely/not/here/config.toml").unwrap();
        assert!(loaded.is_none());
    }
}
