//! Hierarchical configuration loader with precedence
//!
//! Loads configuration from multiple sources with the following precedence (low to high):
//! 1. Embedded defaults (built into binary)
//! 2. Config file (~/.snapvault/snapvault.yaml)
//! 3. Environment variables (SNAPVAULT_* prefix)
//! 4. CLI flags (handled by caller)

use crate::error::{Error, Result};
use crate::types::RuntimeConfig;
use camino::{Utf8Path, Utf8PathBuf};
use rust_embed::RustEmbed;
use serde::de::DeserializeOwned;
use std::env;
use std::fs;

/// Name of the runtime config file inside the config directory
pub const CONFIG_FILE_NAME: &str = "snapvault.yaml";

/// Embedded configuration files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/config/"]
#[prefix = ""]
struct EmbeddedConfigs;

/// Configuration hierarchy loader
pub struct HierarchicalConfigLoader {
    /// Base directory for configuration files
    config_dir: Utf8PathBuf,
}

impl HierarchicalConfigLoader {
    /// Create a new hierarchical config loader rooted at ~/.snapvault
    pub fn new() -> Result<Self> {
        let config_dir = Self::default_config_dir()?;
        Ok(Self { config_dir })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: Utf8PathBuf) -> Self {
        Self { config_dir }
    }

    /// Get the standard config directory (~/.snapvault)
    fn default_config_dir() -> Result<Utf8PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::invalid_config("Could not determine home directory"))?;
        let home = Utf8PathBuf::from_path_buf(home)
            .map_err(|_| Error::invalid_config("Home directory is not valid UTF-8"))?;
        Ok(home.join(".snapvault"))
    }

    /// Load runtime configuration with hierarchical precedence
    pub fn load_runtime_config(&self) -> Result<RuntimeConfig> {
        let mut config = Self::load_embedded_config::<RuntimeConfig>("runtime-defaults.yaml")?;

        // Every field carries a serde default, so a partial file falls back
        // to the built-in values field by field.
        let config_path = self.config_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            tracing::debug!("Loading runtime config from {}", config_path);
            config = self.load_yaml_file::<RuntimeConfig>(&config_path)?;
        }

        config = self.apply_env_overrides(config)?;

        if config.snapshots.directory.trim().is_empty() {
            return Err(Error::invalid_config("snapshots.directory must not be empty"));
        }

        Ok(config)
    }

    /// Load an embedded configuration file
    fn load_embedded_config<T: DeserializeOwned>(filename: &str) -> Result<T> {
        let embedded_file = EmbeddedConfigs::get(filename).ok_or_else(|| {
            Error::config_not_found(format!("Embedded config not found: {}", filename))
        })?;

        let content = std::str::from_utf8(&embedded_file.data).map_err(|_| {
            Error::invalid_config(format!("Invalid UTF-8 in embedded config: {}", filename))
        })?;

        serde_yaml_ng::from_str(content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse embedded config {}: {}",
                filename, e
            ))
        })
    }

    /// Load a YAML file and parse it
    fn load_yaml_file<T: DeserializeOwned>(&self, path: &Utf8Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))
    }

    /// Apply environment variable overrides to runtime config
    fn apply_env_overrides(&self, mut config: RuntimeConfig) -> Result<RuntimeConfig> {
        if let Ok(val) = env::var("SNAPVAULT_SNAPSHOT_DIR") {
            config.snapshots.directory = val;
        }

        if let Ok(val) = env::var("SNAPVAULT_SNAPSHOT_COUNT") {
            tracing::debug!("Snapshot count overridden by environment: {}", val);
            config.snapshots.max_count = val.parse().map_err(|_| {
                Error::invalid_config("SNAPVAULT_SNAPSHOT_COUNT must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("SNAPVAULT_KEY_FILE") {
            config.crypto.key_file = val;
        }

        if let Ok(val) = env::var("SNAPVAULT_BACKING_STORE") {
            config.backing_store.path = val;
        }

        Ok(config)
    }

    /// Resolve a configured path against the config directory
    ///
    /// Absolute paths are kept, `~/` expands to the home directory.
    pub fn resolve_path(&self, path: &str) -> Utf8PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir().and_then(|h| Utf8PathBuf::from_path_buf(h).ok()) {
                return home.join(rest);
            }
        }

        let path = Utf8PathBuf::from(path);
        if path.is_absolute() {
            path
        } else {
            self.config_dir.join(path)
        }
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}
