//! Runtime configuration types
//!
//! These types define where snapshots live, how many are retained, and where
//! key material and the live backing store are kept.

use serde::{Deserialize, Serialize};

/// Runtime configuration for snapvault
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeConfig {
    /// Snapshot directory and retention
    #[serde(default)]
    pub snapshots: SnapshotConfig,

    /// Key material location
    #[serde(default)]
    pub crypto: CryptoConfig,

    /// Live configuration store
    #[serde(default)]
    pub backing_store: BackingStoreConfig,
}

/// Snapshot storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct SnapshotConfig {
    /// Snapshot directory (relative paths resolve against the config dir)
    #[serde(default = "default_snapshot_directory")]
    pub directory: String,

    /// Number of snapshots to retain, baseline included
    #[serde(default = "default_max_count")]
    pub max_count: usize,
}

fn default_snapshot_directory() -> String {
    "snapshots".to_string()
}

fn default_max_count() -> usize {
    10
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            directory: default_snapshot_directory(),
            max_count: default_max_count(),
        }
    }
}

/// Crypto configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct CryptoConfig {
    /// File holding the base64 encoded 256-bit key
    #[serde(default = "default_key_file")]
    pub key_file: String,
}

fn default_key_file() -> String {
    "snapvault.key".to_string()
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            key_file: default_key_file(),
        }
    }
}

/// Backing store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct BackingStoreConfig {
    #[serde(default = "default_backing_store_path")]
    pub path: String,
}

fn default_backing_store_path() -> String {
    "backing-store.json".to_string()
}

impl Default for BackingStoreConfig {
    fn default() -> Self {
        Self {
            path: default_backing_store_path(),
        }
    }
}
