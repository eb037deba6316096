//! Runtime wiring shared by commands
//!
//! Resolves the runtime configuration, the master key, the snapshot store
//! and the file-backed configuration service.

use anyhow::{Context as _, Result};
use camino::{Utf8Path, Utf8PathBuf};
use snapvault_core::{HierarchicalConfigLoader, RuntimeConfig};
use snapvault_secrets::{ChaChaCryptoService, MasterKey};
use snapvault_service::{ConfigurationService, FileBackingStore};
use snapvault_store::SnapshotStore;
use std::sync::Arc;
use tracing::{debug, info};

pub struct Context {
    loader: HierarchicalConfigLoader,
    config: RuntimeConfig,
}

impl Context {
    /// Load the runtime configuration from `config_dir` or ~/.snapvault
    pub fn load(config_dir: Option<&Utf8Path>) -> Result<Self> {
        let loader = match config_dir {
            Some(dir) => HierarchicalConfigLoader::with_dir(dir.to_owned()),
            None => HierarchicalConfigLoader::new()?,
        };
        let config = loader
            .load_runtime_config()
            .context("Failed to load runtime configuration")?;
        debug!("Using config directory {}", loader.config_dir());

        Ok(Self { loader, config })
    }

    pub fn key_file(&self) -> Utf8PathBuf {
        self.loader.resolve_path(&self.config.crypto.key_file)
    }

    pub fn snapshot_dir(&self) -> Utf8PathBuf {
        self.loader.resolve_path(&self.config.snapshots.directory)
    }

    pub fn backing_store_path(&self) -> Utf8PathBuf {
        self.loader.resolve_path(&self.config.backing_store.path)
    }

    /// Open the snapshot store with the configured master key
    pub fn open_store(&self) -> Result<SnapshotStore> {
        let key_file = self.key_file();
        let key = MasterKey::resolve(&key_file).with_context(|| {
            format!(
                "Failed to load master key from {} (run `snapvault key generate` first)",
                key_file
            )
        })?;
        let crypto = Arc::new(ChaChaCryptoService::new(&key));

        Ok(SnapshotStore::new(
            self.snapshot_dir(),
            self.config.snapshots.max_count,
            crypto,
        ))
    }

    /// Open the configuration service over the file backing store
    ///
    /// An empty live store is restored from the latest snapshot.
    pub async fn open_service(&self) -> Result<ConfigurationService> {
        let store = self.open_store()?;
        let backing = Arc::new(FileBackingStore::new(self.backing_store_path()));
        let service = ConfigurationService::new(store, backing);

        let known = service
            .refresh_registry()
            .await
            .context("Failed to read backing store")?;
        if known == 0 {
            if let Some(id) = service.activate().await? {
                info!("Restored live configuration from snapshot {}", id);
            }
        }
        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use snapvault_core::ComponentConfiguration;
    use tempfile::TempDir;

    fn create_context() -> (Context, TempDir) {
        let temp = TempDir::new().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        (Context::load(Some(&dir)).unwrap(), temp)
    }

    #[test]
    #[serial]
    fn test_paths_resolve_against_config_dir() {
        let (ctx, temp) = create_context();
        let root = Utf8Path::from_path(temp.path()).unwrap();

        assert_eq!(ctx.snapshot_dir(), root.join("snapshots"));
        assert_eq!(ctx.key_file(), root.join("snapvault.key"));
        assert_eq!(ctx.backing_store_path(), root.join("backing-store.json"));
    }

    #[test]
    #[serial]
    fn test_open_store_requires_key() {
        let (ctx, _temp) = create_context();
        let err = ctx.open_store().err().unwrap();
        assert!(err.to_string().contains("snapvault key generate"));
    }

    #[tokio::test]
    #[serial]
    async fn test_open_service_restores_empty_backing_store() {
        let (ctx, _temp) = create_context();
        MasterKey::generate()
            .write_key_file(&ctx.key_file(), false)
            .unwrap();

        let store = ctx.open_store().unwrap();
        store
            .save(&[ComponentConfiguration::new("org.example.Logger").with_property("level", "WARN")])
            .unwrap();

        let service = ctx.open_service().await.unwrap();
        assert_eq!(
            service.configurable_component_pids().await,
            vec!["org.example.Logger"]
        );
        assert!(ctx.backing_store_path().exists());
    }
}
