//! Shared helpers for snapshot store tests

#![allow(dead_code)]

use camino::Utf8PathBuf;
use snapvault_core::{ComponentConfiguration, ConfigSerializer, CryptoService, ManualClock};
use snapvault_secrets::{ChaChaCryptoService, MasterKey};
use snapvault_store::{JsonSerializer, SnapshotStore};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

/// Clock start used by every test store
pub const START_MILLIS: u64 = 1_700_000_000_000;

pub struct TestStore {
    pub store: SnapshotStore,
    pub crypto: Arc<ChaChaCryptoService>,
    pub clock: Arc<ManualClock>,
    pub dir: Utf8PathBuf,
    _temp: TempDir,
}

/// Create a store in a fresh temp directory
pub fn create_test_store(max_count: usize) -> TestStore {
    let temp = TempDir::new().unwrap();
    let dir = Utf8PathBuf::from_path_buf(temp.path().join("snapshots")).unwrap();
    let crypto = Arc::new(ChaChaCryptoService::new(&MasterKey::generate()));
    let clock = Arc::new(ManualClock::new(START_MILLIS));
    let store = SnapshotStore::new(dir.clone(), max_count, crypto.clone()).with_clock(clock.clone());

    TestStore {
        store,
        crypto,
        clock,
        dir,
        _temp: temp,
    }
}

/// Write a legacy plaintext snapshot file
pub fn write_plain_snapshot(dir: &Utf8PathBuf, id: u64, configs: &[ComponentConfiguration]) {
    fs::create_dir_all(dir).unwrap();
    let bytes = JsonSerializer.marshal(configs).unwrap();
    fs::write(dir.join(format!("snapshot_{}.xml", id)), bytes).unwrap();
}

/// Decrypt a snapshot file without revealing its secrets
pub fn read_raw_snapshot(
    test: &TestStore,
    id: u64,
) -> Vec<ComponentConfiguration> {
    let raw = fs::read(test.dir.join(format!("snapshot_{}.xml", id))).unwrap();
    let decrypted = test.crypto.decrypt(&raw).unwrap();
    JsonSerializer.unmarshal(&decrypted).unwrap()
}

pub fn sample_config(pid: &str) -> ComponentConfiguration {
    ComponentConfiguration::new(pid).with_property("name", pid)
}
