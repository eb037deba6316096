//! Shared fixtures for configuration service tests

#![allow(dead_code)]

pub mod mocks;

use camino::Utf8PathBuf;
use snapvault_core::{
    AttributeDefinition, AttributeSchema, BackingStore, ManualClock, Properties, PropertyValue,
    Scalar, SERVICE_PID_KEY,
};
use snapvault_secrets::{ChaChaCryptoService, MasterKey};
use snapvault_service::ConfigurationService;
use snapvault_store::SnapshotStore;
use std::sync::Arc;
use tempfile::TempDir;

pub const BROKER_FACTORY: &str = "org.example.Broker";
pub const LOGGER_PID: &str = "org.example.Logger";

pub struct TestContext<B> {
    pub service: ConfigurationService,
    pub backing: Arc<B>,
    pub crypto: Arc<ChaChaCryptoService>,
    pub clock: Arc<ManualClock>,
    pub dir: Utf8PathBuf,
    _temp: TempDir,
}

impl<B: BackingStore + 'static> TestContext<B> {
    pub fn new(backing: Arc<B>) -> Self {
        let temp = TempDir::new().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().join("snapshots")).unwrap();
        let crypto = Arc::new(ChaChaCryptoService::new(&MasterKey::generate()));
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));

        let store = SnapshotStore::new(dir.clone(), 10, crypto.clone()).with_clock(clock.clone());
        let service = ConfigurationService::new(store, backing.clone());

        Self {
            service,
            backing,
            crypto,
            clock,
            dir,
            _temp: temp,
        }
    }

    /// Another store over the same snapshot directory and key
    pub fn shared_store(&self) -> SnapshotStore {
        SnapshotStore::new(self.dir.clone(), 10, self.crypto.clone()).with_clock(self.clock.clone())
    }

    /// Backing id holding the configuration of `pid`
    pub async fn service_pid_for(&self, pid: &str) -> Option<String> {
        for id in self.backing.list().await.unwrap() {
            let entry = self.backing.get(&id).await.unwrap()?;
            if entry.properties.get(SERVICE_PID_KEY).and_then(PropertyValue::as_str) == Some(pid) {
                return Some(id);
            }
        }
        None
    }

    /// Live properties of `pid`
    pub async fn live_properties(&self, pid: &str) -> Properties {
        let id = self.service_pid_for(pid).await.unwrap();
        self.backing.get(&id).await.unwrap().unwrap().properties
    }
}

pub fn broker_schema() -> AttributeSchema {
    AttributeSchema::new(BROKER_FACTORY, "Broker")
        .with_attribute(AttributeDefinition::new("host", Scalar::String).with_default("localhost"))
        .with_attribute(AttributeDefinition::new("port", Scalar::Integer).with_default("1883"))
        .with_attribute(AttributeDefinition::new("password", Scalar::Password))
}

pub fn logger_schema() -> AttributeSchema {
    AttributeSchema::new(LOGGER_PID, "Logger")
        .with_attribute(AttributeDefinition::new("level", Scalar::String).with_default("INFO"))
}

pub fn props(entries: &[(&str, PropertyValue)]) -> Properties {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}
