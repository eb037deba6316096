//! Contracts for the collaborators this subsystem depends on
//!
//! The symmetric cipher, the record serializer and the live backing store are
//! injected. Production implementations live in `snapvault-secrets`,
//! `snapvault-store` and `snapvault-service`.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ComponentConfiguration, Properties};

/// Symmetric cipher used for whole-file and per-secret encryption
///
/// Both directions are fallible: a wrong key or corrupt input yields an error.
/// Implementations never persist key material through this interface.
pub trait CryptoService: Send + Sync {
    fn encrypt(&self, plain: &[u8]) -> Result<Vec<u8>>;

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Serializer for a list of component configurations
pub trait ConfigSerializer: Send + Sync {
    fn marshal(&self, configs: &[ComponentConfiguration]) -> Result<Vec<u8>>;

    fn unmarshal(&self, bytes: &[u8]) -> Result<Vec<ComponentConfiguration>>;
}

/// Live configuration held by the backing store for one instance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackingEntry {
    /// Factory the instance was created from, if any
    pub factory_pid: Option<String>,

    pub properties: Properties,
}

/// Store holding the currently active configuration of each component
///
/// Identifiers are backing-store ids; they may differ from component pids
/// for factory instances.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Current entry for an id, `None` when unknown
    async fn get(&self, id: &str) -> Result<Option<BackingEntry>>;

    /// Replace the properties of an id, creating a singleton entry if needed
    async fn set(&self, id: &str, properties: Properties) -> Result<()>;

    /// Create a new instance of a factory, returning its id
    async fn create(&self, factory_pid: &str) -> Result<String>;

    async fn delete(&self, id: &str) -> Result<()>;

    async fn list(&self) -> Result<Vec<String>>;

    /// Get the store name (for logging)
    fn name(&self) -> &'static str;
}
