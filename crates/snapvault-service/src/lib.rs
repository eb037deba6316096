//! Configuration orchestration for Snapvault
//!
//! Composes the snapshot store, the secret codec and the default merge
//! engine behind [`ConfigurationService`], which keeps a live backing store
//! and the durable snapshot history in step.
//!
//! # Examples
//!
//! ```no_run
//! use snapvault_secrets::{ChaChaCryptoService, MasterKey};
//! use snapvault_service::{ConfigurationService, MemoryBackingStore};
//! use snapvault_store::SnapshotStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> snapvault_core::Result<()> {
//! let crypto = Arc::new(ChaChaCryptoService::new(&MasterKey::generate()));
//! let store = SnapshotStore::new("/var/lib/snapvault/snapshots", 10, crypto);
//! let service = ConfigurationService::new(store, Arc::new(MemoryBackingStore::new()));
//!
//! service.activate().await?;
//! service
//!     .create_factory_configuration("org.example.Broker", "broker-1", None, true)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod backing;
pub mod defaults;
pub mod orchestrator;
pub mod registry;

pub use backing::{FileBackingStore, MemoryBackingStore};
pub use defaults::{default_properties, merge_with_defaults};
pub use orchestrator::ConfigurationService;
pub use registry::Registry;
