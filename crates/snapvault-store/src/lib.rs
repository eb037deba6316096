//! Encrypted configuration snapshots for Snapvault
//!
//! This crate provides:
//! - Monotonic snapshot id allocation, robust to wall clock regression
//! - Atomic, whole-file encrypted snapshot writes with per-secret encryption
//! - Listing and loading, including a newest-first recovery sweep
//! - In-place migration of legacy plaintext snapshots
//! - Retention with a protected baseline snapshot
//!
//! # Examples
//!
//! ```no_run
//! use snapvault_core::ComponentConfiguration;
//! use snapvault_secrets::{ChaChaCryptoService, MasterKey};
//! use snapvault_store::SnapshotStore;
//! use std::sync::Arc;
//!
//! # fn example() -> snapvault_core::Result<()> {
//! let crypto = Arc::new(ChaChaCryptoService::new(&MasterKey::generate()));
//! let store = SnapshotStore::new("/var/lib/snapvault/snapshots", 10, crypto);
//!
//! let id = store.save(&[ComponentConfiguration::new("org.example.Broker")])?;
//! let configs = store.load(id)?;
//! # Ok(())
//! # }
//! ```

mod migration;
pub mod retention;
pub mod serializer;
pub mod store;

pub use retention::BASELINE_ID;
pub use serializer::JsonSerializer;
pub use store::SnapshotStore;
