//! # snapvault-core
//!
//! Core library for Snapvault providing:
//! - The component configuration data model and attribute schemas
//! - The error taxonomy shared by every crate
//! - Contracts for the crypto, serializer and backing-store collaborators
//! - Runtime configuration loading (embedded defaults, file, environment)

pub mod clock;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use collaborators::{BackingEntry, BackingStore, ConfigSerializer, CryptoService};
pub use config::HierarchicalConfigLoader;
pub use error::{Error, Result};
pub use types::{
    AttributeDefinition, AttributeSchema, ComponentConfiguration, Properties, PropertyValue,
    RuntimeConfig, Scalar, Secret, SERVICE_PID_KEY,
};
