//! CLI command implementations

pub mod component;
pub mod key;
pub mod rollback;
pub mod snapshot;
pub mod version;
