//! Backing store implementations
//!
//! - [`MemoryBackingStore`]: process-local map, for tests and embedding
//! - [`FileBackingStore`]: JSON file on disk, used by the CLI

mod file;
mod memory;

pub use file::FileBackingStore;
pub use memory::MemoryBackingStore;

/// Backing id for a new instance of `factory_pid`
pub(crate) fn new_instance_id(factory_pid: &str) -> String {
    format!("{}-{}", factory_pid, uuid::Uuid::new_v4())
}
