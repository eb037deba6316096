//! Hand-written backing store doubles

use async_trait::async_trait;
use snapvault_core::{BackingEntry, BackingStore, Error, Properties, Result};
use snapvault_service::MemoryBackingStore;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Memory backing store whose writes fail for selected ids
#[derive(Default)]
pub struct FailingBackingStore {
    inner: MemoryBackingStore,
    failing_ids: Arc<Mutex<HashSet<String>>>,
    failing_factories: Arc<Mutex<HashSet<String>>>,
}

impl FailingBackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes_to(&self, id: &str) {
        self.failing_ids.lock().unwrap().insert(id.to_string());
    }

    /// Reject property writes to every instance of `factory_pid`
    ///
    /// Deleting those instances still works.
    pub fn fail_writes_to_instances_of(&self, factory_pid: &str) {
        self.failing_factories
            .lock()
            .unwrap()
            .insert(factory_pid.to_string());
    }

    pub fn heal(&self) {
        self.failing_ids.lock().unwrap().clear();
        self.failing_factories.lock().unwrap().clear();
    }

    fn check(&self, id: &str) -> Result<()> {
        if self.failing_ids.lock().unwrap().contains(id) {
            return Err(Error::backing_store(id, "write rejected"));
        }
        Ok(())
    }
}

#[async_trait]
impl BackingStore for FailingBackingStore {
    async fn get(&self, id: &str) -> Result<Option<BackingEntry>> {
        self.inner.get(id).await
    }

    async fn set(&self, id: &str, properties: Properties) -> Result<()> {
        self.check(id)?;
        if let Some(entry) = self.inner.get(id).await? {
            let factory_pid = entry.factory_pid.unwrap_or_default();
            if self.failing_factories.lock().unwrap().contains(&factory_pid) {
                return Err(Error::backing_store(id, "write rejected"));
            }
        }
        self.inner.set(id, properties).await
    }

    async fn create(&self, factory_pid: &str) -> Result<String> {
        self.inner.create(factory_pid).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.check(id)?;
        self.inner.delete(id).await
    }

    async fn list(&self) -> Result<Vec<String>> {
        self.inner.list().await
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}
