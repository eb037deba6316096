use async_trait::async_trait;
use snapvault_core::{BackingEntry, BackingStore, Error, Properties, Result};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::new_instance_id;

/// Backing store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryBackingStore {
    entries: RwLock<BTreeMap<String, BackingEntry>>,
}

impl MemoryBackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry directly
    pub async fn insert(&self, id: impl Into<String>, entry: BackingEntry) {
        self.entries.write().await.insert(id.into(), entry);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl BackingStore for MemoryBackingStore {
    async fn get(&self, id: &str) -> Result<Option<BackingEntry>> {
        Ok(self.entries.read().await.get(id).cloned())
    }

    async fn set(&self, id: &str, properties: Properties) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.entry(id.to_string()).or_default().properties = properties;
        Ok(())
    }

    async fn create(&self, factory_pid: &str) -> Result<String> {
        let id = new_instance_id(factory_pid);
        let entry = BackingEntry {
            factory_pid: Some(factory_pid.to_string()),
            properties: Properties::new(),
        };
        self.entries.write().await.insert(id.clone(), entry);
        Ok(id)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.entries.write().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(Error::backing_store(id, "no such entry")),
        }
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
