//! Backing store persisted as a JSON document
//!
//! The document maps backing ids to stored entries. The factory of an
//! instance is recorded next to its properties, never inside them, so no
//! property update can turn a singleton into a factory instance. Every
//! change rewrites the whole file through a temporary file and a rename.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use snapvault_core::{BackingEntry, BackingStore, Error, Properties, Result};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::new_instance_id;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct StoredEntry {
    /// Set only by `create`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    factory_pid: Option<String>,

    #[serde(default)]
    properties: Properties,
}

impl From<StoredEntry> for BackingEntry {
    fn from(stored: StoredEntry) -> Self {
        BackingEntry {
            factory_pid: stored.factory_pid,
            properties: stored.properties,
        }
    }
}

type Document = BTreeMap<String, StoredEntry>;

pub struct FileBackingStore {
    path: Utf8PathBuf,
    /// Serializes read-modify-write cycles within the process
    write_lock: Mutex<()>,
}

impl FileBackingStore {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    async fn read_document(&self) -> Result<Document> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Document::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::backing_store(self.path.as_str(), format!("Invalid document: {}", e))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(Error::backing_store(self.path.as_str(), e.to_string())),
        }
    }

    async fn write_document(&self, document: &Document) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_vec_pretty(document)?;
        let temp_path = Utf8PathBuf::from(format!("{}.tmp", self.path));
        fs::write(&temp_path, content).await?;
        fs::rename(&temp_path, &self.path).await?;

        debug!("Wrote {} backing entries to {}", document.len(), self.path);
        Ok(())
    }
}

#[async_trait]
impl BackingStore for FileBackingStore {
    async fn get(&self, id: &str) -> Result<Option<BackingEntry>> {
        let mut document = self.read_document().await?;
        Ok(document.remove(id).map(BackingEntry::from))
    }

    async fn set(&self, id: &str, properties: Properties) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;

        document.entry(id.to_string()).or_default().properties = properties;
        self.write_document(&document).await
    }

    async fn create(&self, factory_pid: &str) -> Result<String> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;

        let id = new_instance_id(factory_pid);
        document.insert(
            id.clone(),
            StoredEntry {
                factory_pid: Some(factory_pid.to_string()),
                properties: Properties::new(),
            },
        );

        self.write_document(&document).await?;
        Ok(id)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;

        if document.remove(id).is_none() {
            return Err(Error::backing_store(id, "no such entry"));
        }
        self.write_document(&document).await
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.read_document().await?.into_keys().collect())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
