//! Snapshot store
//!
//! Snapshots are immutable files named `snapshot_<id>.xml` in one directory.
//! Each file is the whole-file ciphertext of a serialized configuration list
//! whose secret properties are individually encrypted as well.

use camino::{Utf8Path, Utf8PathBuf};
use fs4::fs_std::FileExt;
use regex::Regex;
use snapvault_core::{
    Clock, ComponentConfiguration, ConfigSerializer, CryptoService, Error, Result, SystemClock,
};
use snapvault_secrets::SecretCodec;
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

use crate::retention::{self, BASELINE_ID};
use crate::serializer::JsonSerializer;

/// Lock file serializing writers across processes
const LOCK_FILE_NAME: &str = ".snapshots.lock";

static SNAPSHOT_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^snapshot_([0-9]+)\.xml$").expect("snapshot file pattern is valid")
});

/// Durable, append-only store of configuration snapshots
pub struct SnapshotStore {
    dir: Utf8PathBuf,
    max_count: usize,
    crypto: Arc<dyn CryptoService>,
    serializer: Arc<dyn ConfigSerializer>,
    codec: SecretCodec,
    clock: Arc<dyn Clock>,
    /// Highest id handed out by this store; outlives files removed by retention
    last_allocated: AtomicU64,
}

impl SnapshotStore {
    /// Create a store over `dir` retaining at most `max_count` snapshots
    pub fn new(
        dir: impl Into<Utf8PathBuf>,
        max_count: usize,
        crypto: Arc<dyn CryptoService>,
    ) -> Self {
        Self {
            dir: dir.into(),
            max_count,
            codec: SecretCodec::new(crypto.clone()),
            crypto,
            serializer: Arc::new(JsonSerializer),
            clock: Arc::new(SystemClock),
            last_allocated: AtomicU64::new(BASELINE_ID),
        }
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn ConfigSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    pub fn max_count(&self) -> usize {
        self.max_count
    }

    /// Codec used for secret properties
    pub fn codec(&self) -> &SecretCodec {
        &self.codec
    }

    pub(crate) fn crypto(&self) -> &dyn CryptoService {
        self.crypto.as_ref()
    }

    pub(crate) fn serializer(&self) -> &dyn ConfigSerializer {
        self.serializer.as_ref()
    }

    /// Path of the file holding snapshot `id`
    pub fn snapshot_path(&self, id: u64) -> Utf8PathBuf {
        self.dir.join(format!("snapshot_{}.xml", id))
    }

    /// Ids of all snapshot files, ascending
    ///
    /// A missing or unreadable directory yields an empty set.
    pub fn snapshot_ids(&self) -> BTreeSet<u64> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    warn!("Unable to read snapshot directory {}: {}", self.dir, e);
                }
                return BTreeSet::new();
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name();
                let captures = SNAPSHOT_FILE_RE.captures(name.to_str()?)?;
                captures[1].parse::<u64>().ok()
            })
            .collect()
    }

    /// Most recent snapshot id, if any
    pub fn latest_id(&self) -> Option<u64> {
        self.snapshot_ids().last().copied()
    }

    /// Whether the baseline snapshot file exists
    pub fn has_baseline(&self) -> bool {
        self.snapshot_path(BASELINE_ID).exists()
    }

    /// Load a snapshot for active use, with secrets revealed
    ///
    /// Secrets that fail to decrypt are left as stored.
    pub fn load(&self, id: u64) -> Result<Vec<ComponentConfiguration>> {
        let mut configs = self.read_snapshot(id)?;
        self.codec.reveal_configurations(&mut configs);
        Ok(configs)
    }

    /// Read and decrypt a snapshot file without touching its secrets
    pub(crate) fn read_snapshot(&self, id: u64) -> Result<Vec<ComponentConfiguration>> {
        let path = self.snapshot_path(id);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::snapshot_not_found(path.as_str()));
            }
            Err(e) => return Err(e.into()),
        };

        let decrypted = self.crypto.decrypt(&raw).map_err(|e| {
            Error::configuration(format!("Unable to decrypt snapshot {}: {}", id, e))
        })?;

        self.serializer.unmarshal(&decrypted).map_err(|e| {
            Error::configuration(format!("Unable to parse snapshot {}: {}", id, e))
        })
    }

    /// Persist a new snapshot and apply retention
    ///
    /// Returns the allocated id. Ids strictly increase even when the wall
    /// clock moves backwards between saves.
    pub fn save(&self, configs: &[ComponentConfiguration]) -> Result<u64> {
        let _lock = self.lock()?;

        let now = self.clock.now_millis();
        let last = self
            .latest_id()
            .unwrap_or(BASELINE_ID)
            .max(self.last_allocated.load(Ordering::SeqCst));
        // `last` is at least the baseline id, so id 0 is never allocated here
        let id = if now > last {
            now
        } else {
            warn!("Snapshot id {} is in the past. Adjusting id to {} + 1", now, last);
            last + 1
        };

        self.write_snapshot(id, configs)?;
        self.last_allocated.fetch_max(id, Ordering::SeqCst);

        if let Err(e) = self.collect_garbage_locked() {
            warn!("Snapshot garbage collection failed: {}", e);
        }

        Ok(id)
    }

    /// Write the baseline snapshot (id 0)
    ///
    /// Fails when a baseline already exists; it is immutable once written.
    pub fn save_baseline(&self, configs: &[ComponentConfiguration]) -> Result<()> {
        let _lock = self.lock()?;
        if self.has_baseline() {
            return Err(Error::already_exists(
                self.snapshot_path(BASELINE_ID).as_str(),
            ));
        }
        self.write_snapshot(BASELINE_ID, configs)
    }

    /// Protect, serialize, encrypt and atomically write snapshot `id`
    pub(crate) fn write_snapshot(
        &self,
        id: u64,
        configs: &[ComponentConfiguration],
    ) -> Result<()> {
        let mut configs = configs.to_vec();
        self.codec.protect_configurations(&mut configs);

        let payload = self.serializer.marshal(&configs)?;
        let encrypted = self.crypto.encrypt(&payload)?;

        let path = self.snapshot_path(id);
        let temp_path = self.dir.join(format!(".snapshot_{}.xml.tmp", id));
        info!("Writing snapshot {}", path);

        {
            let mut temp_file = File::create(&temp_path)?;
            temp_file.write_all(&encrypted)?;
            temp_file.sync_all()?;
        }

        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        debug!("Snapshot {} holds {} configurations", id, configs.len());
        Ok(())
    }

    /// Delete snapshots beyond the retention count
    ///
    /// Returns the ids that were deleted. The baseline is never deleted.
    pub fn collect_garbage(&self) -> Result<Vec<u64>> {
        let _lock = self.lock()?;
        self.collect_garbage_locked()
    }

    fn collect_garbage_locked(&self) -> Result<Vec<u64>> {
        let doomed = retention::ids_to_delete(&self.snapshot_ids(), self.max_count);

        let mut deleted = Vec::with_capacity(doomed.len());
        for id in doomed {
            let path = self.snapshot_path(id);
            match fs::remove_file(&path) {
                Ok(()) => {
                    info!("Snapshots garbage collector. Deleted {}", path);
                    deleted.push(id);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(deleted)
    }

    /// Load the newest usable snapshot
    ///
    /// Walks ids from newest to oldest, skipping unloadable ones. When none
    /// loads, plaintext snapshots are migrated once and the walk is retried.
    /// Never fails: `None` means start from defaults.
    pub fn load_latest(&self) -> Option<(u64, Vec<ComponentConfiguration>)> {
        if let Some(found) = self.load_newest_loadable() {
            return Some(found);
        }

        if self.snapshot_ids().is_empty() {
            return None;
        }

        info!("Unable to load any snapshot. Migrating plaintext snapshots and retrying");
        match self.encrypt_plain_snapshots() {
            Ok(migrated) => info!("Migrated {} plaintext snapshots", migrated),
            Err(e) => {
                warn!("Snapshot migration failed: {}", e);
                return None;
            }
        }

        let found = self.load_newest_loadable();
        if found.is_none() {
            warn!("No usable snapshot found in {}", self.dir);
        }
        found
    }

    fn load_newest_loadable(&self) -> Option<(u64, Vec<ComponentConfiguration>)> {
        let mut candidates = self.snapshot_ids();
        while let Some(id) = candidates.pop_last() {
            match self.load(id) {
                Ok(configs) => {
                    info!("Loaded configurations from snapshot {}", id);
                    return Some((id, configs));
                }
                Err(e) => warn!("Skipping snapshot {}: {}", id, e),
            }
        }
        None
    }

    /// Acquire the exclusive writer lock (released on drop)
    pub(crate) fn lock(&self) -> Result<File> {
        fs::create_dir_all(&self.dir)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(LOCK_FILE_NAME))?;
        file.lock_exclusive()?;
        Ok(file)
    }
}
