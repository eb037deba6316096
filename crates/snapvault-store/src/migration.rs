//! Migration of legacy plaintext snapshots
//!
//! Older stores wrote snapshot files without whole-file encryption. A file is
//! treated as legacy plaintext when it does not decrypt but its raw bytes
//! parse as a configuration list. Such files are rewritten in place under the
//! same id, encrypted and with their secrets protected.

use snapvault_core::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use tracing::{debug, info, warn};

use crate::store::SnapshotStore;

impl SnapshotStore {
    /// Encrypt every legacy plaintext snapshot in place
    ///
    /// Returns the number of files migrated. Files that neither decrypt nor
    /// parse are left untouched.
    pub fn encrypt_plain_snapshots(&self) -> Result<usize> {
        let _lock = self.lock()?;

        let mut migrated = 0;
        for id in self.snapshot_ids() {
            let path = self.snapshot_path(id);
            let raw = match fs::read(&path) {
                Ok(raw) => raw,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(Error::snapshot_not_found(path.as_str()));
                }
                Err(e) => return Err(e.into()),
            };

            if self.crypto().decrypt(&raw).is_ok() {
                debug!("Snapshot {} is already encrypted", id);
                continue;
            }

            match self.serializer().unmarshal(&raw) {
                Ok(configs) => {
                    self.write_snapshot(id, &configs)?;
                    info!("Encrypted plaintext snapshot {}", path);
                    migrated += 1;
                }
                Err(e) => {
                    warn!(
                        "Snapshot {} is neither encrypted nor readable plaintext, leaving it untouched: {}",
                        path, e
                    );
                }
            }
        }

        Ok(migrated)
    }
}
