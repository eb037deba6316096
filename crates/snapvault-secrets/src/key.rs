//! Master key handling
//!
//! The 256-bit key is stored base64 encoded, either in a key file or in the
//! `SNAPVAULT_KEY` environment variable. Key bytes live in zeroized memory.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use camino::Utf8Path;
use chacha20poly1305::{
    aead::{KeyInit, OsRng},
    ChaCha20Poly1305,
};
use snapvault_core::{Error, Result};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use zeroize::Zeroizing;

/// Size of the master key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Environment variable carrying an inline base64 key
pub const KEY_ENV_VAR: &str = "SNAPVAULT_KEY";

/// Symmetric master key
#[derive(Clone)]
pub struct MasterKey {
    bytes: Zeroizing<[u8; KEY_SIZE]>,
}

impl MasterKey {
    /// Create from raw key bytes
    pub fn from_bytes(key_bytes: &[u8]) -> Result<Self> {
        if key_bytes.len() != KEY_SIZE {
            return Err(Error::crypto(format!(
                "Key must be {} bytes, got {} bytes",
                KEY_SIZE,
                key_bytes.len()
            )));
        }

        let mut bytes = Zeroizing::new([0u8; KEY_SIZE]);
        bytes.copy_from_slice(key_bytes);
        Ok(Self { bytes })
    }

    /// Generate a fresh random key
    pub fn generate() -> Self {
        let key = ChaCha20Poly1305::generate_key(&mut OsRng);
        let mut bytes = Zeroizing::new([0u8; KEY_SIZE]);
        bytes.copy_from_slice(key.as_slice());
        Self { bytes }
    }

    /// Decode a base64 encoded key
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let decoded = Zeroizing::new(
            BASE64
                .decode(encoded.trim())
                .map_err(|e| Error::crypto(format!("Failed to decode key: {}", e)))?,
        );
        Self::from_bytes(&decoded)
    }

    /// Encode the key as base64 (for storage)
    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(BASE64.encode(self.bytes.as_ref()))
    }

    /// Read a key file
    pub fn from_key_file(path: &Utf8Path) -> Result<Self> {
        let content = Zeroizing::new(fs::read_to_string(path).map_err(|e| {
            Error::crypto(format!("Failed to read key file {}: {}", path, e))
        })?);
        Self::from_base64(&content)
    }

    /// Resolve the key from `SNAPVAULT_KEY`, falling back to the key file
    pub fn resolve(key_file: &Utf8Path) -> Result<Self> {
        match std::env::var(KEY_ENV_VAR) {
            Ok(encoded) => {
                tracing::debug!("Using master key from {}", KEY_ENV_VAR);
                Self::from_base64(&Zeroizing::new(encoded))
            }
            Err(_) => Self::from_key_file(key_file),
        }
    }

    /// Write the key to a file readable only by the owner
    ///
    /// Refuses to replace an existing file unless `force` is set. The file
    /// is created with mode 0600 on unix before any key bytes are written.
    pub fn write_key_file(&self, path: &Utf8Path, force: bool) -> Result<()> {
        if path.exists() {
            if !force {
                return Err(Error::already_exists(path.as_str()));
            }
            // The old file may carry looser permissions
            fs::remove_file(path)?;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path)?;
        file.write_all(self.to_base64().as_bytes())?;
        file.sync_all()?;

        tracing::info!("Wrote master key to {}", path);
        Ok(())
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.bytes.as_ref()
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MasterKey([REDACTED])")
    }
}
