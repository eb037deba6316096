//! ChaCha20-Poly1305 implementation of the crypto collaborator
//!
//! Each message gets a random 96-bit nonce. The output is base64 text of
//! `nonce || ciphertext`, so encrypted values are safe to embed in
//! string-typed properties and in text files.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    ChaCha20Poly1305, Key, Nonce,
};
use snapvault_core::{CryptoService, Error, Result};

use crate::key::MasterKey;

/// Size of the nonce in bytes (96 bits for ChaCha20-Poly1305)
const NONCE_SIZE: usize = 12;

/// Size of the Poly1305 authentication tag in bytes
const TAG_SIZE: usize = 16;

/// Authenticated symmetric cipher keyed by a [`MasterKey`]
pub struct ChaChaCryptoService {
    cipher: ChaCha20Poly1305,
}

impl ChaChaCryptoService {
    pub fn new(key: &MasterKey) -> Self {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
        Self { cipher }
    }
}

impl CryptoService for ChaChaCryptoService {
    fn encrypt(&self, plain: &[u8]) -> Result<Vec<u8>> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plain)
            .map_err(|e| Error::crypto(format!("Encryption failed: {}", e)))?;

        let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(nonce.as_slice());
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(combined).into_bytes())
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::crypto("Ciphertext is not valid base64 text"))?;
        let combined = BASE64
            .decode(text.trim())
            .map_err(|e| Error::crypto(format!("Failed to decode ciphertext: {}", e)))?;

        if combined.len() < NONCE_SIZE + TAG_SIZE {
            return Err(Error::crypto(format!(
                "Ciphertext too short: {} bytes",
                combined.len()
            )));
        }

        let (nonce, ciphertext) = combined.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| Error::crypto(format!("Decryption failed: {}", e)))
    }
}
