//! Secret protection for Snapvault
//!
//! This crate provides:
//! - **Crypto**: a ChaCha20-Poly1305 implementation of the crypto collaborator
//! - **Keys**: master key generation, loading and storage with zeroized memory
//! - **Codec**: idempotent protection of secret-typed property values

pub mod codec;
pub mod crypto;
pub mod key;

pub use codec::{is_placeholder, mask_secrets, SecretCodec, SecretForm, PASSWORD_PLACEHOLDER};
pub use crypto::ChaChaCryptoService;
pub use key::{MasterKey, KEY_ENV_VAR, KEY_SIZE};
