//! Secret property codec
//!
//! Secrets carry no flag saying whether they are already encrypted. A value
//! is classified by trying to reveal it: if that works it is ciphertext,
//! otherwise it is plaintext. Protection is therefore idempotent.

use snapvault_core::{
    ComponentConfiguration, CryptoService, Error, Properties, PropertyValue, Result, Secret,
};
use std::sync::Arc;

/// Value shown instead of a secret on read paths
pub const PASSWORD_PLACEHOLDER: &str = "PlaceHolder";

/// Result of probing a stored secret
#[derive(Debug)]
pub enum SecretForm {
    /// The value decrypted; carries the revealed plaintext
    Ciphertext(Secret),
    /// The value did not decrypt and is taken as plaintext
    Plaintext,
}

/// Encrypts and decrypts secret property values through the crypto collaborator
#[derive(Clone)]
pub struct SecretCodec {
    crypto: Arc<dyn CryptoService>,
}

impl SecretCodec {
    pub fn new(crypto: Arc<dyn CryptoService>) -> Self {
        Self { crypto }
    }

    /// Encrypt a plaintext value
    pub fn protect(&self, plain: &str) -> Result<String> {
        let encrypted = self.crypto.encrypt(plain.as_bytes())?;
        String::from_utf8(encrypted)
            .map_err(|_| Error::crypto("Encrypted secret is not valid UTF-8"))
    }

    /// Decrypt a stored value
    pub fn reveal(&self, stored: &str) -> Result<String> {
        let decrypted = self.crypto.decrypt(stored.as_bytes())?;
        String::from_utf8(decrypted)
            .map_err(|_| Error::crypto("Decrypted secret is not valid UTF-8"))
    }

    /// Probe whether a stored value is ciphertext
    pub fn classify(&self, value: &Secret) -> SecretForm {
        match self.reveal(value.expose()) {
            Ok(plain) => SecretForm::Ciphertext(Secret::new(plain)),
            Err(_) => SecretForm::Plaintext,
        }
    }

    /// Encrypt a secret unless it is already ciphertext
    pub fn protect_secret(&self, value: &Secret) -> Result<Secret> {
        match self.classify(value) {
            SecretForm::Ciphertext(_) => Ok(value.clone()),
            SecretForm::Plaintext => self.protect(value.expose()).map(Secret::new),
        }
    }

    /// Protect every secret in a value, walking arrays element-wise
    pub fn protect_value(&self, value: &PropertyValue) -> Result<PropertyValue> {
        match value {
            PropertyValue::Password(secret) => {
                self.protect_secret(secret).map(PropertyValue::Password)
            }
            PropertyValue::Array(items) => items
                .iter()
                .map(|item| self.protect_value(item))
                .collect::<Result<Vec<_>>>()
                .map(PropertyValue::Array),
            other => Ok(other.clone()),
        }
    }

    /// Protect every secret property in place
    ///
    /// A property whose encryption fails is removed rather than stored in
    /// plaintext. Returns the keys that were removed.
    pub fn protect_properties(&self, properties: &mut Properties) -> Vec<String> {
        let mut dropped = Vec::new();

        for (key, value) in properties.iter_mut() {
            if !value.is_secret() {
                continue;
            }
            match self.protect_value(value) {
                Ok(protected) => *value = protected,
                Err(e) => {
                    tracing::warn!("Failed to encrypt secret property {}: {}", key, e);
                    dropped.push(key.clone());
                }
            }
        }

        for key in &dropped {
            properties.remove(key);
        }
        dropped
    }

    /// Reveal every secret property in place
    ///
    /// Values that fail to decrypt are left untouched. Returns the number of
    /// such failures.
    pub fn reveal_properties(&self, properties: &mut Properties) -> usize {
        let mut failures = 0;
        for (key, value) in properties.iter_mut() {
            if !self.reveal_value(value) {
                tracing::debug!("Secret property {} could not be decrypted", key);
                failures += 1;
            }
        }
        failures
    }

    fn reveal_value(&self, value: &mut PropertyValue) -> bool {
        match value {
            PropertyValue::Password(secret) => match self.reveal(secret.expose()) {
                Ok(plain) => {
                    *secret = Secret::new(plain);
                    true
                }
                Err(_) => false,
            },
            PropertyValue::Array(items) => {
                // Visit every element even after a failure
                items
                    .iter_mut()
                    .fold(true, |ok, item| self.reveal_value(item) && ok)
            }
            _ => true,
        }
    }

    /// Protect the secrets of a batch of configurations
    pub fn protect_configurations(&self, configs: &mut [ComponentConfiguration]) {
        for config in configs.iter_mut() {
            let dropped = self.protect_properties(&mut config.properties);
            if !dropped.is_empty() {
                tracing::warn!(
                    "Dropped {} secret properties from {} that could not be encrypted",
                    dropped.len(),
                    config.pid
                );
            }
        }
    }

    /// Reveal the secrets of a batch of configurations, best effort
    pub fn reveal_configurations(&self, configs: &mut [ComponentConfiguration]) {
        for config in configs.iter_mut() {
            let failures = self.reveal_properties(&mut config.properties);
            if failures > 0 {
                tracing::warn!(
                    "{} secret properties of {} could not be decrypted",
                    failures,
                    config.pid
                );
            }
        }
    }
}

/// Replace every secret with [`PASSWORD_PLACEHOLDER`]
pub fn mask_secrets(properties: &mut Properties) {
    for value in properties.values_mut() {
        mask_value(value);
    }
}

fn mask_value(value: &mut PropertyValue) {
    match value {
        PropertyValue::Password(secret) => *secret = Secret::new(PASSWORD_PLACEHOLDER),
        PropertyValue::Array(items) => items.iter_mut().for_each(mask_value),
        _ => {}
    }
}

/// Whether a value is, or only contains, the secret placeholder
pub fn is_placeholder(value: &PropertyValue) -> bool {
    match value {
        PropertyValue::Password(secret) => secret.expose() == PASSWORD_PLACEHOLDER,
        PropertyValue::Array(items) => !items.is_empty() && items.iter().all(is_placeholder),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Reversible fake cipher: ciphertext is "enc(" + plaintext + ")"
    #[derive(Default)]
    struct FakeCrypto {
        fail_encrypt: AtomicBool,
    }

    impl CryptoService for FakeCrypto {
        fn encrypt(&self, plain: &[u8]) -> Result<Vec<u8>> {
            if self.fail_encrypt.load(Ordering::SeqCst) {
                return Err(Error::crypto("encrypt disabled"));
            }
            let mut out = b"enc(".to_vec();
            out.extend_from_slice(plain);
            out.push(b')');
            Ok(out)
        }

        fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
            data.strip_prefix(b"enc(")
                .and_then(|rest| rest.strip_suffix(b")"))
                .map(<[u8]>::to_vec)
                .ok_or_else(|| Error::crypto("not ciphertext"))
        }
    }

    fn codec() -> (SecretCodec, Arc<FakeCrypto>) {
        let crypto = Arc::new(FakeCrypto::default());
        (SecretCodec::new(crypto.clone()), crypto)
    }

    #[test]
    fn test_classify() {
        let (codec, _) = codec();
        match codec.classify(&Secret::new("enc(pw)")) {
            SecretForm::Ciphertext(plain) => assert_eq!(plain.expose(), "pw"),
            SecretForm::Plaintext => panic!("expected ciphertext"),
        }
        assert!(matches!(
            codec.classify(&Secret::new("pw")),
            SecretForm::Plaintext
        ));
    }

    #[test]
    fn test_protect_is_idempotent() {
        let (codec, _) = codec();
        let once = codec.protect_secret(&Secret::new("pw")).unwrap();
        let twice = codec.protect_secret(&once).unwrap();
        assert_eq!(once.expose(), "enc(pw)");
        assert_eq!(twice, once);
        assert_eq!(codec.reveal(twice.expose()).unwrap(), "pw");
    }

    #[test]
    fn test_protect_properties_leaves_non_secrets() {
        let (codec, _) = codec();
        let mut props = Properties::new();
        props.insert("user".into(), PropertyValue::from("admin"));
        props.insert("pass".into(), PropertyValue::password("pw"));
        props.insert(
            "keys".into(),
            PropertyValue::Array(vec![
                PropertyValue::password("a"),
                PropertyValue::password("enc(b)"),
            ]),
        );

        let dropped = codec.protect_properties(&mut props);
        assert!(dropped.is_empty());
        assert_eq!(props["user"], PropertyValue::from("admin"));
        assert_eq!(props["pass"], PropertyValue::password("enc(pw)"));
        assert_eq!(
            props["keys"],
            PropertyValue::Array(vec![
                PropertyValue::password("enc(a)"),
                PropertyValue::password("enc(b)")
            ])
        );
    }

    #[test]
    fn test_protect_failure_drops_property() {
        let (codec, crypto) = codec();
        crypto.fail_encrypt.store(true, Ordering::SeqCst);

        let mut props = Properties::new();
        props.insert("user".into(), PropertyValue::from("admin"));
        props.insert("pass".into(), PropertyValue::password("pw"));
        props.insert("already".into(), PropertyValue::password("enc(x)"));

        let dropped = codec.protect_properties(&mut props);
        assert_eq!(dropped, vec!["pass".to_string()]);
        assert!(!props.contains_key("pass"));
        assert_eq!(props["already"], PropertyValue::password("enc(x)"));
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn test_reveal_failure_leaves_value() {
        let (codec, _) = codec();
        let mut props = Properties::new();
        props.insert("good".into(), PropertyValue::password("enc(pw)"));
        props.insert("bad".into(), PropertyValue::password("garbage"));

        let failures = codec.reveal_properties(&mut props);
        assert_eq!(failures, 1);
        assert_eq!(props.len(), 2);
        assert_eq!(props["good"], PropertyValue::password("pw"));
        assert_eq!(props["bad"], PropertyValue::password("garbage"));
    }

    #[test]
    fn test_mask_and_placeholder() {
        let mut props = Properties::new();
        props.insert("pass".into(), PropertyValue::password("enc(pw)"));
        props.insert("name".into(), PropertyValue::from("n"));
        mask_secrets(&mut props);

        assert!(is_placeholder(&props["pass"]));
        assert!(!is_placeholder(&props["name"]));
        assert!(!is_placeholder(&PropertyValue::password("pw")));
    }
}
