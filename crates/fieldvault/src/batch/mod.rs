//! Whole-record helpers built on the single-value cipher operations.
//!
//! - [`FieldCipher::encrypt_fields`] drops empty values from its output.
//! - [`FieldCipher::decrypt_fields`] never fails: a field that cannot be
//!   decrypted becomes `""` and the rest of the record is still processed.

pub mod path;

pub use path::{FieldPath, PathSegment};

use std::collections::BTreeMap;

use tracing::warn;

use crate::crypto::FieldCipher;
use crate::error::Result;
use crate::keyring::KeyRingProvider;

/// Field name → value map used by the batch helpers.
pub type FieldMap = BTreeMap<String, String>;

impl<P: KeyRingProvider> FieldCipher<P> {
    /// Encrypt every non-empty value under the default key version.
    ///
    /// Empty values are omitted from the result rather than stored as `""`.
    ///
    /// # Errors
    ///
    /// Propagates the first encryption error (a missing or malformed default key).
    pub fn encrypt_fields<I, K, V>(&self, fields: I) -> Result<FieldMap>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut out = FieldMap::new();
        for (name, value) in fields {
            let value = value.as_ref();
            if value.is_empty() {
                continue;
            }
            out.insert(name.into(), self.encrypt(value)?);
        }
        Ok(out)
    }

    /// Decrypt every value, substituting `""` for any field that fails.
    pub fn decrypt_fields<I, K, V>(&self, fields: I) -> FieldMap
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        fields
            .into_iter()
            .map(|(name, value)| {
                let name = name.into();
                let plaintext = match self.decrypt(value.as_ref()) {
                    Ok(plaintext) => plaintext,
                    Err(e) => {
                        warn!(field = %name, code = e.code(), "field decryption failed; substituting empty value");
                        String::new()
                    }
                };
                (name, plaintext)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::{ConfigError, FieldVaultError};
    use crate::keyring::{KeyRing, KEY_LEN};

    fn cipher() -> FieldCipher<KeyRing> {
        FieldCipher::new(KeyRing::new("v1").with_key("v1", [0x5Au8; KEY_LEN]))
    }

    #[test]
    fn encrypt_fields_omits_empty_values() {
        let c = cipher();
        let out = c
            .encrypt_fields([("email", "a@example.com"), ("phone", ""), ("notes", "hi")])
            .unwrap();
        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["email", "notes"]);
        assert_eq!(c.decrypt(&out["email"]).unwrap(), "a@example.com");
        assert_eq!(c.decrypt(&out["notes"]).unwrap(), "hi");
    }

    #[test]
    fn encrypt_fields_propagates_config_errors() {
        let c = FieldCipher::new(KeyRing::new("v1"));
        assert!(matches!(
            c.encrypt_fields([("email", "x")]),
            Err(FieldVaultError::Config(ConfigError::KeyNotFound(_)))
        ));
        // Nothing to encrypt, nothing to fail on.
        assert!(c.encrypt_fields([("email", "")]).unwrap().is_empty());
    }

    #[test]
    fn decrypt_fields_isolates_failures() {
        let c = cipher();
        let valid = c.encrypt("original").unwrap();
        let mut input = HashMap::new();
        input.insert("a".to_owned(), valid);
        input.insert("b".to_owned(), "garbage".to_owned());

        let out = c.decrypt_fields(&input);
        assert_eq!(out["a"], "original");
        assert_eq!(out["b"], "");
    }

    #[test]
    fn decrypt_fields_handles_foreign_ciphertext_and_empty() {
        let other = FieldCipher::new(KeyRing::new("v1").with_key("v1", [0x01u8; KEY_LEN]));
        let foreign = other.encrypt("not yours").unwrap();
        let c = cipher();
        let mine = c.encrypt("yours").unwrap();

        let out = c.decrypt_fields([("x", foreign.as_str()), ("y", mine.as_str()), ("z", "")]);
        assert_eq!(out["x"], "");
        assert_eq!(out["y"], "yours");
        assert_eq!(out["z"], "");
    }

    #[test]
    fn encrypt_then_decrypt_fields() {
        let c = cipher();
        let encrypted = c
            .encrypt_fields([("email", "e@x.io"), ("phone", "+1 555 0100")])
            .unwrap();
        let decrypted = c.decrypt_fields(&encrypted);
        assert_eq!(decrypted["email"], "e@x.io");
        assert_eq!(decrypted["phone"], "+1 555 0100");
    }
}
