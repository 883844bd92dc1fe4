//! Re-encryption of stored values under a new key version.
//!
//! Rotation is decrypt-then-encrypt. [`FieldCipher::batch_rotate`] is
//! idempotent: values already tagged with the target version are left alone,
//! so it can be re-run until every targeted field has moved.

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::batch::FieldPath;
use crate::crypto::{is_encrypted, version_of, FieldCipher};
use crate::error::{FieldVaultError, Result};
use crate::keyring::KeyRingProvider;

/// Counts of what a batch rotation did, per visited field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RotationReport {
    /// Values re-encrypted under the new version.
    pub rotated: usize,
    /// Encrypted values already on the new version.
    pub already_current: usize,
    /// Values present but not encrypted (legacy plaintext, non-strings).
    pub not_encrypted: usize,
    /// Paths that did not resolve to a value.
    pub missing: usize,
}

/// Rotated records together with the [`RotationReport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RotatedBatch {
    /// Copies of the input records with targeted fields rotated.
    pub records: Vec<Value>,
    /// What happened to each visited field.
    pub report: RotationReport,
}

impl<P: KeyRingProvider> FieldCipher<P> {
    /// Decrypt `encrypted` and re-encrypt the plaintext under `new_version`.
    ///
    /// Empty input returns an empty string.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`FieldCipher::decrypt`] and
    /// [`FieldCipher::encrypt_with_version`] unchanged.
    pub fn rotate(&self, encrypted: &str, new_version: &str) -> Result<String> {
        if encrypted.is_empty() {
            return Ok(String::new());
        }
        let plaintext = self.decrypt(encrypted)?;
        self.encrypt_with_version(&plaintext, new_version)
    }

    /// Rotate the named fields of every record to `new_version`.
    ///
    /// `field_names` are plain keys or dot paths (see [`FieldPath`]). A key
    /// that exists verbatim in the record, dots included, is used as is.
    /// A field is rotated only if it holds an encrypted string whose version
    /// differs from `new_version`; everything else passes through unchanged. The input is
    /// not modified, so a failed batch leaves the caller's records intact.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`FieldCipher::rotate`].
    pub fn batch_rotate<S: AsRef<str>>(
        &self,
        records: &[Value],
        field_names: &[S],
        new_version: &str,
    ) -> Result<RotatedBatch> {
        let paths: Vec<FieldPath> = field_names
            .iter()
            .map(|name| FieldPath::parse(name.as_ref()))
            .collect();

        let mut report = RotationReport::default();
        let mut out = records.to_vec();

        for record in &mut out {
            for path in &paths {
                path.for_each_leaf::<FieldVaultError, _>(record, &mut |leaf| {
                    let Some(value) = leaf else {
                        report.missing += 1;
                        return Ok(());
                    };
                    let Value::String(text) = value else {
                        report.not_encrypted += 1;
                        return Ok(());
                    };
                    if !is_encrypted(text) {
                        report.not_encrypted += 1;
                        return Ok(());
                    }
                    if version_of(text) == Some(new_version) {
                        report.already_current += 1;
                        return Ok(());
                    }
                    *text = self.rotate(text, new_version)?;
                    report.rotated += 1;
                    Ok(())
                })?;
            }
        }

        info!(
            records = records.len(),
            new_version,
            rotated = report.rotated,
            already_current = report.already_current,
            not_encrypted = report.not_encrypted,
            missing = report.missing,
            "batch rotation complete"
        );

        Ok(RotatedBatch {
            records: out,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::ConfigError;
    use crate::keyring::{KeyRing, KEY_LEN};

    fn cipher() -> FieldCipher<KeyRing> {
        FieldCipher::new(
            KeyRing::new("v1")
                .with_key("v1", [0x01u8; KEY_LEN])
                .with_key("v2", [0x02u8; KEY_LEN]),
        )
    }

    #[test]
    fn rotate_changes_version_and_keeps_plaintext() {
        let c = cipher();
        let old = c.encrypt_with_version("p", "v1").unwrap();
        let new = c.rotate(&old, "v2").unwrap();
        assert_eq!(version_of(&new), Some("v2"));
        assert_eq!(c.decrypt(&new).unwrap(), "p");
    }

    #[test]
    fn rotate_empty_is_empty() {
        assert_eq!(cipher().rotate("", "v2").unwrap(), "");
    }

    #[test]
    fn rotate_propagates_errors() {
        let c = cipher();
        assert!(matches!(
            c.rotate("v1:bad", "v2"),
            Err(FieldVaultError::Format(_))
        ));
        let old = c.encrypt("p").unwrap();
        assert!(matches!(
            c.rotate(&old, "v9"),
            Err(FieldVaultError::Config(ConfigError::KeyNotFound(_)))
        ));
    }

    #[test]
    fn batch_rotate_targets_only_stale_encrypted_fields() {
        let c = cipher();
        let stale = c.encrypt_with_version("old@example.com", "v1").unwrap();
        let current = c.encrypt_with_version("+1 555 0100", "v2").unwrap();
        let records = vec![
            json!({"id": 1, "email": stale, "phone": current.clone(), "notes": "legacy plaintext"}),
            json!({"id": 2, "email": null}),
        ];

        let batch = c
            .batch_rotate(&records, &["email", "phone", "notes"], "v2")
            .unwrap();

        let first = &batch.records[0];
        let email = first["email"].as_str().unwrap();
        assert_eq!(version_of(email), Some("v2"));
        assert_eq!(c.decrypt(email).unwrap(), "old@example.com");
        assert_eq!(first["phone"], json!(current));
        assert_eq!(first["notes"], "legacy plaintext");
        assert_eq!(first["id"], 1);
        assert_eq!(batch.records[1], records[1]);

        assert_eq!(
            batch.report,
            RotationReport {
                rotated: 1,
                already_current: 1,
                not_encrypted: 2,
                missing: 2,
            }
        );
    }

    #[test]
    fn batch_rotate_is_idempotent() {
        let c = cipher();
        let records = vec![json!({"email": c.encrypt("a@b.c").unwrap()})];
        let once = c.batch_rotate(&records, &["email"], "v2").unwrap();
        let twice = c.batch_rotate(&once.records, &["email"], "v2").unwrap();
        assert_eq!(once.records, twice.records);
        assert_eq!(twice.report.rotated, 0);
        assert_eq!(twice.report.already_current, 1);
    }

    #[test]
    fn batch_rotate_follows_nested_and_array_paths() {
        let c = cipher();
        let records = vec![json!({
            "contact": {"email": c.encrypt("x@y.z").unwrap()},
            "phones": [
                {"number": c.encrypt("1").unwrap()},
                {"number": c.encrypt("2").unwrap()}
            ]
        })];
        let batch = c
            .batch_rotate(&records, &["contact.email", "phones[].number"], "v2")
            .unwrap();
        assert_eq!(batch.report.rotated, 3);
        let r = &batch.records[0];
        assert_eq!(version_of(r["contact"]["email"].as_str().unwrap()), Some("v2"));
        for phone in r["phones"].as_array().unwrap() {
            assert_eq!(version_of(phone["number"].as_str().unwrap()), Some("v2"));
        }
    }

    #[test]
    fn batch_rotate_targets_flat_keys_containing_dots() {
        let c = cipher();
        let records = vec![json!({"contact.email": c.encrypt("flat@x.io").unwrap()})];
        let batch = c.batch_rotate(&records, &["contact.email"], "v2").unwrap();
        let rotated = batch.records[0]["contact.email"].as_str().unwrap();
        assert_eq!(version_of(rotated), Some("v2"));
        assert_eq!(c.decrypt(rotated).unwrap(), "flat@x.io");
        assert_eq!(batch.report.missing, 0);
    }

    #[test]
    fn batch_rotate_failure_leaves_input_untouched() {
        let c = cipher();
        let foreign = FieldCipher::new(KeyRing::new("v1").with_key("v1", [0xEEu8; KEY_LEN]))
            .encrypt("x")
            .unwrap();
        let records = vec![json!({"email": foreign.clone()})];
        assert!(matches!(
            c.batch_rotate(&records, &["email"], "v2"),
            Err(FieldVaultError::Decryption)
        ));
        assert_eq!(records[0]["email"], json!(foreign));
    }
}
