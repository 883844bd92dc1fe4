//! AES-256-GCM encryption and decryption of individual string fields.
//!
//! Each encryption draws a fresh 96-bit nonce from the OS CSPRNG, so the same
//! plaintext encrypts to a different string every time. Values are tagged
//! with the key version used; decryption tries that version first and then
//! the rest of the ring, because stored tags can lag the ring during a
//! rotation.

use aes_gcm::{
    aead::{rand_core::RngCore, AeadInPlace, KeyInit, OsRng},
    Aes256Gcm, Nonce, Tag,
};
use tracing::debug;

use super::codec::{EncryptedField, NONCE_LEN, TAG_LEN};
use crate::error::{FieldVaultError, Result};
use crate::keyring::{KeyBytes, KeyRing, KeyRingProvider};

/// Encrypts and decrypts single field values against a [`KeyRingProvider`].
///
/// The provider is asked for a fresh snapshot on every call.
#[derive(Debug, Clone)]
pub struct FieldCipher<P> {
    provider: P,
}

impl<P: KeyRingProvider> FieldCipher<P> {
    /// Create a cipher backed by `provider`.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Encrypt `plaintext` under the ring's default version.
    ///
    /// Empty input is "no value" and returns an empty string.
    ///
    /// # Errors
    ///
    /// - [`FieldVaultError::Config`] if the default key is missing or malformed.
    /// - [`FieldVaultError::Encryption`] on an internal AEAD failure.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        let ring = self.provider.snapshot()?;
        let key = ring.get_key(ring.default_version())?;
        seal(&key, ring.default_version(), plaintext.as_bytes()).map(|f| f.encode())
    }

    /// Encrypt `plaintext` under an explicit key `version`.
    ///
    /// # Errors
    ///
    /// Same as [`FieldCipher::encrypt`].
    pub fn encrypt_with_version(&self, plaintext: &str, version: &str) -> Result<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        let ring = self.provider.snapshot()?;
        let key = ring.get_key(version)?;
        seal(&key, version, plaintext.as_bytes()).map(|f| f.encode())
    }

    /// Decrypt a value produced by [`FieldCipher::encrypt`].
    ///
    /// Every usable key in the snapshot is attempted, the tagged version
    /// first; the first one that authenticates supplies the plaintext.
    ///
    /// # Errors
    ///
    /// - [`FieldVaultError::Format`] if `encrypted` is not a well-formed value.
    /// - [`FieldVaultError::Decryption`] if no key authenticates it.
    pub fn decrypt(&self, encrypted: &str) -> Result<String> {
        if encrypted.is_empty() {
            return Ok(String::new());
        }
        let field = EncryptedField::decode(encrypted)?;
        let ring = self.provider.snapshot()?;

        let attempt = try_candidates(&ring, &field);
        let tried = attempt.tried;

        let (version, plaintext) = attempt.recovered.ok_or(FieldVaultError::Decryption)?;
        if version != field.version {
            debug!(tagged = %field.version, matched = version, tried, "decrypted with fallback key");
        }
        String::from_utf8(plaintext).map_err(|_| FieldVaultError::Decryption)
    }
}

/// Result of running one value against every candidate key.
struct Attempt<'a> {
    /// Version that authenticated first, with the recovered bytes.
    recovered: Option<(&'a str, Vec<u8>)>,
    /// Number of usable keys the value was opened with.
    tried: usize,
}

/// Open `field` with every usable key in `ring`, tagged version first.
///
/// Never stops early: the matching key's position must not show in timing.
fn try_candidates<'a>(ring: &'a KeyRing, field: &'a EncryptedField) -> Attempt<'a> {
    let mut attempt = Attempt {
        recovered: None,
        tried: 0,
    };
    for version in ring.candidates(&field.version) {
        let key = match ring.get_key(version) {
            Ok(key) => key,
            Err(e) => {
                debug!(version, error = %e, "skipping unusable key");
                continue;
            }
        };
        let opened = open(&key, field);
        attempt.tried += 1;
        if attempt.recovered.is_none() {
            attempt.recovered = opened.map(|plaintext| (version, plaintext));
        }
    }
    attempt
}

/// Encrypt raw bytes with `key`, tagging the result with `version`.
///
/// # Errors
///
/// Returns [`FieldVaultError::Encryption`] on an internal AEAD error (should be
/// unreachable with a valid key and nonce).
pub fn seal(key: &KeyBytes, version: &str, plaintext: &[u8]) -> Result<EncryptedField> {
    let cipher = build_cipher(key)?;

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&nonce), b"", &mut buffer)
        .map_err(|_| FieldVaultError::Encryption)?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(tag.as_slice());

    Ok(EncryptedField {
        version: version.to_owned(),
        nonce,
        ciphertext: buffer,
        tag: tag_bytes,
    })
}

/// Authenticate and decrypt `field` with `key`. `None` on any failure.
pub fn open(key: &KeyBytes, field: &EncryptedField) -> Option<Vec<u8>> {
    let cipher = build_cipher(key).ok()?;
    let mut buffer = field.ciphertext.clone();
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(&field.nonce),
            b"",
            &mut buffer,
            Tag::from_slice(&field.tag),
        )
        .ok()?;
    Some(buffer)
}

fn build_cipher(key: &KeyBytes) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| FieldVaultError::Encryption)
}
