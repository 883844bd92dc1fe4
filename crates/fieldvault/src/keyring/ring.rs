//! [`KeyRing`]: an immutable snapshot of every known key version.

use std::collections::BTreeMap;

use zeroize::{Zeroize, Zeroizing};

use crate::error::ConfigError;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Fixed-size key buffer holding exactly [`KEY_LEN`] bytes.
///
/// Handed out by [`KeyRing::get_key`] for the duration of one cipher call.
/// The buffer is overwritten with zeroes on drop.
#[derive(Clone)]
pub struct KeyBytes(Box<[u8; KEY_LEN]>);

impl KeyBytes {
    /// Copy `bytes` into a new key buffer.
    ///
    /// Returns `None` unless `bytes` is exactly [`KEY_LEN`] long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; KEY_LEN] = bytes.try_into().ok()?;
        Some(Self(Box::new(arr)))
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl Drop for KeyBytes {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("KeyBytes([REDACTED])")
    }
}

/// Resolved version → key map plus the default version for new encryptions.
///
/// Keys are stored as decoded and only length-checked when used, so a single
/// malformed key breaks only the operations that actually need it.
#[derive(Clone)]
pub struct KeyRing {
    keys: BTreeMap<String, Zeroizing<Vec<u8>>>,
    default_version: String,
}

impl KeyRing {
    /// Create an empty ring whose default version is `default_version`.
    pub fn new(default_version: impl Into<String>) -> Self {
        Self {
            keys: BTreeMap::new(),
            default_version: default_version.into(),
        }
    }

    /// Builder-style insert of raw key bytes, replacing any existing entry.
    pub fn with_key(mut self, version: impl Into<String>, key: impl AsRef<[u8]>) -> Self {
        self.insert(version.into(), Zeroizing::new(key.as_ref().to_vec()));
        self
    }

    pub(crate) fn insert(&mut self, version: String, key: Zeroizing<Vec<u8>>) {
        self.keys.insert(version, key);
    }

    /// Version used when a caller does not name one.
    pub fn default_version(&self) -> &str {
        &self.default_version
    }

    /// Look up the key for `version`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::KeyNotFound`] if the version is absent and
    /// [`ConfigError::KeyLengthInvalid`] if its key is not [`KEY_LEN`] bytes.
    pub fn get_key(&self, version: &str) -> Result<KeyBytes, ConfigError> {
        let raw = self
            .keys
            .get(version)
            .ok_or_else(|| ConfigError::KeyNotFound(version.to_owned()))?;
        KeyBytes::from_slice(raw).ok_or_else(|| ConfigError::KeyLengthInvalid {
            version: version.to_owned(),
            len: raw.len(),
        })
    }

    /// Returns `true` if `version` has an entry (valid or not).
    pub fn contains(&self, version: &str) -> bool {
        self.keys.contains_key(version)
    }

    /// All known versions in sorted order.
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    /// Number of versions in the ring.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the ring holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Versions to try when decrypting a value tagged `preferred`:
    /// `preferred` first (if present), then every other version.
    pub(crate) fn candidates<'a>(&'a self, preferred: &'a str) -> impl Iterator<Item = &'a str> {
        let first = self.contains(preferred).then_some(preferred);
        first
            .into_iter()
            .chain(self.versions().filter(move |v| *v != preferred))
    }
}

impl std::fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRing")
            .field("versions", &self.keys.keys().collect::<Vec<_>>())
            .field("default_version", &self.default_version)
            .finish()
    }
}
