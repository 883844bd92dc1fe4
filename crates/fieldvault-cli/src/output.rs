//! JSON shapes written to stdout by the structured commands.

use fieldvault::keyring::{ParsedKey, Resolution, SkippedEntry, KEY_LEN};
use serde::Serialize;

/// Output of `inspect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectOutput {
    /// Whether the value has the encrypted-field shape.
    pub encrypted: bool,
    /// Version tag, when encrypted.
    pub version: Option<String>,
}

impl InspectOutput {
    /// Inspect a stored value.
    pub fn of(value: &str) -> Self {
        Self {
            encrypted: fieldvault::is_encrypted(value),
            version: fieldvault::version_of(value).map(str::to_owned),
        }
    }
}

/// One usable key entry. Never includes key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeySummary {
    /// Version label.
    pub version: String,
    /// How the setting text was interpreted (`hex`, `base64`, `raw`).
    pub encoding: &'static str,
    /// Decoded length in bytes.
    pub length: usize,
    /// Whether the length is exactly 32 bytes.
    pub valid: bool,
    /// Setting the key came from.
    pub origin: String,
}

impl From<&ParsedKey> for KeySummary {
    fn from(key: &ParsedKey) -> Self {
        Self {
            version: key.version.clone(),
            encoding: key.encoding.as_str(),
            length: key.key.len(),
            valid: key.key.len() == KEY_LEN,
            origin: key.origin.to_string(),
        }
    }
}

/// One ignored key entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSummary {
    /// Setting the entry came from.
    pub origin: String,
    /// Why it was ignored.
    pub reason: String,
}

impl From<&SkippedEntry> for SkippedSummary {
    fn from(entry: &SkippedEntry) -> Self {
        Self {
            origin: entry.origin.to_string(),
            reason: entry.reason.to_string(),
        }
    }
}

/// Output of `keys`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyRingSummary {
    /// Version used for new encryptions.
    pub default_version: String,
    /// Whether the default version resolves to a valid 32-byte key.
    pub default_usable: bool,
    /// Keys in the ring.
    pub keys: Vec<KeySummary>,
    /// Entries that were ignored.
    pub skipped: Vec<SkippedSummary>,
}

impl From<&Resolution> for KeyRingSummary {
    fn from(r: &Resolution) -> Self {
        Self {
            default_version: r.ring.default_version().to_owned(),
            default_usable: r.ring.get_key(r.ring.default_version()).is_ok(),
            keys: r.parsed.iter().map(KeySummary::from).collect(),
            skipped: r.skipped.iter().map(SkippedSummary::from).collect(),
        }
    }
}
