//! Lenient parsing of key settings into tagged per-entry results.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use zeroize::Zeroizing;

use super::KEY_LEN;

/// How an encoded key string was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEncoding {
    /// Exactly `2 * KEY_LEN` hex characters.
    Hex,
    /// Standard base64 that re-encodes to the same text.
    Base64,
    /// Anything else: the UTF-8 bytes of the text itself.
    Raw,
}

impl KeyEncoding {
    /// Lowercase name for diagnostics output.
    pub fn as_str(self) -> &'static str {
        match self {
            KeyEncoding::Hex => "hex",
            KeyEncoding::Base64 => "base64",
            KeyEncoding::Raw => "raw",
        }
    }
}

/// Where a key entry came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOrigin {
    /// Position within the consolidated `keys` list (zero-based, blanks ignored).
    Consolidated { index: usize },
    /// A discrete `key_<version>` setting.
    Discrete { setting: String },
}

impl std::fmt::Display for EntryOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryOrigin::Consolidated { index } => write!(f, "keys[{index}]"),
            EntryOrigin::Discrete { setting } => f.write_str(setting),
        }
    }
}

/// Why an entry did not make it into the ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// `:key` with nothing before the colon.
    EmptyVersion,
    /// `version:` or a discrete setting with a blank value.
    EmptyKey,
    /// A key without a version inside a multi-entry list.
    BareKeyInList,
    /// A later entry (or a discrete setting) defined the same version.
    Superseded { version: String },
    /// The ring already holds [`super::MAX_KEY_VERSIONS`] versions.
    TooManyVersions { version: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::EmptyVersion => f.write_str("empty version"),
            SkipReason::EmptyKey => f.write_str("empty key"),
            SkipReason::BareKeyInList => f.write_str("bare key in multi-entry list"),
            SkipReason::Superseded { version } => write!(f, "{version} superseded by a later entry"),
            SkipReason::TooManyVersions { version } => {
                write!(f, "{version} exceeds the key version limit")
            }
        }
    }
}

/// An entry that was ignored, with the reason. Never carries key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Setting the entry came from.
    pub origin: EntryOrigin,
    /// Why it was ignored.
    pub reason: SkipReason,
}

/// A successfully decoded key entry.
#[derive(Clone)]
pub struct ParsedKey {
    /// Version label.
    pub version: String,
    /// Decoded bytes; length is checked only when the key is used.
    pub key: Zeroizing<Vec<u8>>,
    /// Interpretation applied to the setting text.
    pub encoding: KeyEncoding,
    /// Setting the entry came from.
    pub origin: EntryOrigin,
}

impl std::fmt::Debug for ParsedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedKey")
            .field("version", &self.version)
            .field("key", &"[REDACTED]")
            .field("len", &self.key.len())
            .field("encoding", &self.encoding)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Result of parsing one key entry.
#[derive(Debug, Clone)]
pub enum KeyEntry {
    /// Usable entry.
    Parsed(ParsedKey),
    /// Ignored entry.
    Skipped(SkippedEntry),
}

/// Decode a key given as hex, base64, or raw text (tried in that order).
///
/// Hex must be exactly 64 characters. Base64 is accepted only if re-encoding
/// the decoded bytes reproduces the trimmed input, so ordinary text is not
/// mistaken for base64.
pub fn decode_key(encoded: &str) -> (KeyEncoding, Zeroizing<Vec<u8>>) {
    let trimmed = encoded.trim();

    if trimmed.len() == KEY_LEN * 2 && trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
        if let Ok(bytes) = hex::decode(trimmed) {
            return (KeyEncoding::Hex, Zeroizing::new(bytes));
        }
    }

    if let Ok(bytes) = STANDARD.decode(trimmed) {
        let bytes = Zeroizing::new(bytes);
        let reencoded = Zeroizing::new(STANDARD.encode(bytes.as_slice()));
        if reencoded.as_str() == trimmed {
            return (KeyEncoding::Base64, bytes);
        }
    }

    (KeyEncoding::Raw, Zeroizing::new(trimmed.as_bytes().to_vec()))
}

/// Parse one `(version, encoded key)` pair.
pub fn parse_pair(version: &str, encoded: &str, origin: EntryOrigin) -> KeyEntry {
    let version = version.trim();
    if version.is_empty() {
        return KeyEntry::Skipped(SkippedEntry {
            origin,
            reason: SkipReason::EmptyVersion,
        });
    }
    if encoded.trim().is_empty() {
        return KeyEntry::Skipped(SkippedEntry {
            origin,
            reason: SkipReason::EmptyKey,
        });
    }
    let (encoding, key) = decode_key(encoded);
    KeyEntry::Parsed(ParsedKey {
        version: version.to_owned(),
        key,
        encoding,
        origin,
    })
}

/// Parse the consolidated setting: `v1:<key>,v2:<key>` or one bare key,
/// which is assigned to `default_version`.
pub fn parse_consolidated(value: &str, default_version: &str) -> Vec<KeyEntry> {
    let items: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect();
    let single = items.len() == 1;

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let origin = EntryOrigin::Consolidated { index };
            match item.split_once(':') {
                Some((version, key)) => parse_pair(version, key, origin),
                None if single => parse_pair(default_version, item, origin),
                None => KeyEntry::Skipped(SkippedEntry {
                    origin,
                    reason: SkipReason::BareKeyInList,
                }),
            }
        })
        .collect()
}
