//! Text encoding of encrypted field values.
//!
//! ```text
//! {version}:{hex(nonce)}:{hex(ciphertext)}:{hex(tag)}
//! ```
//!
//! Nonce is 12 bytes (24 hex chars), tag 16 bytes (32 hex chars); the
//! ciphertext is as long as the plaintext. Hex is written lowercase and
//! accepted in either case.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::FormatError;

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of an AES-GCM authentication tag.
pub const TAG_LEN: usize = 16;

/// Segment separator in the text encoding.
pub const SEPARATOR: char = ':';

static ENCRYPTED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^v\d+:[0-9a-f]+:[0-9a-f]+:[0-9a-f]+$").expect("valid field regex")
});

/// A parsed encrypted field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedField {
    /// Key version label the value was encrypted under.
    pub version: String,
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext bytes, without the tag.
    pub ciphertext: Vec<u8>,
    /// Authentication tag.
    pub tag: [u8; TAG_LEN],
}

impl EncryptedField {
    /// Encode this value to its canonical string representation.
    pub fn encode(&self) -> String {
        format!(
            "{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
            self.version,
            hex::encode(self.nonce),
            hex::encode(&self.ciphertext),
            hex::encode(self.tag),
        )
    }

    /// Parse an encrypted field string.
    ///
    /// The version segment is taken verbatim; only the byte segments are
    /// validated.
    ///
    /// # Errors
    ///
    /// - [`FormatError::SegmentCount`] unless there are exactly 4 segments.
    /// - [`FormatError::InvalidHex`] if a byte segment is not hex.
    /// - [`FormatError::NonceLength`] / [`FormatError::TagLength`] on wrong sizes.
    pub fn decode(text: &str) -> Result<Self, FormatError> {
        let parts: Vec<&str> = text.split(SEPARATOR).collect();
        let [version, nonce, ciphertext, tag] = parts.as_slice() else {
            return Err(FormatError::SegmentCount(parts.len()));
        };

        let nonce = hex::decode(nonce).map_err(|_| FormatError::InvalidHex("nonce"))?;
        let ciphertext =
            hex::decode(ciphertext).map_err(|_| FormatError::InvalidHex("ciphertext"))?;
        let tag = hex::decode(tag).map_err(|_| FormatError::InvalidHex("tag"))?;

        let nonce: [u8; NONCE_LEN] = nonce
            .as_slice()
            .try_into()
            .map_err(|_| FormatError::NonceLength(nonce.len()))?;
        let tag: [u8; TAG_LEN] = tag
            .as_slice()
            .try_into()
            .map_err(|_| FormatError::TagLength(tag.len()))?;

        Ok(Self {
            version: (*version).to_owned(),
            nonce,
            ciphertext,
            tag,
        })
    }
}

impl std::fmt::Display for EncryptedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for EncryptedField {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

/// Returns `true` if `text` looks like `v<digits>:<hex>:<hex>:<hex>`.
///
/// Used to tell already-encrypted values from legacy plaintext. This is a
/// shape check only; it does not validate segment lengths.
pub fn is_encrypted(text: &str) -> bool {
    ENCRYPTED_PATTERN.is_match(text)
}

/// The version segment of `text`, if it is an encrypted value.
pub fn version_of(text: &str) -> Option<&str> {
    if !is_encrypted(text) {
        return None;
    }
    text.split(SEPARATOR).next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EncryptedField {
        EncryptedField {
            version: "v3".into(),
            nonce: [0x01; NONCE_LEN],
            ciphertext: vec![0xde, 0xad, 0xbe, 0xef],
            tag: [0xff; TAG_LEN],
        }
    }

    #[test]
    fn encode_layout() {
        let s = sample().encode();
        assert_eq!(
            s,
            "v3:010101010101010101010101:deadbeef:ffffffffffffffffffffffffffffffff"
        );
        assert_eq!(s, sample().to_string());
    }

    #[test]
    fn decode_accepts_uppercase_hex() {
        let s = sample().encode().to_uppercase().replacen('V', "v", 1);
        assert_eq!(EncryptedField::decode(&s).unwrap(), sample());
    }

    #[test]
    fn from_str_parses() {
        let parsed: EncryptedField = sample().encode().parse().unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn rejects_wrong_segment_count() {
        assert_eq!(
            EncryptedField::decode("not-a-valid-format"),
            Err(FormatError::SegmentCount(1))
        );
        assert_eq!(
            EncryptedField::decode("v1:bad"),
            Err(FormatError::SegmentCount(2))
        );
        assert_eq!(
            EncryptedField::decode("v1:aa:bb:cc:dd"),
            Err(FormatError::SegmentCount(5))
        );
    }

    #[test]
    fn rejects_bad_hex() {
        let nonce = "00".repeat(NONCE_LEN);
        let tag = "00".repeat(TAG_LEN);
        assert_eq!(
            EncryptedField::decode(&format!("v1:{nonce}:zz:{tag}")),
            Err(FormatError::InvalidHex("ciphertext"))
        );
        assert_eq!(
            EncryptedField::decode(&format!("v1:xyz:00:{tag}")),
            Err(FormatError::InvalidHex("nonce"))
        );
    }

    #[test]
    fn rejects_wrong_nonce_and_tag_sizes() {
        let nonce = "00".repeat(NONCE_LEN);
        let tag = "00".repeat(TAG_LEN);
        assert_eq!(
            EncryptedField::decode(&format!("v1:0000:00:{tag}")),
            Err(FormatError::NonceLength(2))
        );
        assert_eq!(
            EncryptedField::decode(&format!("v1:{nonce}:00:0000")),
            Err(FormatError::TagLength(2))
        );
    }

    #[test]
    fn is_encrypted_shape() {
        assert!(is_encrypted(&sample().encode()));
        assert!(is_encrypted("V1:AB:CD:EF"));
        assert!(!is_encrypted("hello@example.com"));
        assert!(!is_encrypted("v1:ab:cd"));
        assert!(!is_encrypted("v1:ab::ef"));
        assert!(!is_encrypted("key1:ab:cd:ef"));
        assert!(!is_encrypted(""));
    }

    #[test]
    fn version_of_encrypted_only() {
        assert_eq!(version_of(&sample().encode()), Some("v3"));
        assert_eq!(version_of("plain text"), None);
        assert_eq!(version_of("v2:zz:zz:zz"), None);
    }
}
