//! Error types shared by every fieldvault operation.

use thiserror::Error;

/// Top-level error type for single-value operations.
///
/// Variants map to stable machine-readable codes returned by [`FieldVaultError::code`]:
/// - [`FieldVaultError::Config`] → `config_error`
/// - [`FieldVaultError::Format`] → `format_error`
/// - [`FieldVaultError::Decryption`] → `decryption_error`
/// - [`FieldVaultError::Encryption`] → `encryption_error`
#[derive(Debug, Error)]
pub enum FieldVaultError {
    /// Key ring or salt configuration is unusable for this operation.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The stored value is not a well-formed encrypted field.
    #[error("invalid encrypted field format: {0}")]
    Format(#[from] FormatError),

    /// No key in the ring authenticates the ciphertext.
    ///
    /// Carries no detail: a tampered value and an unknown key look the same.
    #[error("decryption failed")]
    Decryption,

    /// The underlying AEAD failed while encrypting.
    #[error("encryption failed")]
    Encryption,
}

impl FieldVaultError {
    /// Returns the machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            FieldVaultError::Config(_) => "config_error",
            FieldVaultError::Format(_) => "format_error",
            FieldVaultError::Decryption => "decryption_error",
            FieldVaultError::Encryption => "encryption_error",
        }
    }
}

/// Configuration problems. None of these are retryable without fixing settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The requested key version is not in the ring.
    #[error("key version not found: {0}")]
    KeyNotFound(String),

    /// The key resolved for a version is not [`KEY_LEN`](crate::keyring::KEY_LEN) bytes.
    #[error("key {version} has invalid length: expected 32 bytes, got {len}")]
    KeyLengthInvalid {
        /// Version whose key is malformed.
        version: String,
        /// Actual decoded length.
        len: usize,
    },

    /// No search salt is configured and the profile does not permit the fallback.
    #[error("search salt is required outside development/test profiles")]
    MissingSearchSalt,

    /// The settings backend could not be read.
    #[error("settings source unavailable: {0}")]
    Source(String),
}

/// Reasons a string fails to parse as `{version}:{nonce}:{ciphertext}:{tag}`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The value does not split into exactly four `:`-separated segments.
    #[error("expected 4 segments, found {0}")]
    SegmentCount(usize),

    /// A byte segment is not valid hex.
    #[error("{0} segment is not valid hex")]
    InvalidHex(&'static str),

    /// The nonce segment does not decode to 12 bytes.
    #[error("nonce must be 12 bytes, got {0}")]
    NonceLength(usize),

    /// The tag segment does not decode to 16 bytes.
    #[error("tag must be 16 bytes, got {0}")]
    TagLength(usize),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = FieldVaultError> = std::result::Result<T, E>;
