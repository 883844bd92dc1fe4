//! Field-level encryption and searchable hashing for sensitive record attributes.
//!
//! - [`crypto`]: AES-256-GCM per-value encryption with a versioned text format.
//! - [`keyring`]: resolves key versions from settings on every operation.
//! - [`rotation`]: re-encrypts values (or whole record batches) under a new version.
//! - [`token`]: deterministic salted BLAKE2b tokens for equality search.
//! - [`batch`]: map the single-value operations over field maps and JSON paths.
//! - [`vault`]: the handle a data-access layer holds.
//!
//! Nothing here performs I/O beyond reading settings, and nothing is cached
//! between calls.

pub mod batch;
pub mod config;
pub mod crypto;
pub mod error;
pub mod keyring;
pub mod rotation;
pub mod token;
pub mod vault;

pub use config::{EnvSettings, Profile, Settings, SettingsSource};
pub use crypto::{is_encrypted, version_of, EncryptedField, FieldCipher};
pub use error::{ConfigError, FieldVaultError, FormatError};
pub use keyring::{ConfiguredKeyRing, KeyRing, KeyRingDiagnostics, KeyRingProvider};
pub use rotation::{RotatedBatch, RotationReport};
pub use token::SearchTokenGenerator;
pub use vault::{EnvFieldVault, FieldVault, ProtectedValue};
