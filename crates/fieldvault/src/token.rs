//! Deterministic, salted search tokens for equality lookup.
//!
//! `token = hex(BLAKE2b-512(salt || normalize(value))[..32])`
//!
//! Normalisation trims surrounding whitespace and lowercases, so
//! `"  Test@Example.COM "` and `"test@example.com"` share a token. Tokens are
//! not versioned: changing the salt invalidates every stored token.

use blake2::{Blake2b512, Digest};
use tracing::debug;

use crate::config::{Settings, SettingsSource, SEARCH_SALT};
use crate::error::{ConfigError, Result};

/// Bytes of digest kept in a token (64 hex characters).
pub const TOKEN_LEN: usize = 32;

/// Salt used when none is configured under a development or test profile.
///
/// Published here, so it must never protect production data.
pub const FALLBACK_SEARCH_SALT: &str = "fieldvault-dev-only-search-salt";

/// Trim and lowercase a value before hashing.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Compute the token for `value` under `salt`.
pub fn derive_token(salt: &[u8], value: &str) -> String {
    let normalized = normalize(value);
    let mut hasher = Blake2b512::new();
    hasher.update(salt);
    hasher.update(normalized.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..TOKEN_LEN])
}

/// The salt configured in `settings`.
///
/// # Errors
///
/// Returns [`ConfigError::MissingSearchSalt`] when no salt is set and the
/// profile does not allow [`FALLBACK_SEARCH_SALT`].
pub fn resolve_salt(settings: &Settings) -> Result<String, ConfigError> {
    if let Some(salt) = settings.get_non_empty(SEARCH_SALT) {
        return Ok(salt.to_owned());
    }
    let profile = settings.profile();
    if profile.allows_insecure_defaults() {
        debug!(?profile, "search salt not configured; using fallback");
        return Ok(FALLBACK_SEARCH_SALT.to_owned());
    }
    Err(ConfigError::MissingSearchSalt)
}

/// Produces search tokens using the salt from a [`SettingsSource`].
#[derive(Debug, Clone)]
pub struct SearchTokenGenerator<S> {
    source: S,
}

impl<S: SettingsSource> SearchTokenGenerator<S> {
    /// Create a generator reading its salt from `source` on every call.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Token for `value`, or an empty string if `value` is empty.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the salt is missing outside
    /// development/test profiles, or the settings cannot be read.
    pub fn make_token(&self, value: &str) -> Result<String> {
        if value.is_empty() {
            return Ok(String::new());
        }
        let settings = self.source.snapshot()?;
        let salt = resolve_salt(&settings)?;
        Ok(derive_token(salt.as_bytes(), value))
    }
}
