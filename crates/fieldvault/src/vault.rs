//! [`FieldVault`]: the cipher and the token generator behind one handle.
//!
//! This is what a data-access layer holds. Before writing a sensitive field
//! it calls [`FieldVault::protect`] and stores both outputs; on read it calls
//! [`FieldVault::reveal`]; to search it compares [`FieldVault::search_token`]
//! against stored tokens.

use serde::{Deserialize, Serialize};

use crate::config::{EnvSettings, SettingsSource};
use crate::crypto::{is_encrypted, FieldCipher};
use crate::error::Result;
use crate::keyring::{ConfiguredKeyRing, KeyRingProvider};
use crate::token::SearchTokenGenerator;

/// Ciphertext and search token for one value, to be stored side by side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedValue {
    /// `{version}:{nonce}:{ciphertext}:{tag}`, or empty for an empty value.
    pub ciphertext: String,
    /// 64 lowercase hex characters, or empty for an empty value.
    pub search_token: String,
}

/// Field cipher plus search token generator.
#[derive(Debug, Clone)]
pub struct FieldVault<P, S> {
    cipher: FieldCipher<P>,
    tokens: SearchTokenGenerator<S>,
}

/// A vault configured from `FIELDVAULT_*` environment variables.
pub type EnvFieldVault = FieldVault<ConfiguredKeyRing<EnvSettings>, EnvSettings>;

impl EnvFieldVault {
    /// Build a vault that re-reads the environment on every operation.
    pub fn from_env() -> Self {
        Self::from_settings(EnvSettings::default())
    }
}

impl<S: SettingsSource + Clone> FieldVault<ConfiguredKeyRing<S>, S> {
    /// Build a vault whose keys and salt both come from `source`.
    pub fn from_settings(source: S) -> Self {
        Self::new(
            FieldCipher::new(ConfiguredKeyRing::new(source.clone())),
            SearchTokenGenerator::new(source),
        )
    }
}

impl<P: KeyRingProvider, S: SettingsSource> FieldVault<P, S> {
    /// Assemble a vault from its parts.
    pub fn new(cipher: FieldCipher<P>, tokens: SearchTokenGenerator<S>) -> Self {
        Self { cipher, tokens }
    }

    /// The underlying cipher, for rotation and batch helpers.
    pub fn cipher(&self) -> &FieldCipher<P> {
        &self.cipher
    }

    /// Encrypt `value` under the default version and derive its search token.
    ///
    /// # Errors
    ///
    /// Propagates cipher and token configuration errors.
    pub fn protect(&self, value: &str) -> Result<ProtectedValue> {
        Ok(ProtectedValue {
            ciphertext: self.cipher.encrypt(value)?,
            search_token: self.tokens.make_token(value)?,
        })
    }

    /// Decrypt a stored ciphertext.
    ///
    /// # Errors
    ///
    /// See [`FieldCipher::decrypt`].
    pub fn reveal(&self, ciphertext: &str) -> Result<String> {
        self.cipher.decrypt(ciphertext)
    }

    /// Token to compare against stored tokens when searching for `query`.
    ///
    /// # Errors
    ///
    /// See [`SearchTokenGenerator::make_token`].
    pub fn search_token(&self, query: &str) -> Result<String> {
        self.tokens.make_token(query)
    }

    /// Protect a legacy stored value, unless it is already encrypted.
    ///
    /// Returns `None` for values that already look encrypted, so a migration
    /// can be re-run over partially converted data.
    ///
    /// # Errors
    ///
    /// Same as [`FieldVault::protect`].
    pub fn migrate(&self, stored: &str) -> Result<Option<ProtectedValue>> {
        if is_encrypted(stored) {
            return Ok(None);
        }
        self.protect(stored).map(Some)
    }
}
