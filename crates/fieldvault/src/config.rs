//! Settings consumed by the key ring and the search token generator.
//!
//! Settings are plain strings resolved at call time. Nothing here is cached:
//! every operation asks its [`SettingsSource`] for a fresh [`Settings`]
//! snapshot, so adding or rotating keys takes effect without a restart.
//!
//! | Setting          | Environment variable          |
//! |------------------|-------------------------------|
//! | `keys`           | `FIELDVAULT_KEYS`             |
//! | `key_<version>`  | `FIELDVAULT_KEY_V2`, ...      |
//! | `current_key_id` | `FIELDVAULT_CURRENT_KEY_ID`   |
//! | `search_salt`    | `FIELDVAULT_SEARCH_SALT`      |
//! | `profile`        | `FIELDVAULT_PROFILE`          |

use std::collections::BTreeMap;

use crate::error::ConfigError;

/// Environment variable prefix read by [`EnvSettings::default`].
pub const ENV_PREFIX: &str = "FIELDVAULT";

/// Consolidated key list: `v1:<key>,v2:<key>` or a single bare key.
pub const KEYS: &str = "keys";

/// Prefix of discrete per-version key settings (`key_v2`).
pub const KEY_PREFIX: &str = "key_";

/// Version used for new encryptions when callers do not name one.
pub const CURRENT_KEY_ID: &str = "current_key_id";

/// Salt mixed into every search token.
pub const SEARCH_SALT: &str = "search_salt";

/// Deployment profile, see [`Profile`].
pub const PROFILE: &str = "profile";

/// Deployment profile controlling whether insecure fallbacks are permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    /// Missing secrets are errors. Used when no profile is configured.
    #[default]
    Production,
    /// Local development; built-in fallbacks allowed.
    Development,
    /// Automated tests; built-in fallbacks allowed.
    Test,
}

impl Profile {
    /// Parse a profile name; unknown names map to [`Profile::Production`].
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Profile::Development,
            "test" => Profile::Test,
            _ => Profile::Production,
        }
    }

    /// Whether the published fallback salt may be used.
    pub fn allows_insecure_defaults(self) -> bool {
        matches!(self, Profile::Development | Profile::Test)
    }
}

/// An immutable snapshot of settings, keyed by lowercase setting name.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

impl Settings {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert. Names are normalised to lowercase.
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.values
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Look up a setting by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Look up a setting, treating blank values as absent.
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.trim().is_empty())
    }

    /// Iterate discrete key settings as `(version, encoded key)` pairs.
    ///
    /// `key_v2` yields version `v2`. A bare `key_` setting is ignored.
    pub fn discrete_keys(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().filter_map(|(name, value)| {
            name.strip_prefix(KEY_PREFIX)
                .filter(|version| !version.is_empty())
                .map(|version| (version, value.as_str()))
        })
    }

    /// The configured deployment profile.
    pub fn profile(&self) -> Profile {
        self.get(PROFILE).map(Profile::parse).unwrap_or_default()
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Values are secrets; only names are printed.
        f.debug_struct("Settings")
            .field("names", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Settings::new(), |s, (k, v)| s.with(k, v))
    }
}

/// Somewhere settings can be read from on demand.
#[cfg_attr(test, mockall::automock)]
pub trait SettingsSource: Send + Sync {
    /// Read the current settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Source`] if the backend cannot be read.
    fn snapshot(&self) -> Result<Settings, ConfigError>;
}

/// A fixed snapshot is its own source. Used by tests and embedders that
/// manage configuration themselves.
impl SettingsSource for Settings {
    fn snapshot(&self) -> Result<Settings, ConfigError> {
        Ok(self.clone())
    }
}

/// Reads `<PREFIX>_*` environment variables on every snapshot.
#[derive(Debug, Clone)]
pub struct EnvSettings {
    prefix: String,
}

impl EnvSettings {
    /// Read variables named `<prefix>_<SETTING>`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for EnvSettings {
    fn default() -> Self {
        Self::with_prefix(ENV_PREFIX)
    }
}

impl SettingsSource for EnvSettings {
    fn snapshot(&self) -> Result<Settings, ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(&self.prefix))
            .build()
            .map_err(|e| ConfigError::Source(e.to_string()))?;

        let values: BTreeMap<String, String> = cfg
            .try_deserialize()
            .map_err(|e| ConfigError::Source(e.to_string()))?;

        Ok(values.into_iter().collect())
    }
}
