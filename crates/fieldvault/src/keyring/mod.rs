//! Key ring resolution from settings, and the provider seam used by the cipher.
//!
//! # Lifecycle
//!
//! 1. A [`KeyRingProvider`] is handed to the [`FieldCipher`](crate::crypto::FieldCipher).
//! 2. Every cipher operation calls [`KeyRingProvider::snapshot`], which for
//!    [`ConfiguredKeyRing`] re-reads settings and runs [`resolve`].
//! 3. The resulting [`KeyRing`] lives only for that operation.
//!
//! # Resolution rules
//!
//! - The consolidated `keys` setting is read first, then every discrete
//!   `key_<version>` setting. A later definition of the same version replaces
//!   the earlier one, so discrete settings win.
//! - At most [`MAX_KEY_VERSIONS`] versions are kept. The limit is applied
//!   after merging and never evicts the default version.
//! - Malformed entries are skipped, never fatal. Skips are reported to an
//!   optional [`KeyRingDiagnostics`] hook.
//! - The default version is `current_key_id` when it looks like `v<digits>`,
//!   otherwise [`FALLBACK_VERSION`].

pub mod parse;
pub mod ring;

pub use parse::{EntryOrigin, KeyEncoding, KeyEntry, ParsedKey, SkipReason, SkippedEntry};
pub use ring::{KeyBytes, KeyRing, KEY_LEN};

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use crate::config::{Settings, SettingsSource, CURRENT_KEY_ID, KEYS};
use crate::error::ConfigError;

/// Default version when no valid `current_key_id` is configured.
pub const FALLBACK_VERSION: &str = "v1";

/// Upper bound on versions held by one ring. Bounds fallback decryption work.
pub const MAX_KEY_VERSIONS: usize = 32;

static CANONICAL_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v\d+$").expect("valid version regex"));

/// Returns `true` for version labels of the form `v<digits>`.
pub fn is_canonical_version(version: &str) -> bool {
    CANONICAL_VERSION.is_match(version)
}

/// The version new encryptions use when the caller does not choose one.
pub fn default_version(settings: &Settings) -> String {
    settings
        .get(CURRENT_KEY_ID)
        .map(str::trim)
        .filter(|id| is_canonical_version(id))
        .unwrap_or(FALLBACK_VERSION)
        .to_owned()
}

/// A resolved ring together with every parsed and skipped entry.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The usable ring.
    pub ring: KeyRing,
    /// Entries that made it into the ring, in resolution order.
    pub parsed: Vec<ParsedKey>,
    /// Entries that were ignored.
    pub skipped: Vec<SkippedEntry>,
}

/// Build a [`KeyRing`] from a settings snapshot.
pub fn resolve(settings: &Settings) -> Resolution {
    let default = default_version(settings);

    let mut entries = settings
        .get(KEYS)
        .map(|value| parse::parse_consolidated(value, &default))
        .unwrap_or_default();
    entries.extend(settings.discrete_keys().map(|(version, value)| {
        let setting = format!("{}{version}", crate::config::KEY_PREFIX);
        parse::parse_pair(version, value, EntryOrigin::Discrete { setting })
    }));

    // Version -> (arrival position, entry). Later arrivals replace earlier ones.
    let mut accepted: BTreeMap<String, (usize, ParsedKey)> = BTreeMap::new();
    let mut skipped = Vec::new();

    for (position, entry) in entries.into_iter().enumerate() {
        let key = match entry {
            KeyEntry::Parsed(key) => key,
            KeyEntry::Skipped(skip) => {
                skipped.push(skip);
                continue;
            }
        };

        if let Some((_, previous)) = accepted.insert(key.version.clone(), (position, key)) {
            skipped.push(SkippedEntry {
                reason: SkipReason::Superseded {
                    version: previous.version,
                },
                origin: previous.origin,
            });
        }
    }

    enforce_limit(&mut accepted, &default, &mut skipped);

    let mut ring = KeyRing::new(default);
    let mut parsed = Vec::with_capacity(accepted.len());
    for (version, (_, key)) in accepted {
        ring.insert(version, key.key.clone());
        parsed.push(key);
    }

    Resolution {
        ring,
        parsed,
        skipped,
    }
}

/// Trim `accepted` to [`MAX_KEY_VERSIONS`].
///
/// The default version is never evicted. Consolidated entries go before
/// discrete ones, and within each group the latest arrival goes first.
fn enforce_limit(
    accepted: &mut BTreeMap<String, (usize, ParsedKey)>,
    default: &str,
    skipped: &mut Vec<SkippedEntry>,
) {
    let overflow = accepted.len().saturating_sub(MAX_KEY_VERSIONS);
    if overflow == 0 {
        return;
    }

    let mut evictable: Vec<(bool, Reverse<usize>, String)> = accepted
        .iter()
        .filter(|(version, _)| version.as_str() != default)
        .map(|(version, (position, key))| {
            let discrete = matches!(key.origin, EntryOrigin::Discrete { .. });
            (discrete, Reverse(*position), version.clone())
        })
        .collect();
    evictable.sort();

    for (_, _, version) in evictable.into_iter().take(overflow) {
        if let Some((_, key)) = accepted.remove(&version) {
            skipped.push(SkippedEntry {
                reason: SkipReason::TooManyVersions { version },
                origin: key.origin,
            });
        }
    }
}

/// Receives entries skipped during resolution.
///
/// Any `Fn(&SkippedEntry) + Send + Sync` closure implements this trait.
pub trait KeyRingDiagnostics: Send + Sync {
    /// Called once per skipped entry, on every resolution.
    fn on_skipped(&self, entry: &SkippedEntry);
}

impl<F> KeyRingDiagnostics for F
where
    F: Fn(&SkippedEntry) + Send + Sync,
{
    fn on_skipped(&self, entry: &SkippedEntry) {
        self(entry)
    }
}

/// Supplies a fresh, immutable [`KeyRing`] for each operation.
pub trait KeyRingProvider: Send + Sync {
    /// Take a snapshot of the currently configured ring.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Source`] if the underlying settings cannot be read.
    fn snapshot(&self) -> Result<KeyRing, ConfigError>;
}

/// A fixed ring is its own provider.
impl KeyRingProvider for KeyRing {
    fn snapshot(&self) -> Result<KeyRing, ConfigError> {
        Ok(self.clone())
    }
}

/// Rebuilds the ring from a [`SettingsSource`] on every snapshot.
#[derive(Clone)]
pub struct ConfiguredKeyRing<S> {
    source: S,
    diagnostics: Option<Arc<dyn KeyRingDiagnostics>>,
}

impl<S: SettingsSource> ConfiguredKeyRing<S> {
    /// Create a provider reading from `source`.
    pub fn new(source: S) -> Self {
        Self {
            source,
            diagnostics: None,
        }
    }

    /// Report skipped entries to `hook` on every resolution.
    pub fn with_diagnostics(mut self, hook: impl KeyRingDiagnostics + 'static) -> Self {
        self.diagnostics = Some(Arc::new(hook));
        self
    }

    /// Resolve the ring, returning the full per-entry breakdown.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Source`] if the settings cannot be read.
    pub fn resolve(&self) -> Result<Resolution, ConfigError> {
        let settings = self.source.snapshot()?;
        let resolution = resolve(&settings);
        for skip in &resolution.skipped {
            debug!(origin = %skip.origin, reason = %skip.reason, "key entry skipped");
            if let Some(hook) = &self.diagnostics {
                hook.on_skipped(skip);
            }
        }
        Ok(resolution)
    }
}

impl<S: SettingsSource> KeyRingProvider for ConfiguredKeyRing<S> {
    fn snapshot(&self) -> Result<KeyRing, ConfigError> {
        self.resolve().map(|r| r.ring)
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for ConfiguredKeyRing<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguredKeyRing")
            .field("source", &self.source)
            .field("diagnostics", &self.diagnostics.is_some())
            .finish()
    }
}
