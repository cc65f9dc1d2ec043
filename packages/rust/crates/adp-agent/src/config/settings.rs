//! Runtime settings loader.
//!
//! Loads and merges:
//! - System defaults: `<PRJ_ROOT>/packages/conf/adp.yaml`
//! - User overrides:  `<PRJ_CONFIG_HOME>/adp/settings.yaml`
//!
//! Merge precedence is user over system; `ADP_*` environment variables win
//! over both when resolving the effective [`DispatcherConfig`].

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use serde::Deserialize;

use super::dispatcher::DispatcherConfig;

const DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH: &str = "packages/conf/adp.yaml";
const DEFAULT_USER_SETTINGS_RELATIVE_PATH: &str = "adp/settings.yaml";
const DEFAULT_CONFIG_HOME_RELATIVE_PATH: &str = ".config";
const DISCOVERY_TIMEOUT_ENV: &str = "ADP_DISCOVERY_TIMEOUT_MS";
const OPERATION_TIMEOUT_ENV: &str = "ADP_OPERATION_TIMEOUT_MS";
const MIN_CONFIDENCE_ENV: &str = "ADP_MIN_CONFIDENCE";
static CONFIG_HOME_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

/// Raw settings file contents; every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeSettings {
    /// `discovery:` section.
    #[serde(default)]
    pub discovery: DiscoverySettings,
    /// `dispatch:` section.
    #[serde(default)]
    pub dispatch: DispatchSettings,
    /// `matcher:` section.
    #[serde(default)]
    pub matcher: MatcherSettings,
}

/// `discovery:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoverySettings {
    /// Self-description round-trip timeout.
    pub timeout_ms: Option<u64>,
    /// Scan recent responses when `Info` yields nothing.
    pub fallback_scan_enabled: Option<bool>,
    /// Cache stats log interval.
    pub cache_stats_log_interval_secs: Option<u64>,
}

/// `dispatch:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispatchSettings {
    /// Final read/write round-trip timeout.
    pub operation_timeout_ms: Option<u64>,
}

/// `matcher:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatcherSettings {
    /// Acceptance floor in `[0, 1]`.
    pub min_confidence: Option<f64>,
}

impl RuntimeSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            discovery: self.discovery.merge(overlay.discovery),
            dispatch: self.dispatch.merge(overlay.dispatch),
            matcher: self.matcher.merge(overlay.matcher),
        }
    }

    /// Effective dispatcher configuration: env over file over defaults.
    #[must_use]
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        let defaults = DispatcherConfig::default();
        let mut config = defaults;

        config.discovery.timeout_ms = env_override::<u64>(DISCOVERY_TIMEOUT_ENV, |v| *v > 0)
            .or(self.discovery.timeout_ms.filter(|value| *value > 0))
            .unwrap_or(defaults.discovery.timeout_ms);
        config.discovery.fallback_scan_enabled = self
            .discovery
            .fallback_scan_enabled
            .unwrap_or(defaults.discovery.fallback_scan_enabled);
        config.discovery.cache_stats_log_interval_secs = self
            .discovery
            .cache_stats_log_interval_secs
            .filter(|value| *value > 0)
            .unwrap_or(defaults.discovery.cache_stats_log_interval_secs);
        config.operation_timeout_ms = env_override::<u64>(OPERATION_TIMEOUT_ENV, |v| *v > 0)
            .or(self.dispatch.operation_timeout_ms.filter(|value| *value > 0))
            .unwrap_or(defaults.operation_timeout_ms);
        config.min_confidence = env_override::<f64>(MIN_CONFIDENCE_ENV, |v| (0.0..=1.0).contains(v))
            .or(self.matcher.min_confidence.filter(|value| value.is_finite()))
            .map_or(defaults.min_confidence, |value| value.clamp(0.0, 1.0));
        config
    }
}

impl DiscoverySettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            timeout_ms: overlay.timeout_ms.or(self.timeout_ms),
            fallback_scan_enabled: overlay.fallback_scan_enabled.or(self.fallback_scan_enabled),
            cache_stats_log_interval_secs: overlay
                .cache_stats_log_interval_secs
                .or(self.cache_stats_log_interval_secs),
        }
    }
}

impl DispatchSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            operation_timeout_ms: overlay.operation_timeout_ms.or(self.operation_timeout_ms),
        }
    }
}

impl MatcherSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            min_confidence: overlay.min_confidence.or(self.min_confidence),
        }
    }
}

/// Load system + user settings from the standard locations.
#[must_use]
pub fn load_runtime_settings() -> RuntimeSettings {
    let (system_path, user_path) = runtime_settings_paths();
    load_runtime_settings_from_paths(&system_path, &user_path)
}

/// `(system, user)` settings file paths.
///
/// The user file lives under the config home: the `--conf` override, else
/// `PRJ_CONFIG_HOME`, else `.config`; relative homes resolve against the
/// project root (`PRJ_ROOT`, else cwd).
#[doc(hidden)]
#[must_use]
pub fn runtime_settings_paths() -> (PathBuf, PathBuf) {
    let root = env_path("PRJ_ROOT")
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let home = CONFIG_HOME_OVERRIDE
        .get()
        .cloned()
        .or_else(|| env_path("PRJ_CONFIG_HOME"))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_HOME_RELATIVE_PATH));
    let home = if home.is_absolute() { home } else { root.join(home) };
    (
        root.join(DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH),
        home.join(DEFAULT_USER_SETTINGS_RELATIVE_PATH),
    )
}

/// Load and merge two explicit settings files (user over system).
#[doc(hidden)]
#[must_use]
pub fn load_runtime_settings_from_paths(system: &Path, user: &Path) -> RuntimeSettings {
    load_one(system).merge(load_one(user))
}

fn load_one(path: &Path) -> RuntimeSettings {
    if !path.exists() {
        return RuntimeSettings::default();
    }
    let parsed = std::fs::read_to_string(path)
        .map_err(|error| error.to_string())
        .and_then(|raw| {
            serde_yaml::from_str::<Option<RuntimeSettings>>(&raw).map_err(|error| error.to_string())
        });
    match parsed {
        Ok(settings) => settings.unwrap_or_default(),
        Err(error) => {
            tracing::warn!(
                event = "adp.settings.load_failed",
                path = %path.display(),
                error = %error,
                "settings file unreadable or malformed; using defaults for it"
            );
            RuntimeSettings::default()
        }
    }
}

/// Override the config home (CLI `--conf`). First call wins.
///
/// Relative paths resolve against `PRJ_ROOT` or the cwd.
pub fn set_config_home_override(path: impl Into<PathBuf>) {
    let path = path.into();
    if path.as_os_str().is_empty() {
        return;
    }
    if let Err(rejected) = CONFIG_HOME_OVERRIDE.set(path) {
        tracing::warn!(
            event = "adp.settings.config_home_ignored",
            ignored = %rejected.display(),
            "config home already overridden; keeping the first value"
        );
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    let raw = std::env::var(name).ok()?;
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

/// Parsed env override, or `None` (with a warning) when unset, unparsable or
/// rejected by `accept`.
fn env_override<T: FromStr>(name: &str, accept: impl Fn(&T) -> bool) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    let parsed = raw.trim().parse::<T>().ok().filter(|value| accept(value));
    if parsed.is_none() {
        tracing::warn!(
            event = "adp.settings.invalid_env",
            env_var = %name,
            value = %raw,
            "ignoring invalid env override"
        );
    }
    parsed
}
