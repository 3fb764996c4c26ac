//! Shared configuration for DVSPortal tools.
//!
//! TOML profiles (one per configured portal account), credential
//! resolution (env + keyring + plaintext), and translation to the
//! `dvsportal_core` entry and coordinator settings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use dvsportal_api::TransportConfig;
use dvsportal_core::{ConfigEntry, CoordinatorConfig, EntryData};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Keyring service name; the account is `{profile}/password`.
pub const KEYRING_SERVICE: &str = "dvsportal";

/// Environment variable consulted for the password before the keyring.
pub const PASSWORD_ENV: &str = "DVSPORTAL_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named portal profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Per-refresh timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds between scheduled refreshes.
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            scan_interval: default_scan_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    dvsportal_core::REQUEST_TIMEOUT.as_secs()
}
fn default_scan_interval() -> u64 {
    dvsportal_core::SCAN_INTERVAL.as_secs()
}

/// A named portal account (a persisted config entry).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Portal host (e.g. "parkeren.example.nl").
    pub api_host: String,

    /// Account identifier.
    pub identifier: String,

    /// Password (plaintext, prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable name containing the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    /// Entry title; defaults to the identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Override timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Override scan interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_interval: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("nl", "dvsportal", "dvsportal").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("dvsportal");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment.
///
/// Nested keys use a double underscore:
/// `DVSPORTAL_DEFAULTS__TIMEOUT=20`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("DVSPORTAL_").split("__"));

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), profiles = config.profiles.len(), "config loaded");
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

impl Config {
    /// Name of the profile to use when none is given.
    pub fn default_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
}

/// Resolve the password for a profile.
///
/// Order: the profile's `password_env` variable, `DVSPORTAL_PASSWORD`,
/// the system keyring, then plaintext in the config.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. Global env var
    if let Ok(val) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(val));
    }

    // 3. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 4. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password.expose_secret())?;
    Ok(())
}

/// Remove a profile's password from the keyring. A missing entry is
/// not an error.
pub fn delete_password(profile_name: &str) -> Result<(), ConfigError> {
    match keyring_entry(profile_name)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

// ── Translation to core types ───────────────────────────────────────

/// Build a config entry from a profile, resolving the password.
pub fn profile_to_entry(profile: &Profile, profile_name: &str) -> Result<ConfigEntry, ConfigError> {
    if profile.api_host.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "api_host".into(),
            reason: "must not be empty".into(),
        });
    }
    if profile.identifier.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "identifier".into(),
            reason: "must not be empty".into(),
        });
    }

    let password = resolve_password(profile, profile_name)?;
    let title = profile
        .title
        .clone()
        .unwrap_or_else(|| profile.identifier.clone());

    Ok(ConfigEntry::new(
        title,
        EntryData {
            api_host: profile.api_host.clone(),
            identifier: profile.identifier.clone(),
            password,
        },
    ))
}

/// Coordinator settings for a profile: profile overrides, then defaults.
pub fn coordinator_config(defaults: &Defaults, profile: &Profile) -> CoordinatorConfig {
    CoordinatorConfig {
        update_interval: Duration::from_secs(profile.scan_interval.unwrap_or(defaults.scan_interval)),
        request_timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        ..CoordinatorConfig::default()
    }
}

/// HTTP transport settings matching the coordinator timeout.
pub fn transport_config(defaults: &Defaults, profile: &Profile) -> TransportConfig {
    TransportConfig::default()
        .with_timeout(Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::{
        Config, ConfigError, Defaults, Profile, coordinator_config, load_config_from,
        profile_to_entry, save_config_to,
    };

    fn profile() -> Profile {
        Profile {
            api_host: "parkeren.example.nl".into(),
            identifier: "12345".into(),
            password: Some("0000".into()),
            ..Profile::default()
        }
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(cfg.default_profile_name(), "default");
        assert_eq!(cfg.defaults.output, "table");
        assert_eq!(cfg.defaults.timeout, 10);
        assert_eq!(cfg.defaults.scan_interval, 300);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles.insert("home".into(), profile());
        cfg.default_profile = Some("home".into());
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.default_profile_name(), "home");
        let home = loaded.profile("home").unwrap();
        assert_eq!(home.api_host, "parkeren.example.nl");
        assert_eq!(home.password.as_deref(), Some("0000"));
        assert_eq!(home.title, None);
    }

    #[test]
    fn unset_optionals_are_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                password: None,
                ..profile()
            },
        );
        save_config_to(&cfg, &path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("[profiles.home]"));
        assert!(!raw.contains("password"));
        assert!(!raw.contains("title"));
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let err = Config::default().profile("nope").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile { .. }));
    }

    #[test]
    fn entry_uses_identifier_as_title() {
        let entry = profile_to_entry(&profile(), "dvsportal-test-plaintext").unwrap();
        assert_eq!(entry.title, "12345");
        assert_eq!(entry.data.api_host, "parkeren.example.nl");
        assert!(!entry.data.password.expose_secret().is_empty());
    }

    #[test]
    fn empty_host_is_rejected() {
        let bad = Profile {
            api_host: "  ".into(),
            ..profile()
        };
        let err = profile_to_entry(&bad, "x").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "api_host"));
    }

    #[test]
    fn profile_overrides_defaults() {
        let p = Profile {
            timeout: Some(20),
            ..profile()
        };
        let cfg = coordinator_config(&Defaults::default(), &p);
        assert_eq!(cfg.request_timeout, Duration::from_secs(20));
        assert_eq!(cfg.update_interval, Duration::from_secs(300));
    }
}
