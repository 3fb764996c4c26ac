//! CLI configuration -- thin wrapper around `dvsportal_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--api-host, --identifier, --password, --timeout).

use std::time::Duration;

use clap::ValueEnum;
use dvsportal_api::TransportConfig;
use dvsportal_core::{ConfigEntry, CoordinatorConfig, EntryData};
use secrecy::SecretString;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use dvsportal_config::{
    Config, Profile, config_path, load_config_or_default, save_config,
};

/// Everything needed to load one entry.
pub struct Resolved {
    pub profile_name: String,
    pub entry: ConfigEntry,
    pub coordinator: CoordinatorConfig,
    pub transport: TransportConfig,
    pub output: OutputFormat,
    pub color: ColorMode,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.default_profile_name().to_owned())
}

/// Build the entry to load from the config file, the active profile and
/// CLI overrides. Without a profile, the flags alone must describe the
/// account.
pub fn resolve_entry(global: &GlobalOpts, cfg: &Config) -> Result<Resolved, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => apply_overrides(profile.clone(), global),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                available: available_profiles(cfg),
                name: profile_name,
            });
        }
        None => {
            let (Some(api_host), Some(identifier)) = (&global.api_host, &global.identifier) else {
                return Err(CliError::NoConfig {
                    path: config_path().display().to_string(),
                });
            };
            Profile {
                api_host: api_host.clone(),
                identifier: identifier.clone(),
                timeout: global.timeout,
                ..Profile::default()
            }
        }
    };

    let mut entry = if let Some(ref pw) = global.password {
        ConfigEntry::new(
            profile
                .title
                .clone()
                .unwrap_or_else(|| profile.identifier.clone()),
            EntryData {
                api_host: profile.api_host.clone(),
                identifier: profile.identifier.clone(),
                password: SecretString::from(pw.clone()),
            },
        )
    } else {
        dvsportal_config::profile_to_entry(&profile, &profile_name)?
    };
    entry.data.api_host = entry.data.api_host.trim().to_owned();
    if entry.data.api_host.is_empty() {
        return Err(CliError::Validation {
            field: "api_host".into(),
            reason: "must not be empty".into(),
        });
    }

    Ok(Resolved {
        output: output_format(global, cfg)?,
        color: color_mode(global, cfg)?,
        coordinator: dvsportal_config::coordinator_config(&cfg.defaults, &profile),
        transport: dvsportal_config::transport_config(&cfg.defaults, &profile),
        profile_name,
        entry,
    })
}

/// `--output`, else `defaults.output` from the config file.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> Result<OutputFormat, CliError> {
    match global.output {
        Some(format) => Ok(format),
        None => parse_default("defaults.output", &cfg.defaults.output),
    }
}

/// `--color`, else `defaults.color` from the config file.
pub fn color_mode(global: &GlobalOpts, cfg: &Config) -> Result<ColorMode, CliError> {
    match global.color {
        Some(mode) => Ok(mode),
        None => parse_default("defaults.color", &cfg.defaults.color),
    }
}

fn parse_default<T: ValueEnum>(field: &str, value: &str) -> Result<T, CliError> {
    T::from_str(value, true).map_err(|reason| CliError::Validation {
        field: field.into(),
        reason,
    })
}

fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref host) = global.api_host {
        profile.api_host.clone_from(host);
    }
    if let Some(ref identifier) = global.identifier {
        profile.identifier.clone_from(identifier);
    }
    if global.timeout.is_some() {
        profile.timeout = global.timeout;
    }
    profile
}

/// Comma-separated profile names, for help text.
pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        return "(none)".into();
    }
    cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
}

/// Scan interval override for `watch`.
pub fn with_interval(mut config: CoordinatorConfig, seconds: Option<u64>) -> CoordinatorConfig {
    if let Some(secs) = seconds {
        config.update_interval = Duration::from_secs(secs);
    }
    config
}
