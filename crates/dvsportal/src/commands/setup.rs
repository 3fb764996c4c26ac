//! `setup`: run the config flow and save the entry as a profile.

use std::io::IsTerminal;
use std::time::Duration;

use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::{ExposeSecret, SecretString};

use dvsportal_api::{DvsPortalClient, TransportConfig};
use dvsportal_core::flow::{DATA_SCHEMA, FieldKind};
use dvsportal_core::{ConfigFlow, EntryData, FlowError, FlowResult};

use crate::cli::{GlobalOpts, SetupArgs};
use crate::config::{self, Profile};
use crate::error::CliError;

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Fill in the form: flags first, prompts for whatever is missing.
fn collect_input(global: &GlobalOpts) -> Result<EntryData, CliError> {
    let interactive = std::io::stdin().is_terminal();
    let mut api_host = global.api_host.clone();
    let mut identifier = global.identifier.clone();
    let mut password = global.password.clone();

    for field in DATA_SCHEMA {
        let slot = match field.key {
            "api_host" => &mut api_host,
            "identifier" => &mut identifier,
            "password" => &mut password,
            _ => continue,
        };
        if slot.as_deref().is_some_and(|v| !v.is_empty()) {
            continue;
        }
        if !interactive {
            return Err(CliError::Validation {
                field: field.key.into(),
                reason: format!("missing; pass --{}", field.key.replace('_', "-")),
            });
        }
        let value = match field.kind {
            FieldKind::Text => Input::<String>::new()
                .with_prompt(field.label)
                .interact_text()
                .map_err(prompt_err)?,
            FieldKind::Password => {
                rpassword::prompt_password(format!("{}: ", field.label)).map_err(prompt_err)?
            }
        };
        if field.required && value.trim().is_empty() {
            return Err(CliError::Validation {
                field: field.key.into(),
                reason: "cannot be empty".into(),
            });
        }
        *slot = Some(value);
    }

    Ok(EntryData {
        api_host: api_host.unwrap_or_default().trim().to_owned(),
        identifier: identifier.unwrap_or_default().trim().to_owned(),
        password: SecretString::from(password.unwrap_or_default()),
    })
}

fn spinner(quiet: bool, host: &str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(format!("Checking credentials with {host}"));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub async fn handle(args: SetupArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let data = collect_input(global)?;
    let host = data.api_host.clone();
    let transport = TransportConfig::default()
        .with_timeout(Duration::from_secs(global.timeout.unwrap_or(10)));

    let pb = spinner(global.quiet, &host);
    let result = ConfigFlow::step_user(Some(data), |d| {
        DvsPortalClient::new(&d.api_host, d.identifier.clone(), d.password.clone(), &transport)
    })
    .await;
    pb.finish_and_clear();

    let (title, data) = match result {
        FlowResult::CreateEntry { title, data } => (title, data),
        FlowResult::ShowForm { errors, .. } => {
            let err = errors
                .get("base")
                .and_then(|key| key.parse().ok())
                .unwrap_or(FlowError::Unknown);
            return Err(CliError::from_flow(err, &args.name, &host));
        }
    };

    save_profile(&args, title, data, global.quiet)
}

fn save_profile(
    args: &SetupArgs,
    title: String,
    data: EntryData,
    quiet: bool,
) -> Result<(), CliError> {
    let mut cfg = config::load_config_or_default();

    let password = if args.plaintext {
        Some(data.password.expose_secret().to_owned())
    } else {
        dvsportal_config::store_password(&args.name, &data.password)?;
        None
    };

    cfg.profiles.insert(
        args.name.clone(),
        Profile {
            api_host: data.api_host,
            identifier: data.identifier,
            password,
            title: Some(title.clone()),
            ..Profile::default()
        },
    );
    if cfg.profiles.len() == 1 || cfg.default_profile.is_none() {
        cfg.default_profile = Some(args.name.clone());
    }
    config::save_config(&cfg)?;

    if !quiet {
        eprintln!(
            "✓ Saved profile '{}' ({title}) to {}",
            args.name,
            config::config_path().display()
        );
    }
    Ok(())
}
