//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError`, `ConfigError` and config-flow failures into
//! user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use dvsportal_config::ConfigError;
use dvsportal_core::{CoreError, FlowError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const NOT_READY: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to DVSPortal at {host}")]
    #[diagnostic(
        code(dvsportal::connection_failed),
        help(
            "Check the portal host name and your network connection.\n\
             Host: {host}"
        )
    )]
    ConnectionFailed { host: String, reason: String },

    #[error("DVSPortal is not ready: {reason}")]
    #[diagnostic(
        code(dvsportal::not_ready),
        help("The first refresh failed. Try again later or raise --timeout.")
    )]
    NotReady { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(dvsportal::auth_failed),
        help(
            "Verify the identifier and password.\n\
             Run: dvsportal setup --name {profile}"
        )
    )]
    AuthFailed { profile: String },

    #[error("No password configured for profile '{profile}'")]
    #[diagnostic(
        code(dvsportal::no_credentials),
        help(
            "Run: dvsportal setup --name {profile}\n\
             Or set the DVSPORTAL_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Setup ────────────────────────────────────────────────────────
    #[error("Setup failed: unexpected error while validating credentials")]
    #[diagnostic(
        code(dvsportal::unknown),
        help("Re-run with -vv to see the underlying error.")
    )]
    SetupFailed,

    // ── Data ─────────────────────────────────────────────────────────
    #[error("DVSPortal returned data that could not be read: {message}")]
    #[diagnostic(code(dvsportal::invalid_data))]
    InvalidData { message: String },

    #[error("API error: {message}")]
    #[diagnostic(code(dvsportal::api_error))]
    Api { message: String, status: Option<u16> },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(dvsportal::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(dvsportal::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: dvsportal setup --name {name}"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No profile configured")]
    #[diagnostic(
        code(dvsportal::no_config),
        help(
            "Create one with: dvsportal setup\n\
             Or pass --api-host, --identifier and --password.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(dvsportal::config))]
    Config(Box<figment::Error>),

    #[error("Keyring error: {reason}")]
    #[diagnostic(
        code(dvsportal::keyring),
        help("Use --plaintext to store the password in the config file instead.")
    )]
    Keyring { reason: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(dvsportal::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(dvsportal::timeout),
        help("Increase timeout with --timeout or check portal responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotReady { .. } => exit_code::NOT_READY,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::NoConfig { .. }
            | Self::ProfileNotFound { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Translate a config-flow error key for the given setup target.
    pub fn from_flow(err: FlowError, profile: &str, host: &str) -> Self {
        match err {
            FlowError::CannotConnect => Self::ConnectionFailed {
                host: host.into(),
                reason: err.to_string(),
            },
            FlowError::InvalidAuth => Self::AuthFailed {
                profile: profile.into(),
            },
            FlowError::Unknown => Self::SetupFailed,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                host: url,
                reason,
            },
            CoreError::AuthenticationFailed { message: _ } => CliError::AuthFailed {
                profile: "current".into(),
            },
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            // Retrying later will not fix bad credentials.
            CoreError::NotReady { source } => match *source {
                CoreError::AuthenticationFailed { .. } => CliError::AuthFailed {
                    profile: "current".into(),
                },
                CoreError::Timeout { timeout_secs } => CliError::Timeout {
                    seconds: timeout_secs,
                },
                other => CliError::NotReady {
                    reason: other.to_string(),
                },
            },
            CoreError::InvalidData { message } => CliError::InvalidData { message },
            CoreError::Api { message, status } => CliError::Api { message, status },
            CoreError::Config { message } => CliError::Validation {
                field: "api_host".into(),
                reason: message,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: String::new(),
            },
            ConfigError::Keyring(e) => CliError::Keyring {
                reason: e.to_string(),
            },
            ConfigError::Serialization(e) => CliError::Validation {
                field: "config".into(),
                reason: e.to_string(),
            },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
