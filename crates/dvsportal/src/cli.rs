//! Clap derive structures for the `dvsportal` CLI.
//!
//! Defines the command tree, global flags, and shared types. Also compiled
//! into the build script for man page generation, so it depends on clap
//! and clap_complete only.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// dvsportal -- parking-permit sensors from the command line
#[derive(Debug, Parser)]
#[command(
    name = "dvsportal",
    version,
    about = "Watch DVSPortal parking permits from the command line",
    long_about = "Connects to a DVSPortal parking-permit portal, polls the account\n\
        and shows one sensor per permit: the plate of its active\n\
        reservation plus reservation details.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Profile (config entry) to use
    #[arg(long, short = 'p', env = "DVSPORTAL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Portal host (overrides profile)
    #[arg(long, env = "DVSPORTAL_API_HOST", global = true)]
    pub api_host: Option<String>,

    /// Account identifier (overrides profile)
    #[arg(long, env = "DVSPORTAL_IDENTIFIER", global = true)]
    pub identifier: Option<String>,

    /// Account password
    #[arg(long, env = "DVSPORTAL_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format [default: `defaults.output` from config, else table]
    #[arg(long, short = 'o', env = "DVSPORTAL_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: `defaults.color` from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Per-refresh timeout in seconds (overrides profile)
    #[arg(long, env = "DVSPORTAL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one sensor per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate credentials and save them as a profile
    Setup(SetupArgs),

    /// Load the profile once and show every permit sensor
    #[command(alias = "ls")]
    Permits,

    /// Keep polling and print sensor state as it changes
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct SetupArgs {
    /// Name of the profile to create or replace
    #[arg(long, default_value = "default")]
    pub name: String,

    /// Store the password in the config file instead of the system keyring
    #[arg(long)]
    pub plaintext: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between refreshes (overrides profile)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the configuration with secrets masked
    Show,

    /// Print the config file path
    Path,

    /// Remove a profile and its stored password
    Remove {
        /// Profile name
        name: String,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
