//! Command handlers.

pub mod config_cmd;
pub mod permits;
pub mod setup;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;

/// Dispatch a command that needs a loaded entry.
pub async fn dispatch(cmd: Command, resolved: Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Permits => permits::handle(resolved, global).await,
        Command::Watch(args) => watch::handle(args, resolved, global).await,
        Command::Setup(_) | Command::Config(_) | Command::Completions(_) => {
            unreachable!("handled before dispatch")
        }
    }
}
