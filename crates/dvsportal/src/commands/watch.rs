//! `watch`: keep the entry loaded and print sensor state on every write.

use std::future::Future;
use std::io::{self, Write};

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::info;

use dvsportal_core::{LoadedEntry, PermitSource, SensorState, setup_portal_entry};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::{self, Resolved};
use crate::error::CliError;
use crate::output;

pub async fn handle(args: WatchArgs, resolved: Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let coordinator = config::with_interval(resolved.coordinator, args.interval);
    let interval = coordinator.update_interval;

    let loaded = setup_portal_entry(resolved.entry, &resolved.transport, coordinator).await?;
    info!(
        profile = %resolved.profile_name,
        sensors = loaded.sensors.len(),
        interval_secs = interval.as_secs(),
        "watching permits"
    );

    run(
        loaded,
        resolved.output,
        global.quiet,
        &mut io::stdout(),
        tokio::signal::ctrl_c(),
    )
    .await;
    Ok(())
}

/// Attach the sensors, print each write until `shutdown` resolves, then
/// unload the entry. Returns the unload result.
async fn run<S, W, F>(
    mut loaded: LoadedEntry<S>,
    format: OutputFormat,
    quiet: bool,
    out: &mut W,
    shutdown: F,
) -> bool
where
    S: PermitSource,
    W: Write,
    F: Future,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<SensorState>();
    loaded.add_entities(|_| {
        let tx = tx.clone();
        move |state: SensorState| {
            let _ = tx.send(state);
        }
    });
    drop(tx);

    let mut updates = loaded.coordinator.updates();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            Some(state) = rx.recv() => {
                if !quiet {
                    let _ = writeln!(out, "{}", output::render_update(format, &state));
                }
            }
            Some(state) = updates.next() => {
                info!(permits = state.permits.len(), "refreshed");
            }
            else => break,
        }
    }

    loaded.unload().await
}
