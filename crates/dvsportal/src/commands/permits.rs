//! `permits`: load the entry once, print every sensor, unload.

use std::time::Duration;

use dvsportal_core::{CoordinatorConfig, SensorState, setup_portal_entry};

use crate::cli::GlobalOpts;
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

pub async fn handle(resolved: Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    // One refresh, no schedule.
    let coordinator = CoordinatorConfig {
        update_interval: Duration::ZERO,
        ..resolved.coordinator
    };

    let loaded = setup_portal_entry(resolved.entry, &resolved.transport, coordinator).await?;
    let sensors: Vec<SensorState> = loaded.sensors.iter().map(|s| s.render()).collect();
    loaded.unload().await;

    let color = output::should_color(resolved.color);
    let rendered = output::render_sensors(resolved.output, &sensors, color);
    output::print_output(&rendered, global.quiet);
    Ok(())
}
