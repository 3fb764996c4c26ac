// ── Entry lifecycle ──
//
// Loading a config entry builds its coordinator, runs the first refresh
// (failure = not ready), starts the schedule and creates the sensors.
// Everything belonging to the entry lives in the returned `LoadedEntry`;
// unloading consumes it.

use dvsportal_api::{DvsPortalClient, TransportConfig};
use futures_util::future::join_all;
use tracing::{debug, info};

use crate::config::{ConfigEntry, CoordinatorConfig};
use crate::coordinator::Coordinator;
use crate::error::CoreError;
use crate::sensor::{ListenerHandle, PermitSensor, StateWriter, setup_sensors};
use crate::source::PermitSource;

/// Runtime context of one loaded config entry.
pub struct LoadedEntry<S: PermitSource> {
    pub entry: ConfigEntry,
    pub coordinator: Coordinator<S>,
    pub sensors: Vec<PermitSensor<S>>,
    listeners: Vec<ListenerHandle>,
}

/// Load `entry` using an already-built source.
pub async fn setup_entry<S: PermitSource>(
    entry: ConfigEntry,
    source: S,
    config: CoordinatorConfig,
) -> Result<LoadedEntry<S>, CoreError> {
    let coordinator = Coordinator::new(source, config);

    coordinator
        .refresh()
        .await
        .map_err(|e| CoreError::NotReady {
            source: Box::new(e),
        })?;

    coordinator.start().await;
    let sensors = setup_sensors(&coordinator);
    info!(
        entry_id = %entry.entry_id,
        title = %entry.title,
        sensors = sensors.len(),
        "DVSPortal entry loaded"
    );

    Ok(LoadedEntry {
        entry,
        coordinator,
        sensors,
        listeners: Vec::new(),
    })
}

/// Load `entry` against the real portal.
pub async fn setup_portal_entry(
    entry: ConfigEntry,
    transport: &TransportConfig,
    config: CoordinatorConfig,
) -> Result<LoadedEntry<DvsPortalClient>, CoreError> {
    let client = DvsPortalClient::new(
        &entry.data.api_host,
        entry.data.identifier.clone(),
        entry.data.password.clone(),
        transport,
    )?;
    setup_entry(entry, client, config).await
}

impl<S: PermitSource> LoadedEntry<S> {
    /// Attach every sensor to the host. `make_writer` is called once per
    /// sensor.
    pub fn add_entities<W, F>(&mut self, mut make_writer: F)
    where
        W: StateWriter,
        F: FnMut(&PermitSensor<S>) -> W,
    {
        for sensor in &self.sensors {
            let writer = make_writer(sensor);
            self.listeners.push(sensor.added_to_host(writer));
        }
    }

    /// Detach all sensors and stop polling. Returns `true` once the entry
    /// is fully unloaded.
    pub async fn unload(self) -> bool {
        let listeners = self.listeners.len();
        join_all(self.listeners.into_iter().map(ListenerHandle::remove)).await;
        self.coordinator.shutdown().await;
        debug!(entry_id = %self.entry.entry_id, listeners, "DVSPortal entry unloaded");
        true
    }
}
