// ── Permit sensors ──
//
// One read-only entity per cached permit. Entities never poll: they
// render from the coordinator's current state and re-render whenever
// the coordinator publishes a successful refresh.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::config::DOMAIN;
use crate::coordinator::{Coordinator, CoordinatorState};
use crate::model::{Permit, Timestamp};
use crate::source::PermitSource;

// ── Rendered output ──────────────────────────────────────────────

/// Attributes of a permit sensor.
///
/// Reservation fields are present only while the permit has an active
/// reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermitAttributes {
    pub type_id: i64,
    pub code: String,
    pub zone_code: String,
    #[serde(flatten)]
    pub reservation: Option<ReservationAttributes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationAttributes {
    pub reservation_id: String,
    pub reservation_valid_from: Timestamp,
    pub reservation_valid_until: Timestamp,
    /// Label of the reserved plate, if the account named it.
    pub reservation_license_plate_name: Option<String>,
}

impl PermitAttributes {
    pub fn from_permit(permit: &Permit) -> Self {
        let reservation = permit.active_reservation().map(|r| ReservationAttributes {
            reservation_id: r.id.clone(),
            reservation_valid_from: r.valid_from,
            reservation_valid_until: r.valid_until,
            reservation_license_plate_name: permit.plate_name(&r.license_plate).map(str::to_owned),
        });

        Self {
            type_id: permit.type_id,
            code: permit.code.clone(),
            zone_code: permit.zone_code.clone(),
            reservation,
        }
    }
}

/// Everything the host needs to display one sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorState {
    pub unique_id: String,
    pub name: String,
    /// License plate of the active reservation.
    pub state: Option<String>,
    pub available: bool,
    pub attributes: Option<PermitAttributes>,
}

/// Receives rendered sensor state; the host side of an entity.
pub trait StateWriter: Send + Sync + 'static {
    fn write_state(&self, state: SensorState);
}

impl<F> StateWriter for F
where
    F: Fn(SensorState) + Send + Sync + 'static,
{
    fn write_state(&self, state: SensorState) {
        self(state);
    }
}

// ── PermitSensor ─────────────────────────────────────────────────

/// Sensor bound to a position in the coordinator's permit list.
///
/// `unique_id` and `name` are fixed from the permit at that position when
/// the sensor is created. State and attributes are always read from
/// whatever permit currently sits at the position; if the list has
/// shrunk below it, the sensor is unavailable.
pub struct PermitSensor<S: PermitSource> {
    coordinator: Coordinator<S>,
    index: usize,
    unique_id: String,
    name: String,
}

impl<S: PermitSource> Clone for PermitSensor<S> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
            index: self.index,
            unique_id: self.unique_id.clone(),
            name: self.name.clone(),
        }
    }
}

impl<S: PermitSource> PermitSensor<S> {
    /// Bind a sensor to `index`. Returns `None` if the coordinator has no
    /// permit there.
    pub fn new(coordinator: Coordinator<S>, index: usize) -> Option<Self> {
        let permit = coordinator.permits().get(index).cloned()?;
        Some(Self {
            unique_id: unique_id(&permit),
            name: display_name(&permit),
            coordinator,
            index,
        })
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Always `false`: the coordinator pushes updates.
    pub fn should_poll(&self) -> bool {
        false
    }

    fn permit_in(&self, state: &CoordinatorState) -> Option<Arc<Permit>> {
        state.permits.get(self.index).cloned()
    }

    fn permit(&self) -> Option<Arc<Permit>> {
        self.coordinator.permits().get(self.index).cloned()
    }

    /// Plate of the active reservation, if any.
    pub fn state(&self) -> Option<String> {
        self.permit()?
            .active_reservation()
            .map(|r| r.license_plate.clone())
    }

    pub fn attributes(&self) -> Option<PermitAttributes> {
        self.permit().map(|p| PermitAttributes::from_permit(&p))
    }

    /// Mirrors the coordinator's last refresh outcome.
    pub fn available(&self) -> bool {
        let state = self.coordinator.state();
        state.last_update_success && self.permit_in(&state).is_some()
    }

    /// Render from one consistent coordinator snapshot.
    pub fn render(&self) -> SensorState {
        let snapshot = self.coordinator.state();
        let permit = self.permit_in(&snapshot);
        SensorState {
            unique_id: self.unique_id.clone(),
            name: self.name.clone(),
            state: permit
                .as_ref()
                .and_then(|p| p.active_reservation())
                .map(|r| r.license_plate.clone()),
            available: snapshot.last_update_success && permit.is_some(),
            attributes: permit.as_deref().map(PermitAttributes::from_permit),
        }
    }

    /// On-demand update: ask the coordinator for fresh data. Coalesces
    /// with a refresh already in flight.
    pub async fn update(&self) {
        self.coordinator.request_refresh().await;
    }

    /// Attach the sensor to the host: write the current state now and
    /// again after every successful refresh, until removed or the
    /// coordinator shuts down.
    pub fn added_to_host<W: StateWriter>(&self, writer: W) -> ListenerHandle {
        let cancel = self.coordinator.cancel_token().child_token();
        let rx = self.coordinator.subscribe();
        let task = tokio::spawn(listen(self.clone(), writer, rx, cancel.clone()));
        ListenerHandle { cancel, task }
    }
}

async fn listen<S: PermitSource, W: StateWriter>(
    sensor: PermitSensor<S>,
    writer: W,
    mut rx: watch::Receiver<CoordinatorState>,
    cancel: CancellationToken,
) {
    rx.mark_unchanged();
    writer.write_state(sensor.render());

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                rx.mark_unchanged();
                trace!(unique_id = %sensor.unique_id, "coordinator update");
                writer.write_state(sensor.render());
            }
        }
    }
}

/// Subscription of one sensor to its coordinator.
pub struct ListenerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Detach the sensor and wait for its listener to stop.
    pub async fn remove(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

// ── Platform setup ───────────────────────────────────────────────

/// Create one sensor per permit currently cached by the coordinator.
pub fn setup_sensors<S: PermitSource>(coordinator: &Coordinator<S>) -> Vec<PermitSensor<S>> {
    (0..coordinator.permits().len())
        .filter_map(|idx| PermitSensor::new(coordinator.clone(), idx))
        .collect()
}

/// `dvsportal_{code}_{zone_code}`
pub fn unique_id(permit: &Permit) -> String {
    format!("{DOMAIN}_{}_{}", permit.code, permit.zone_code)
}

/// `Parking Permit {code} ({zone_code})`
pub fn display_name(permit: &Permit) -> String {
    format!("Parking Permit {} ({})", permit.code, permit.zone_code)
}
