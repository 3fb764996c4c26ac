// dvsportal-core: Integration layer between dvsportal-api and hosts (CLI).

pub mod config;
pub mod convert;
pub mod coordinator;
pub mod error;
pub mod flow;
pub mod integration;
pub mod model;
pub mod sensor;
pub mod source;

#[cfg(test)]
mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{
    ConfigEntry, CoordinatorConfig, DOMAIN, EntryData, REQUEST_TIMEOUT, SCAN_INTERVAL,
};
pub use coordinator::{Coordinator, CoordinatorState};
pub use error::CoreError;
pub use flow::{ConfigFlow, FlowError, FlowResult, ValidatedInput, validate_input};
pub use integration::{LoadedEntry, setup_entry, setup_portal_entry};
pub use model::{Permit, Reservation, Timestamp};
pub use sensor::{
    ListenerHandle, PermitAttributes, PermitSensor, ReservationAttributes, SensorState,
    StateWriter,
};
pub use source::PermitSource;
