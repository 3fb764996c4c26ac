// ── Permit domain types ──

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::timestamp::Timestamp;

/// A parking permit, snapshotted once per poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permit {
    pub code: String,
    pub zone_code: String,
    pub type_id: i64,
    /// License plate → the label the account holder gave it.
    pub license_plates: IndexMap<String, String>,
    /// Active reservations in portal order.
    pub reservations: Vec<Reservation>,
}

/// A time-bounded license-plate booking on a permit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub license_plate: String,
    pub valid_from: Timestamp,
    pub valid_until: Timestamp,
}

impl Permit {
    /// The reservation shown as current: the first one the portal lists.
    pub fn active_reservation(&self) -> Option<&Reservation> {
        self.reservations.first()
    }

    /// Human label for a plate, if the account named it.
    pub fn plate_name(&self, plate: &str) -> Option<&str> {
        self.license_plates.get(plate).map(String::as_str)
    }
}
