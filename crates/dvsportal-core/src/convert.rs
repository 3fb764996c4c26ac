// ── API-to-domain type conversions ──
//
// Bridges raw `dvsportal_api` records into canonical `dvsportal_core`
// domain types. Timestamps are parsed here, once per poll; a record the
// portal mangled fails the whole conversion.

use dvsportal_api::{PermitRecord, ReservationRecord};

use crate::error::CoreError;
use crate::model::{Permit, Reservation, Timestamp};

impl TryFrom<ReservationRecord> for Reservation {
    type Error = CoreError;

    fn try_from(r: ReservationRecord) -> Result<Self, Self::Error> {
        Ok(Reservation {
            valid_from: parse_timestamp(&r.id, "valid_from", &r.valid_from)?,
            valid_until: parse_timestamp(&r.id, "valid_until", &r.valid_until)?,
            id: r.id,
            license_plate: r.license_plate,
        })
    }
}

impl TryFrom<PermitRecord> for Permit {
    type Error = CoreError;

    fn try_from(p: PermitRecord) -> Result<Self, Self::Error> {
        let reservations = p
            .reservations
            .into_iter()
            .map(Reservation::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Permit {
            code: p.code,
            zone_code: p.zone_code,
            type_id: p.type_id,
            license_plates: p.license_plates,
            reservations,
        })
    }
}

/// Convert a full poll result, preserving portal order.
pub fn permits_from_records(records: Vec<PermitRecord>) -> Result<Vec<Permit>, CoreError> {
    records.into_iter().map(Permit::try_from).collect()
}

fn parse_timestamp(reservation: &str, field: &str, raw: &str) -> Result<Timestamp, CoreError> {
    raw.parse().map_err(|e| CoreError::InvalidData {
        message: format!("reservation {reservation}: {field}: {e}"),
    })
}
