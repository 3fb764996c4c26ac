#![allow(clippy::unwrap_used)]
// In-memory `PermitSource` for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dvsportal_api::{Error, PermitRecord, ReservationRecord};
use indexmap::IndexMap;
use secrecy::SecretString;

use crate::source::PermitSource;

/// Scripted result of one fake call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Ok,
    AuthError,
    ConnectionError,
    Garbage,
    Hang,
}

impl Outcome {
    async fn run(self) -> Result<(), Error> {
        match self {
            Self::Ok => Ok(()),
            Self::AuthError => Err(Error::Authentication {
                message: "invalid identifier or pin".into(),
            }),
            Self::ConnectionError => Err(Error::Http {
                status: 503,
                body: "unavailable".into(),
            }),
            Self::Garbage => Err(Error::Deserialization {
                message: "expected value at line 1".into(),
                body: "<html>".into(),
            }),
            Self::Hang => std::future::pending().await,
        }
    }
}

pub(crate) struct FakeSource {
    auth: Mutex<Outcome>,
    update: Mutex<Outcome>,
    update_delay: Mutex<Duration>,
    records: Mutex<Vec<PermitRecord>>,
    update_calls: AtomicUsize,
}

impl FakeSource {
    pub(crate) fn new(records: Vec<PermitRecord>) -> Self {
        Self {
            auth: Mutex::new(Outcome::Ok),
            update: Mutex::new(Outcome::Ok),
            update_delay: Mutex::new(Duration::ZERO),
            records: Mutex::new(records),
            update_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_auth(self, outcome: Outcome) -> Self {
        *self.auth.lock().unwrap() = outcome;
        self
    }

    pub(crate) fn set_update(&self, outcome: Outcome) {
        *self.update.lock().unwrap() = outcome;
    }

    pub(crate) fn set_update_delay(&self, delay: Duration) {
        *self.update_delay.lock().unwrap() = delay;
    }

    pub(crate) fn set_records(&self, records: Vec<PermitRecord>) {
        *self.records.lock().unwrap() = records;
    }

    pub(crate) fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }
}

impl PermitSource for FakeSource {
    async fn authenticate(&self) -> Result<SecretString, Error> {
        let outcome = *self.auth.lock().unwrap();
        outcome.run().await?;
        Ok(SecretString::from("fake-token".to_string()))
    }

    async fn update(&self) -> Result<(), Error> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.update_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let outcome = *self.update.lock().unwrap();
        outcome.run().await
    }

    async fn permits(&self) -> Result<Vec<PermitRecord>, Error> {
        Ok(self.records.lock().unwrap().clone())
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────

pub(crate) fn permit_without_reservation(code: &str, zone: &str) -> PermitRecord {
    PermitRecord {
        code: code.into(),
        zone_code: zone.into(),
        type_id: 1,
        license_plates: IndexMap::new(),
        reservations: Vec::new(),
    }
}

pub(crate) fn permit_with_reservation(code: &str, zone: &str) -> PermitRecord {
    PermitRecord {
        code: code.into(),
        zone_code: zone.into(),
        type_id: 4,
        license_plates: IndexMap::from([
            ("AB-123-C".to_string(), "Grandma".to_string()),
            ("ZZ-999-Z".to_string(), "Plumber".to_string()),
        ]),
        reservations: vec![
            ReservationRecord {
                id: "res-1".into(),
                license_plate: "AB-123-C".into(),
                valid_from: "2024-06-01T09:00:00".into(),
                valid_until: "2024-06-01T17:30:00".into(),
            },
            ReservationRecord {
                id: "res-2".into(),
                license_plate: "ZZ-999-Z".into(),
                valid_from: "2024-06-02T09:00:00".into(),
                valid_until: "2024-06-02T11:00:00".into(),
            },
        ],
    }
}

pub(crate) fn two_permits() -> Vec<PermitRecord> {
    vec![
        permit_with_reservation("PV-1", "CENTRUM"),
        permit_without_reservation("PV-2", "NOORD"),
    ]
}
