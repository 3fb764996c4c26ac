// ── Runtime entry configuration ──
//
// These types describe *what* to connect to and *how often* to poll.
// They carry credential data, but never touch disk: the CLI (via
// `dvsportal-config`) builds a `ConfigEntry` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use uuid::Uuid;

/// Integration domain, used as the unique-id prefix of every entity.
pub const DOMAIN: &str = "dvsportal";

/// How often the coordinator polls the portal.
pub const SCAN_INTERVAL: Duration = Duration::from_secs(300);

/// Upper bound on one update-then-fetch cycle.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The user-supplied fields of a config entry.
#[derive(Debug, Clone)]
pub struct EntryData {
    /// Portal host (e.g. `parkeren.example.nl`), optionally with scheme.
    pub api_host: String,
    /// Account identifier (permit holder number).
    pub identifier: String,
    pub password: SecretString,
}

/// One configured integration instance.
#[derive(Debug, Clone)]
pub struct ConfigEntry {
    pub entry_id: Uuid,
    /// Display title; the identifier for entries created by the flow.
    pub title: String,
    pub data: EntryData,
}

impl ConfigEntry {
    /// Create an entry with a fresh id.
    pub fn new(title: impl Into<String>, data: EntryData) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            title: title.into(),
            data,
        }
    }
}

/// Polling settings for a [`Coordinator`](crate::Coordinator).
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Name used in log lines.
    pub name: String,
    /// Time between scheduled refreshes. `Duration::ZERO` disables the
    /// schedule; only explicit refreshes run.
    pub update_interval: Duration,
    /// Timeout for one update-then-fetch cycle.
    pub request_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            name: "DVSPortal".into(),
            update_interval: SCAN_INTERVAL,
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

impl CoordinatorConfig {
    /// Single-shot settings: same timeout, no schedule.
    pub fn oneshot() -> Self {
        Self {
            update_interval: Duration::ZERO,
            ..Self::default()
        }
    }
}
