// ── Domain model ──
//
// Typed, immutable snapshots of what the portal reports. Built once per
// poll by `convert` and shared behind `Arc` afterwards.

pub mod permit;
pub mod timestamp;

pub use permit::{Permit, Reservation};
pub use timestamp::{ParseTimestampError, Timestamp};
