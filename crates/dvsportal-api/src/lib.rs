// dvsportal-api: Async Rust client for the DVSPortal parking-permit API

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod permits;
pub mod transport;

pub use client::{DvsPortalClient, api_base_url};
pub use error::Error;
pub use models::{PermitRecord, ReservationRecord};
pub use transport::TransportConfig;
