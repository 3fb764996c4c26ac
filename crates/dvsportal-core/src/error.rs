// ── Core error types ──
//
// User-facing errors from dvsportal-core. Consumers never see raw HTTP
// status codes or JSON parse failures directly; the
// `From<dvsportal_api::Error>` impl translates transport-layer errors into
// domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to DVSPortal at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("DVSPortal did not answer within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Lifecycle errors ─────────────────────────────────────────────
    /// The first refresh of a config entry failed; the host should retry
    /// loading the entry later.
    #[error("Config entry not ready: {source}")]
    NotReady {
        #[source]
        source: Box<CoreError>,
    },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Invalid data from DVSPortal: {message}")]
    InvalidData { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<dvsportal_api::Error> for CoreError {
    fn from(err: dvsportal_api::Error) -> Self {
        match err {
            dvsportal_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            dvsportal_api::Error::Transport(ref e) => {
                // The per-request deadline is not known here; the
                // coordinator reports its own timeout with the real value.
                if e.is_timeout() || e.is_connect() || e.is_request() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            dvsportal_api::Error::Http { status, body } => CoreError::Api {
                message: format!("HTTP {status}: {body}"),
                status: Some(status),
            },
            dvsportal_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            dvsportal_api::Error::InvalidHost(host) => CoreError::Config {
                message: format!("Invalid API host: {host:?}"),
            },
            dvsportal_api::Error::Deserialization { message, body: _ } => {
                CoreError::InvalidData { message }
            }
        }
    }
}
