// DVSPortal HTTP client
//
// Wraps `reqwest::Client` with portal URL construction, token caching and
// response classification. Endpoint logic lives in `auth.rs` and
// `permits.rs` as inherent methods to keep this module focused on
// transport mechanics.

use std::sync::Arc;

use reqwest::StatusCode;
use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::PermitRecord;
use crate::transport::TransportConfig;

const API_PATH: &str = "DVSWebAPI/api/";

/// Build the API base URL (`https://{host}/DVSWebAPI/api/`) for a host.
///
/// A bare host name gets the `https` scheme. A host that already carries
/// a scheme (e.g. `http://127.0.0.1:8080`) is used as-is.
pub fn api_base_url(api_host: &str) -> Result<Url, Error> {
    let host = api_host.trim().trim_end_matches('/');
    if host.is_empty() {
        return Err(Error::InvalidHost(api_host.to_owned()));
    }
    let root = if host.contains("://") {
        host.to_owned()
    } else {
        format!("https://{host}")
    };
    let root = Url::parse(&format!("{root}/"))?;
    if root.host_str().is_none_or(str::is_empty) {
        return Err(Error::InvalidHost(api_host.to_owned()));
    }
    Ok(root.join(API_PATH)?)
}

/// Async client for one DVSPortal account.
///
/// Holds the credentials, the session token obtained on first use and the
/// permit list captured by the last [`update()`](Self::update).
pub struct DvsPortalClient {
    http: reqwest::Client,
    base_url: Url,
    identifier: String,
    password: SecretString,
    token: RwLock<Option<SecretString>>,
    permits: RwLock<Arc<Vec<PermitRecord>>>,
}

impl DvsPortalClient {
    /// Create a client for `api_host` using the given transport settings.
    pub fn new(
        api_host: &str,
        identifier: impl Into<String>,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(
            http,
            api_base_url(api_host)?,
            identifier,
            password,
        ))
    }

    /// Create a client with a pre-built `reqwest::Client` and base URL.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        identifier: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            http,
            base_url,
            identifier: identifier.into(),
            password,
            token: RwLock::new(None),
            permits: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// The account identifier this client logs in with.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn password(&self) -> &SecretString {
        &self.password
    }

    // ── Token cache ──────────────────────────────────────────────────

    pub(crate) async fn cached_token(&self) -> Option<SecretString> {
        self.token.read().await.clone()
    }

    pub(crate) async fn store_token(&self, token: SecretString) {
        *self.token.write().await = Some(token);
    }

    /// Forget the cached session token; the next call logs in again.
    pub async fn clear_token(&self) {
        trace!("clearing cached token");
        *self.token.write().await = None;
    }

    // ── Permit cache ─────────────────────────────────────────────────

    pub(crate) async fn store_permits(&self, permits: Vec<PermitRecord>) {
        *self.permits.write().await = Arc::new(permits);
    }

    pub(crate) async fn cached_permits(&self) -> Arc<Vec<PermitRecord>> {
        Arc::clone(&*self.permits.read().await)
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    /// Send a POST to `path` and decode the JSON response.
    ///
    /// `body` is sent as JSON when present; `authorization` is sent
    /// verbatim as the `Authorization` header.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&(impl Serialize + Sync)>,
        authorization: Option<&str>,
    ) -> Result<T, Error> {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);

        let mut builder = self.http.post(url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        if let Some(value) = authorization {
            builder = builder.header(reqwest::header::AUTHORIZATION, value);
        }

        let resp = builder.send().await.map_err(Error::Transport)?;
        Self::parse_response(resp).await
    }

    async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Authentication {
                message: format!("rejected by portal (HTTP {status})"),
            });
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                body: preview(&body).to_owned(),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body,
        })
    }
}

fn preview(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map_or(body.len(), |(idx, _)| idx);
    &body[..end]
}
