// Permit endpoints
//
// `update()` pulls the account overview from `login/getbase` and caches
// the flattened permit list; `permits()` hands out the cached list.

use tracing::debug;

use crate::client::DvsPortalClient;
use crate::error::Error;
use crate::models::{BaseResponse, PermitRecord};

impl DvsPortalClient {
    /// Refresh the cached permit list from the portal.
    ///
    /// When `getbase` rejects the token it is dropped and the request is
    /// retried once after a fresh login. A login that fails outright is
    /// not repeated.
    pub async fn update(&self) -> Result<(), Error> {
        let authorization = self.authorization_header().await?;
        let base = match self.fetch_base(&authorization).await {
            Err(e) if e.is_auth() => {
                debug!(error = %e, "token rejected, logging in again");
                self.clear_token().await;
                let authorization = self.authorization_header().await?;
                self.fetch_base(&authorization).await?
            }
            other => other?,
        };

        let records = base.into_permit_records();
        debug!(count = records.len(), "permits updated");
        self.store_permits(records).await;
        Ok(())
    }

    /// Permits captured by the last successful [`update()`](Self::update).
    pub async fn permits(&self) -> Vec<PermitRecord> {
        self.cached_permits().await.as_ref().clone()
    }

    async fn fetch_base(&self, authorization: &str) -> Result<BaseResponse, Error> {
        self.post("login/getbase", None::<&()>, Some(authorization))
            .await
    }
}
