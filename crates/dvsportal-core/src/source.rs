// ── Permit source abstraction ──
//
// The coordinator and the config flow only need three calls from the
// portal client. Keeping them behind a trait lets tests drive both with
// an in-memory fake.

use std::future::Future;

use dvsportal_api::{DvsPortalClient, Error, PermitRecord};
use secrecy::SecretString;

/// Something that can authenticate against the portal and list permits.
pub trait PermitSource: Send + Sync + 'static {
    /// Obtain a session token, logging in if needed.
    fn authenticate(&self) -> impl Future<Output = Result<SecretString, Error>> + Send;

    /// Refresh the source's view of the account.
    fn update(&self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Permits captured by the last `update()`, in portal order.
    fn permits(&self) -> impl Future<Output = Result<Vec<PermitRecord>, Error>> + Send;
}

impl PermitSource for DvsPortalClient {
    async fn authenticate(&self) -> Result<SecretString, Error> {
        DvsPortalClient::authenticate(self).await
    }

    async fn update(&self) -> Result<(), Error> {
        DvsPortalClient::update(self).await
    }

    async fn permits(&self) -> Result<Vec<PermitRecord>, Error> {
        Ok(DvsPortalClient::permits(self).await)
    }
}
