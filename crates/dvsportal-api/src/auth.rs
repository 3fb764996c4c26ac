// Portal authentication
//
// Identifier/password login that yields a session token. The token is
// cached on the client and sent base64-encoded in the `Authorization`
// header of every data request.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::client::DvsPortalClient;
use crate::error::Error;
use crate::models::{LoginRequest, LoginResponse};

/// Login method the portal expects for identifier + password accounts.
const LOGIN_METHOD: &str = "Pas";
/// Permit media type requested at login.
const PERMIT_MEDIA_TYPE_ID: u32 = 1;

impl DvsPortalClient {
    /// Return the session token, logging in first if none is cached.
    pub async fn authenticate(&self) -> Result<SecretString, Error> {
        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }
        self.login().await
    }

    /// Perform a login round trip and cache the resulting token.
    ///
    /// The portal answers a bad login with HTTP 200 and an
    /// `ErrorMessage`; that, a missing token and HTTP 401/403 are all
    /// reported as [`Error::Authentication`].
    pub async fn login(&self) -> Result<SecretString, Error> {
        debug!(identifier = %self.identifier(), "logging in");

        let body = LoginRequest {
            identifier: self.identifier(),
            login_method: LOGIN_METHOD,
            password: self.password().expose_secret(),
            permit_media_type_id: PERMIT_MEDIA_TYPE_ID,
        };

        let resp: LoginResponse = self.post("login", Some(&body), None).await?;

        if let Some(message) = resp.error_message.filter(|m| !m.trim().is_empty()) {
            return Err(Error::Authentication { message });
        }

        let token = resp
            .token
            .filter(|t| !t.is_empty())
            .map(SecretString::from)
            .ok_or_else(|| Error::Authentication {
                message: "portal returned no token".into(),
            })?;

        self.store_token(token.clone()).await;
        debug!("login successful");
        Ok(token)
    }

    /// `Authorization` header value for the current token.
    pub(crate) async fn authorization_header(&self) -> Result<String, Error> {
        let token = self.authenticate().await?;
        Ok(authorization_value(&token))
    }
}

/// `Token <base64(token)>`
pub(crate) fn authorization_value(token: &SecretString) -> String {
    format!("Token {}", BASE64.encode(token.expose_secret()))
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::authorization_value;

    #[test]
    fn header_is_base64_of_raw_token() {
        let token = SecretString::from("abc123".to_string());
        assert_eq!(authorization_value(&token), "Token YWJjMTIz");
    }
}
