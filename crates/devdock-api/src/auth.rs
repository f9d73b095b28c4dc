// Session authentication
//
// Cookie-based login/register/logout. The login endpoint sets the session
// cookie in the client's jar; subsequent requests use it automatically.
// These endpoints bypass the refresh-and-retry wrapper: a 401 here means
// bad credentials, not an expired session.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;

/// Identity returned by a successful login.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub username: String,
    /// Role name as the server spells it ("Admin" / "User").
    pub role: String,
    /// Opaque identity token; matched against hub event payloads.
    pub user_id: String,
}

/// Acknowledgement body from registration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterAck {
    #[serde(default, alias = "Message")]
    pub message: Option<String>,
}

impl ApiClient {
    /// Authenticate with username/password.
    ///
    /// On success the session cookie is stored in the client's cookie jar
    /// and the returned [`SessionInfo`] describes the signed-in identity.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<SessionInfo, Error> {
        let url = self.api_url("auth/login");
        debug!("logging in at {}", url);

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });

        let resp = self
            .http()
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<crate::client::ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| format!("login failed (HTTP {status})"));
            return Err(Error::Authentication { message });
        }

        let info: SessionInfo = Self::json_body(resp).await?;
        debug!(username = %info.username, role = %info.role, "login successful");
        Ok(info)
    }

    /// Create a new account. Does not sign in.
    ///
    /// The service assigns the `User` role to self-registered accounts.
    pub async fn register(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<RegisterAck, Error> {
        let url = self.api_url("auth/register");
        debug!("registering at {}", url);

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
            "role": "User",
        });

        let resp = self
            .http()
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<crate::client::ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| format!("registration failed (HTTP {status})"));
            return Err(Error::Authentication { message });
        }

        Self::json_body(resp).await
    }

    /// End the current session server-side.
    pub async fn logout(&self) -> Result<(), Error> {
        let url = self.api_url("auth/logout");
        debug!("logging out at {}", url);

        let _resp = self
            .http()
            .post(url)
            .send()
            .await
            .map_err(Error::Transport)?;

        debug!("logout complete");
        Ok(())
    }
}
