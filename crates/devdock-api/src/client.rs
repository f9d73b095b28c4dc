// DeviceDock REST client
//
// Wraps `reqwest::Client` with service URL construction, error-body
// decoding, and the single silent session-refresh-and-retry on HTTP 401.
// Endpoint modules (auth, devices, notifications) are implemented as
// inherent methods via separate files to keep this module focused on
// transport mechanics.

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::cookie::{CookieStore, Jar};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Error body the service sends on failed requests.
///
/// ASP.NET-style producers are not consistent about key casing, so both
/// casings are accepted for every field.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default, alias = "Message")]
    pub message: Option<String>,
    #[serde(default, rename = "deviceId", alias = "DeviceId")]
    pub device_id: Option<i64>,
}

/// Marker the service puts in the create-conflict message when the
/// colliding record is soft-deleted.
const DELETED_CONFLICT_MARKER: &str = "even if deleted";

/// HTTP client for the DeviceDock service.
///
/// Credentials ride in the cookie jar -- the server-issued session cookie
/// is opaque to this client. Every request through [`send_with_refresh`]
/// gets exactly one silent refresh-and-retry on HTTP 401; auth endpoints
/// bypass that wrapper (a 401 at login is a credential error, not expiry).
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    /// Cookie jar reference for extracting the session cookie (hub auth).
    cookie_jar: Option<Arc<Jar>>,
}

impl ApiClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// If the config doesn't already include a cookie jar, one is created
    /// automatically (session auth requires cookies). `base_url` is the
    /// service root (e.g. `https://devices.example.com`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let cookie_jar = config.cookie_jar.clone();
        let http = config.build_client()?;
        Ok(Self {
            http,
            base_url,
            cookie_jar,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// Use this when you already have a client with a session cookie in
    /// its jar.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            cookie_jar: None,
        }
    }

    /// The underlying HTTP client (for auth flows that need direct access).
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Extract the session cookie header value for hub auth.
    ///
    /// Returns the `Cookie` header string if a cookie jar is available and
    /// contains cookies for the service URL.
    pub fn cookie_header(&self) -> Option<String> {
        let jar = self.cookie_jar.as_ref()?;
        let cookies = jar.cookies(&self.base_url)?;
        cookies.to_str().ok().map(String::from)
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for an API path: `{base}/api/{path}`
    pub(crate) fn api_url(&self, path: &str) -> Url {
        let base = self.base_url.as_str().trim_end_matches('/');
        let full = format!("{base}/api/{path}");
        Url::parse(&full).expect("invalid API URL")
    }

    // ── Session refresh ──────────────────────────────────────────────

    /// One silent refresh against the fixed refresh endpoint.
    ///
    /// `Ok(())` means the server rotated the session cookie and the
    /// original request may be retried. A non-success response maps to
    /// [`Error::SessionExpired`]; transport failures propagate as-is.
    async fn refresh_session(&self) -> Result<(), Error> {
        let url = self.api_url("auth/refresh");
        debug!("refreshing session at {}", url);

        let resp = self.http.post(url).send().await.map_err(Error::Transport)?;

        if resp.status().is_success() {
            debug!("session refresh successful");
            Ok(())
        } else {
            warn!(status = %resp.status(), "session refresh rejected");
            Err(Error::SessionExpired)
        }
    }

    // ── Request core ─────────────────────────────────────────────────

    /// Send a request, transparently refreshing the session once on 401.
    ///
    /// - non-401 response: returned as-is (success or failure).
    /// - 401, refresh succeeds: the original request is retried exactly
    ///   once and that result is returned without further retry.
    /// - 401, refresh fails: `Error::SessionExpired`.
    /// - transport error before any response: propagated, no retry.
    pub(crate) async fn send_with_refresh(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, Error> {
        // JSON-bodied builders are always cloneable; streaming bodies are
        // never constructed in this crate.
        let retry_builder = builder.try_clone();

        let resp = builder.send().await.map_err(Error::Transport)?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        debug!("got 401, attempting silent session refresh");
        self.refresh_session().await?;

        let retry_builder = retry_builder.ok_or_else(|| Error::Deserialization {
            message: "request not retryable".into(),
            body: String::new(),
        })?;
        retry_builder.send().await.map_err(Error::Transport)
    }

    /// Send through the refresh wrapper and decode a JSON body on success.
    pub(crate) async fn request_json<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, Error> {
        let resp = self.send_with_refresh(builder).await?;
        let resp = Self::expect_success(resp).await?;
        Self::json_body(resp).await
    }

    /// Send through the refresh wrapper, discarding any success body.
    pub(crate) async fn request_unit(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<(), Error> {
        let resp = self.send_with_refresh(builder).await?;
        Self::expect_success(resp).await.map(|_| ())
    }

    // ── Response decoding ────────────────────────────────────────────

    /// Map a non-success response into the error taxonomy.
    pub(crate) async fn expect_success(
        resp: reqwest::Response,
    ) -> Result<reqwest::Response, Error> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let parsed: Option<ApiErrorBody> = serde_json::from_str(&body).ok();

        let message = parsed
            .as_ref()
            .and_then(|b| b.message.clone())
            .unwrap_or_else(|| {
                if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body[..body.len().min(200)].to_owned()
                }
            });

        if message.contains(DELETED_CONFLICT_MARKER) {
            return Err(Error::NameConflict {
                message,
                device_id: parsed.as_ref().and_then(|b| b.device_id),
            });
        }

        Err(Error::Api {
            message,
            status: status.as_u16(),
        })
    }

    /// Decode a JSON success body, keeping the raw text for diagnostics.
    pub(crate) async fn json_body<T: DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let body = resp.text().await.map_err(Error::Transport)?;
        serde_json::from_str(&body).map_err(|e| {
            let preview = &body[..body.len().min(200)];
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }
}
