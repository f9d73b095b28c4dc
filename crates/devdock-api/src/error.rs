use thiserror::Error;

/// Top-level error type for the `devdock-api` crate.
///
/// Covers every failure mode across both API surfaces: authentication,
/// transport, the device/notification REST endpoints, and the live hub.
/// `devdock-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login or registration rejected (wrong credentials, username taken, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The session cookie expired and the single silent refresh also failed.
    /// Callers must drop all local session state when they see this.
    #[error("Session expired -- sign-in required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── REST API ────────────────────────────────────────────────────
    /// Non-success response from the service (4xx/5xx other than 401).
    #[error("API error (HTTP {status}): {message}")]
    Api { message: String, status: u16 },

    /// Device create rejected because the name collides with an existing
    /// record -- possibly a soft-deleted one. `device_id` is the colliding
    /// record's id when the server includes it.
    #[error("Device name conflict: {message}")]
    NameConflict {
        message: String,
        device_id: Option<i64>,
    },

    // ── Live hub ────────────────────────────────────────────────────
    /// Hub WebSocket connection or handshake failed.
    #[error("Hub connection failed: {0}")]
    HubConnect(String),

    /// Hub closed by the server.
    #[error("Hub closed: {reason}")]
    HubClosed { reason: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error means the session is gone for good
    /// and the caller should drop local session state.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Returns `true` for the create-name-collision signal.
    pub fn is_name_conflict(&self) -> bool {
        matches!(self, Self::NameConflict { .. })
    }
}
