// ── Core error types ──
//
// User-facing errors from devdock-core. These are NOT wire-specific --
// consumers never see HTTP status codes or JSON parse failures directly.
// The `From<devdock_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session errors ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// The session expired and the silent refresh could not recover it.
    /// All local session state has been dropped by the time this surfaces.
    #[error("Session expired -- sign in again")]
    SessionExpired,

    #[error("Not signed in")]
    NotSignedIn,

    // ── Validation errors (caught before any request) ────────────────
    #[error("A device named '{name}' already exists")]
    DuplicateName { name: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation rejected by the service: {message}")]
    Rejected { message: String },

    #[error("Device not found: {id}")]
    DeviceNotFound { id: i64 },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the service: {reason}")]
    ConnectionFailed { reason: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("Service error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<devdock_api::Error> for CoreError {
    fn from(err: devdock_api::Error) -> Self {
        match err {
            devdock_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            devdock_api::Error::SessionExpired => CoreError::SessionExpired,
            devdock_api::Error::Transport(ref e) => {
                if e.is_timeout() || e.is_connect() {
                    CoreError::ConnectionFailed {
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            devdock_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            devdock_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                reason: format!("TLS error: {msg}"),
            },
            devdock_api::Error::Api { message, status } => CoreError::Api {
                message,
                status: Some(status),
            },
            // The add-device flow intercepts NameConflict before conversion;
            // anywhere else it is a plain rejection.
            devdock_api::Error::NameConflict { message, .. } => CoreError::Rejected { message },
            devdock_api::Error::HubConnect(reason) => CoreError::ConnectionFailed {
                reason: format!("hub connection failed: {reason}"),
            },
            devdock_api::Error::HubClosed { reason } => CoreError::ConnectionFailed {
                reason: format!("hub closed: {reason}"),
            },
            devdock_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
