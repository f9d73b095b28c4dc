//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use devdock_core::CoreError;

/// Exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the service")]
    #[diagnostic(
        code(devdock::connection_failed),
        help(
            "Check that the service is running and accessible.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(devdock::auth_failed),
        help(
            "Verify your username and password.\n\
             Run: devdock login"
        )
    )]
    AuthFailed { message: String },

    #[error("Session expired")]
    #[diagnostic(
        code(devdock::session_expired),
        help("The session could not be refreshed. Run: devdock login")
    )]
    SessionExpired,

    #[error("Not signed in")]
    #[diagnostic(
        code(devdock::not_signed_in),
        help("Run: devdock login")
    )]
    NotSignedIn,

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(devdock::no_credentials),
        help(
            "Run: devdock login\n\
             Or set the DEVDOCK_USERNAME / DEVDOCK_PASSWORD environment variables."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("Device {id} not found")]
    #[diagnostic(
        code(devdock::not_found),
        help("Run: devdock devices list to see available devices")
    )]
    DeviceNotFound { id: i64 },

    #[error("A device named '{name}' already exists")]
    #[diagnostic(code(devdock::conflict))]
    DuplicateName { name: String },

    #[error("Device '{name}' exists but is soft-deleted")]
    #[diagnostic(
        code(devdock::deleted_conflict),
        help(
            "Restore it instead of creating a new one:\n\
             devdock devices restore {id}\n\
             Or pass --restore-if-deleted to `devdock devices add`."
        )
    )]
    DeletedConflict { name: String, id: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("Service error: {message}")]
    #[diagnostic(code(devdock::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(devdock::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(devdock::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: devdock config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(devdock::no_config),
        help(
            "Create one with: devdock config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(devdock::config))]
    Config(#[from] devdock_config::ConfigError),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(devdock::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(devdock::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. }
            | Self::SessionExpired
            | Self::NotSignedIn
            | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::DeviceNotFound { .. } => exit_code::NOT_FOUND,
            Self::DuplicateName { .. } | Self::DeletedConflict { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::SessionExpired => CliError::SessionExpired,

            CoreError::NotSignedIn => CliError::NotSignedIn,

            CoreError::DuplicateName { name } => CliError::DuplicateName { name },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::DeviceNotFound { id } => CliError::DeviceNotFound { id },

            CoreError::Rejected { message } => CliError::ApiError { message },

            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },

            CoreError::Api { message, status } => CliError::ApiError {
                message: match status {
                    Some(s) => format!("{message} (HTTP {s})"),
                    None => message,
                },
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::ApiError { message },
        }
    }
}
