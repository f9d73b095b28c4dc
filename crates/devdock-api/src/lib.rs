//! Async client for the DeviceDock device-management service.
//!
//! Two wire surfaces, one crate:
//!
//! - **REST** ([`ApiClient`]) — session auth (login/register/logout with a
//!   single silent refresh-and-retry on HTTP 401), device CRUD with
//!   soft-delete/restore, the notification feed, and the async
//!   column-average trigger. Credentials ride in a cookie jar; the session
//!   cookie itself is opaque to this crate.
//! - **Live hub** ([`hub`]) — a long-lived WebSocket to `/deviceHub`
//!   speaking the hub's JSON framing, with automatic reconnection and
//!   broadcast fan-out of named events.
//!
//! Raw wire types live here; `devdock-core` owns the domain model and the
//! refresh coordination built on top.

pub mod auth;
pub mod client;
pub mod devices;
pub mod error;
pub mod hub;
pub mod notifications;
pub mod transport;

// ── Primary re-exports ──────────────────────────────────────────────
pub use auth::{RegisterAck, SessionInfo};
pub use client::ApiClient;
pub use devices::{AverageAck, DevicePayload, DeviceRecord};
pub use error::Error;
pub use hub::{HubHandle, HubMessage, HubStatus, ReconnectConfig};
pub use notifications::NotificationRecord;
pub use transport::{TlsMode, TransportConfig};
