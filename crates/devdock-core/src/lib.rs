//! Reactive data layer between `devdock-api` and UI consumers.
//!
//! This crate owns the domain model, the session state, and the refresh
//! coordination for DeviceDock clients:
//!
//! - **[`Coordinator`]** — Central facade managing the full lifecycle:
//!   [`sign_in()`](Coordinator::sign_in) / [`resume()`](Coordinator::resume)
//!   authenticate, load an initial snapshot, and start the live channel;
//!   mutations refresh the view before returning; push events converge on
//!   the same two reconciliation entry points
//!   ([`reload_devices`](Coordinator::reload_devices),
//!   [`reload_notifications`](Coordinator::reload_notifications)).
//!
//! - **[`SessionState`]** — Watch-backed single source of truth for the
//!   signed-in identity; the persisted [`CachedUser`] record is a display
//!   cache, never a credential.
//!
//! - **[`DeviceStore`] / [`NotificationFeed`]** — Wholesale-replaced
//!   snapshots behind `watch` channels. The active/deleted device
//!   partitions stay disjoint by id; the feed tracks an unread counter.
//!
//! - **[`HubEvent`]** — Typed hub events, normalized once at the boundary
//!   from the producer's loosely-cased payloads.
//!
//! - **Search** ([`search`]) — pure filter/pagination helpers over device
//!   snapshots.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod search;
pub mod session;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ServiceConfig, TlsVerification};
pub use coordinator::{AddDeviceOutcome, Coordinator, Notice};
pub use error::CoreError;
pub use session::{CachedUser, Role, Session, SessionState};
pub use store::{DeviceStore, NotificationFeed};

// Re-export model types and the hub status at the crate root.
pub use devdock_api::HubStatus;
pub use model::{Device, HubEvent, Notification};
