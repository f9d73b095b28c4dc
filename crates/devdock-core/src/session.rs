// ── Session state container ──
//
// Single source of truth for the signed-in identity. The coordinator
// writes it on sign-in/sign-out/expiry; everything else observes through
// `watch` subscriptions. The persisted `CachedUser` record is a display
// cache only -- the real credential is the server cookie in the transport
// layer's jar.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Authorization role, as granted by the service.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// The signed-in identity held for the duration of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub role: Role,
    /// Opaque identity token from the login response. `None` when the
    /// session was resumed from the display cache -- the service doesn't
    /// re-issue it outside login, so own-mutation matching is unavailable
    /// until the next sign-in.
    pub user_id: Option<String>,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Persisted "current user" record.
///
/// Restores display state across process restarts. Never sent to the
/// service and never treated as a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedUser {
    pub username: String,
    pub role: Role,
}

impl From<&Session> for CachedUser {
    fn from(s: &Session) -> Self {
        Self {
            username: s.username.clone(),
            role: s.role,
        }
    }
}

/// Watch-backed holder for the current session.
pub struct SessionState {
    tx: watch::Sender<Option<Session>>,
}

impl SessionState {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// The current session, if signed in.
    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    /// Install a session (sign-in or resume).
    pub fn set(&self, session: Session) {
        let _ = self.tx.send(Some(session));
    }

    /// Drop the session (sign-out or expiry).
    pub fn clear(&self) {
        let _ = self.tx.send(None);
    }

    /// Subscribe to session changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    pub fn is_signed_in(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.tx.borrow().as_ref().is_some_and(Session::is_admin)
    }

    /// Whether an event's acting-user id matches this session.
    ///
    /// `false` when not signed in, when the session has no id (resumed),
    /// or when the event carries none.
    pub fn owns_user_id(&self, candidate: Option<&str>) -> bool {
        let guard = self.tx.borrow();
        match (guard.as_ref().and_then(|s| s.user_id.as_deref()), candidate) {
            (Some(own), Some(other)) => own == other,
            _ => false,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
