// ── Refresh coordinator ──
//
// Keeps the client-local view of devices and notifications consistent
// with the remote source of truth across authenticated HTTP calls and the
// independent live event stream. Local mutations and push events converge
// on the same two reconciliation entry points: `reload_devices` and
// `reload_notifications`. Refreshes are wholesale replacements, so
// uncoordinated triggers commute -- last write wins.

use std::fmt;
use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use devdock_api::hub::{HubHandle, HubStatus, ReconnectConfig};
use devdock_api::{ApiClient, DevicePayload};

use crate::config::ServiceConfig;
use crate::error::CoreError;
use crate::model::{Device, HubEvent, Notification};
use crate::session::{CachedUser, Role, Session, SessionState};
use crate::store::{DeviceStore, NotificationFeed};

const NOTICE_CHANNEL_SIZE: usize = 256;

/// Placeholder the service shows for devices registered without one.
const EMPTY_DESCRIPTION: &str = "No description";

// ── Notice ───────────────────────────────────────────────────────────

/// A user-facing announcement. Everything the live channel or the
/// coordinator wants surfaced to a person flows through one broadcast
/// stream of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    DeviceAdded {
        device_name: String,
        added_by: String,
    },
    DeviceUpdated {
        device_name: String,
        updated_by: String,
    },
    DeviceDeleted,
    DeviceRestored {
        device_name: String,
    },
    NotificationReceived {
        message: String,
    },
    AverageComputed {
        column: String,
        average: f64,
    },
    HubReconnecting,
    HubReconnected,
    HubDisconnected,
    SessionExpired,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceAdded {
                device_name,
                added_by,
            } => write!(f, "{added_by} added device \"{device_name}\""),
            Self::DeviceUpdated {
                device_name,
                updated_by,
            } => write!(f, "{updated_by} updated device \"{device_name}\""),
            Self::DeviceDeleted => write!(f, "Device deleted"),
            Self::DeviceRestored { device_name } => {
                write!(f, "Device \"{device_name}\" restored")
            }
            Self::NotificationReceived { message } => write!(f, "{message}"),
            Self::AverageComputed { column, average } => {
                write!(f, "Average of {column}: {average}")
            }
            Self::HubReconnecting => write!(f, "Reconnecting..."),
            Self::HubReconnected => write!(f, "Reconnected"),
            Self::HubDisconnected => write!(f, "Disconnected"),
            Self::SessionExpired => write!(f, "Session expired -- signed out"),
        }
    }
}

// ── AddDeviceOutcome ─────────────────────────────────────────────────

/// Result of [`Coordinator::add_device`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddDeviceOutcome {
    /// Created; the view already reflects it.
    Added,
    /// The name collides with a soft-deleted record. `restore_id` is the
    /// record to restore instead of creating: the server-provided id when
    /// present, else a case-insensitive name match against the local
    /// deleted partition (heuristic -- may mismatch if two deleted devices
    /// share a name).
    ConflictWithDeleted {
        restore_id: Option<i64>,
        message: String,
    },
}

// ── Coordinator ──────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc`. Owns the session state container, the
/// device and notification stores, and the live hub lifecycle.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: ServiceConfig,
    api: ApiClient,
    session: SessionState,
    devices: DeviceStore,
    notifications: NotificationFeed,
    notice_tx: broadcast::Sender<Notice>,
    /// Mirror of the hub's lifecycle state; `Disconnected` while no hub
    /// session exists.
    hub_status: watch::Sender<HubStatus>,
    cancel: CancellationToken,
    /// Child token for the current hub session -- cancelled on stop,
    /// replaced on the next start.
    hub_cancel: Mutex<CancellationToken>,
    hub: Mutex<Option<HubHandle>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Coordinator {
    /// Create a coordinator. Does NOT sign in -- call
    /// [`sign_in`](Self::sign_in) or [`resume`](Self::resume).
    pub fn new(config: ServiceConfig) -> Result<Self, CoreError> {
        let api = ApiClient::new(config.url.clone(), &config.transport())?;
        let (notice_tx, _) = broadcast::channel(NOTICE_CHANNEL_SIZE);
        let (hub_status, _) = watch::channel(HubStatus::Disconnected);
        let cancel = CancellationToken::new();
        let hub_cancel = cancel.child_token();

        Ok(Self {
            inner: Arc::new(CoordinatorInner {
                config,
                api,
                session: SessionState::new(),
                devices: DeviceStore::new(),
                notifications: NotificationFeed::new(),
                notice_tx,
                hub_status,
                cancel,
                hub_cancel: Mutex::new(hub_cancel),
                hub: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    // ── State observation ────────────────────────────────────────────

    pub fn session(&self) -> &SessionState {
        &self.inner.session
    }

    pub fn devices(&self) -> &DeviceStore {
        &self.inner.devices
    }

    pub fn notifications(&self) -> &NotificationFeed {
        &self.inner.notifications
    }

    /// Subscribe to user-facing announcements.
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.notice_tx.subscribe()
    }

    /// Subscribe to the live channel's connection status.
    pub fn hub_status(&self) -> watch::Receiver<HubStatus> {
        self.inner.hub_status.subscribe()
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// Authenticate and start a session.
    ///
    /// On success the stores are loaded and the live channel (if enabled)
    /// is started. Initial load failures are logged, not fatal to the
    /// sign-in.
    pub async fn sign_in(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Session, CoreError> {
        let info = self.inner.api.login(username, password).await?;

        let role = info.role.parse().unwrap_or_else(|_| {
            warn!(role = %info.role, "unrecognized role, treating as User");
            Role::User
        });
        let session = Session {
            username: info.username,
            role,
            user_id: Some(info.user_id),
        };
        self.inner.session.set(session.clone());
        info!(username = %session.username, role = %session.role, "signed in");

        if let Err(e) = self.reload_all().await {
            warn!(error = %e, "initial load after sign-in failed");
        }

        if self.inner.config.hub_enabled {
            self.start_live().await;
        }

        Ok(session)
    }

    /// Restore a session from the persisted display cache.
    ///
    /// Probes the device list with the ambient cookie (this exercises the
    /// silent refresh). Any failure means the session is not recoverable:
    /// local state is cleared and the caller should drop the cache.
    pub async fn resume(&self, cached: CachedUser) -> Result<Session, CoreError> {
        if let Err(e) = self.inner.api.list_devices(false).await {
            debug!(error = %e, "session probe failed");
            self.inner.session.clear();
            return Err(CoreError::SessionExpired);
        }

        let session = Session {
            username: cached.username,
            role: cached.role,
            // The service only issues the identity token at login.
            user_id: None,
        };
        self.inner.session.set(session.clone());
        info!(username = %session.username, "session resumed");

        if let Err(e) = self.reload_all().await {
            warn!(error = %e, "initial load after resume failed");
        }

        if self.inner.config.hub_enabled {
            self.start_live().await;
        }

        Ok(session)
    }

    /// End the session: best-effort server logout, stop the live channel,
    /// drop all local state.
    pub async fn sign_out(&self) {
        if let Err(e) = self.inner.api.logout().await {
            warn!(error = %e, "logout failed (non-fatal)");
        }
        self.stop_live().await;
        self.inner.session.clear();
        self.inner.devices.clear_all();
        self.inner.notifications.clear();
        debug!("signed out");
    }

    /// Create a new account. Does not sign in.
    pub async fn register(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<String, CoreError> {
        let ack = self.inner.api.register(username, password).await?;
        Ok(ack
            .message
            .unwrap_or_else(|| "Registered successfully".to_owned()))
    }

    /// Tear down everything (process exit).
    pub async fn shutdown(&self) {
        self.stop_live().await;
        self.inner.cancel.cancel();
    }

    // ── Reconciliation entry points ──────────────────────────────────

    /// Replace both device partitions from the source of truth.
    ///
    /// The deleted partition is fetched only for privileged sessions and
    /// cleared otherwise. On fetch failure the affected partition is reset
    /// to empty (fail-safe: never show stale-looking data after an error)
    /// and the first error is returned.
    pub async fn reload_devices(&self) -> Result<(), CoreError> {
        let mut first_error = None;

        match self.inner.api.list_devices(false).await {
            Ok(records) => {
                self.inner
                    .devices
                    .replace_active(records.into_iter().map(Device::from).collect());
            }
            Err(e) => {
                warn!(error = %e, "active device fetch failed, resetting partition");
                self.inner.devices.clear_active();
                first_error = Some(self.fail(e).await);
            }
        }

        if self.inner.session.is_admin() {
            match self.inner.api.list_devices(true).await {
                Ok(records) => {
                    self.inner
                        .devices
                        .replace_deleted(records.into_iter().map(Device::from).collect());
                }
                Err(e) => {
                    warn!(error = %e, "deleted device fetch failed, resetting partition");
                    self.inner.devices.clear_deleted();
                    if first_error.is_none() {
                        first_error = Some(self.fail(e).await);
                    }
                }
            }
        } else {
            self.inner.devices.clear_deleted();
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Replace the notification feed and recompute the unread counter.
    pub async fn reload_notifications(&self) -> Result<(), CoreError> {
        match self.inner.api.list_notifications().await {
            Ok(records) => {
                self.inner
                    .notifications
                    .replace_all(records.into_iter().map(Notification::from).collect());
                Ok(())
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Both reconciliation paths, devices first.
    pub async fn reload_all(&self) -> Result<(), CoreError> {
        let devices = self.reload_devices().await;
        let notifications = self.reload_notifications().await;
        devices.and(notifications)
    }

    // ── Device mutations ─────────────────────────────────────────────

    /// Create a device.
    ///
    /// An optimistic duplicate pre-check against the active partition
    /// rejects locally-known collisions before any request. The
    /// collision-with-deleted signal from the server becomes a
    /// [`ConflictWithDeleted`](AddDeviceOutcome::ConflictWithDeleted)
    /// outcome instead of an error so callers can offer restore.
    pub async fn add_device(
        &self,
        name: &str,
        description: &str,
    ) -> Result<AddDeviceOutcome, CoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "device name is required".into(),
            });
        }
        if self.inner.devices.active_name_taken(name, None) {
            return Err(CoreError::DuplicateName {
                name: name.to_owned(),
            });
        }

        let payload = DevicePayload {
            device_name: name.to_owned(),
            description: normalize_description(description),
        };

        match self.inner.api.create_device(&payload).await {
            Ok(()) => {
                self.reload_all().await?;
                Ok(AddDeviceOutcome::Added)
            }
            Err(devdock_api::Error::NameConflict { message, device_id }) => {
                let restore_id = device_id.or_else(|| {
                    self.inner
                        .devices
                        .find_deleted_by_name(name)
                        .map(|d| d.id)
                });
                debug!(?restore_id, "create collided with a soft-deleted record");
                Ok(AddDeviceOutcome::ConflictWithDeleted {
                    restore_id,
                    message,
                })
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Update a device's name and description.
    pub async fn update_device(
        &self,
        id: i64,
        name: &str,
        description: &str,
    ) -> Result<(), CoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "device name is required".into(),
            });
        }
        if self.inner.devices.active_name_taken(name, Some(id)) {
            return Err(CoreError::DuplicateName {
                name: name.to_owned(),
            });
        }

        let payload = DevicePayload {
            device_name: name.to_owned(),
            description: normalize_description(description),
        };

        match self.inner.api.update_device(id, &payload).await {
            Ok(()) => self.reload_all().await,
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Soft-delete a device (it moves to the deleted partition).
    pub async fn remove_device(&self, id: i64) -> Result<(), CoreError> {
        match self.inner.api.delete_device(id).await {
            Ok(()) => self.reload_all().await,
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Restore a soft-deleted device into the active partition.
    pub async fn restore_device(&self, id: i64) -> Result<(), CoreError> {
        match self.inner.api.restore_device(id).await {
            Ok(()) => self.reload_all().await,
            Err(e) => Err(self.fail(e).await),
        }
    }

    // ── Notification mutations (optimistic) ──────────────────────────

    /// Mark one notification read: local state first, then best-effort
    /// server confirmation. A failed confirmation is logged, never rolled
    /// back -- an accepted consistency window.
    pub async fn mark_notification_read(&self, id: i64) {
        self.inner.notifications.mark_read(id);
        if let Err(e) = self.inner.api.mark_read(id).await {
            warn!(id, error = %e, "mark-read confirmation failed");
            if e.is_session_expired() {
                self.expire_session().await;
            }
        }
    }

    /// Mark the whole feed read, optimistically.
    pub async fn mark_all_notifications_read(&self) {
        self.inner.notifications.mark_all_read();
        if let Err(e) = self.inner.api.mark_all_read().await {
            warn!(error = %e, "mark-all-read confirmation failed");
            if e.is_session_expired() {
                self.expire_session().await;
            }
        }
    }

    /// Empty the local feed. Server-side history is untouched.
    pub fn clear_notifications(&self) {
        self.inner.notifications.clear();
    }

    // ── Async computation trigger ────────────────────────────────────

    /// Queue an average computation; the value arrives later as an
    /// [`AverageComputed`](Notice::AverageComputed) notice.
    pub async fn request_average(&self, column: &str) -> Result<String, CoreError> {
        match self.inner.api.calculate_average(column).await {
            Ok(ack) => Ok(ack
                .message
                .unwrap_or_else(|| format!("{column} queued for calculation"))),
            Err(e) => Err(self.fail(e).await),
        }
    }

    // ── Live channel ─────────────────────────────────────────────────

    /// Apply one normalized hub event to local state.
    ///
    /// The bridge task calls this for every received message; it is public
    /// so embedders and tests can drive the reaction table directly.
    pub async fn apply_hub_event(&self, event: HubEvent) {
        match event {
            HubEvent::DeviceAdded {
                device_name,
                added_by,
                user_id,
            } => {
                let own = self.inner.session.owns_user_id(user_id.as_deref());
                self.notify(Notice::DeviceAdded {
                    device_name,
                    added_by,
                });
                // Other users' adds don't affect this client's partitions
                // until the next explicit refresh.
                if own {
                    self.reload_quietly().await;
                }
            }
            HubEvent::DeviceUpdated {
                device_name,
                updated_by,
            } => {
                self.notify(Notice::DeviceUpdated {
                    device_name,
                    updated_by,
                });
                self.reload_quietly().await;
            }
            HubEvent::DeviceDeleted => {
                self.notify(Notice::DeviceDeleted);
                self.reload_quietly().await;
            }
            HubEvent::DeviceRestored { device_name } => {
                self.notify(Notice::DeviceRestored { device_name });
                self.reload_quietly().await;
            }
            HubEvent::NotificationCreated(notification) => {
                self.notify(Notice::NotificationReceived {
                    message: notification.message.clone(),
                });
                self.inner.notifications.prepend(notification);
            }
            HubEvent::AverageComputed { column, average } => {
                self.notify(Notice::AverageComputed { column, average });
            }
            HubEvent::Unknown { target } => {
                debug!(target, "ignoring unhandled hub event");
            }
        }
    }

    /// Start (or restart) the live channel for the current session.
    ///
    /// The previous channel, if any, is torn down first -- credentials and
    /// authorization scope differ per session, so the connection is never
    /// reused across session changes.
    async fn start_live(&self) {
        self.stop_live().await;

        let hub_url = self.inner.config.hub_url();
        let cookie = self.inner.api.cookie_header();
        if cookie.is_none() {
            warn!("no session cookie -- live channel requires a signed-in session (skipping)");
            return;
        }

        let hub_cancel = self.inner.cancel.child_token();
        let handle = match HubHandle::connect(
            hub_url,
            ReconnectConfig::default(),
            hub_cancel.clone(),
            cookie,
        ) {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "live channel start failed (non-fatal)");
                return;
            }
        };

        // Bridge task: raw hub messages → typed events → reactions.
        let mut event_rx = handle.subscribe();
        let coordinator = self.clone();
        let bridge_cancel = hub_cancel.clone();
        let bridge = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = bridge_cancel.cancelled() => break,
                    result = event_rx.recv() => {
                        match result {
                            Ok(msg) => {
                                let event = HubEvent::from_message(&msg);
                                coordinator.apply_hub_event(event).await;
                            }
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                warn!(skipped = n, "hub bridge: receiver lagged");
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                }
            }
        });

        // Status task: lifecycle transitions → status mirror + notices.
        let mut status_rx = handle.status();
        let coordinator = self.clone();
        let status_cancel = hub_cancel.clone();
        let status = tokio::spawn(async move {
            let mut prev = *status_rx.borrow();
            loop {
                tokio::select! {
                    biased;
                    () = status_cancel.cancelled() => break,
                    changed = status_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let now = *status_rx.borrow();
                        coordinator.apply_hub_status(prev, now);
                        prev = now;
                    }
                }
            }
        });

        *self.inner.hub_cancel.lock().await = hub_cancel;
        *self.inner.hub.lock().await = Some(handle);
        self.inner.task_handles.lock().await.extend([bridge, status]);
        info!("live channel started");
    }

    /// Tear down the live channel and reset the status mirror.
    async fn stop_live(&self) {
        self.inner.hub_cancel.lock().await.cancel();

        if let Some(handle) = self.inner.hub.lock().await.take() {
            handle.shutdown();
        }

        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            let drained: Vec<JoinHandle<()>> = handles.drain(..).collect();
            // Reap off-task: stop_live can be reached from inside the
            // bridge task (expiry discovered by a push-triggered refresh);
            // joining here would await the caller's own task.
            tokio::spawn(async move {
                for handle in drained {
                    let _ = handle.await;
                }
            });
        }

        let _ = self.inner.hub_status.send(HubStatus::Disconnected);
    }

    /// Map one hub status transition onto the mirror and the notices.
    fn apply_hub_status(&self, prev: HubStatus, now: HubStatus) {
        let _ = self.inner.hub_status.send(now);
        match now {
            HubStatus::Reconnecting => self.notify(Notice::HubReconnecting),
            HubStatus::Connected if prev == HubStatus::Reconnecting => {
                self.notify(Notice::HubReconnected);
            }
            HubStatus::Connected => {}
            HubStatus::Disconnected => self.notify(Notice::HubDisconnected),
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    fn notify(&self, notice: Notice) {
        // Send errors just mean nobody is listening right now.
        let _ = self.inner.notice_tx.send(notice);
    }

    async fn reload_quietly(&self) {
        if let Err(e) = self.reload_all().await {
            warn!(error = %e, "push-triggered refresh failed");
        }
    }

    /// Translate a wire error, handling irrecoverable session expiry:
    /// all local session state is dropped before the error surfaces.
    async fn fail(&self, err: devdock_api::Error) -> CoreError {
        if err.is_session_expired() {
            self.expire_session().await;
        }
        CoreError::from(err)
    }

    /// The headless equivalent of the forced reload to the unauthenticated
    /// state: drop everything, stop the live channel, announce it.
    async fn expire_session(&self) {
        warn!("session expired irrecoverably, clearing local state");
        self.stop_live().await;
        self.inner.session.clear();
        self.inner.devices.clear_all();
        self.inner.notifications.clear();
        self.notify(Notice::SessionExpired);
    }
}

/// Blank descriptions get the service's placeholder.
fn normalize_description(description: &str) -> String {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        EMPTY_DESCRIPTION.to_owned()
    } else {
        trimmed.to_owned()
    }
}
