// ── Notification domain type ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use devdock_api::NotificationRecord;

/// One entry in the notification feed.
///
/// `read` transitions false→true only (mark-read is one-way).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl From<NotificationRecord> for Notification {
    fn from(r: NotificationRecord) -> Self {
        Self {
            id: r.id,
            message: r.message,
            created_at: r.created_at,
            read: r.is_read,
        }
    }
}
