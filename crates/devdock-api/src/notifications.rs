// Notification endpoints
//
// Feed fetch, unread count, and the mark-read confirmations. The mark
// endpoints are the server half of an optimistic flow -- local state is
// updated first in `devdock-core`, these calls confirm best-effort.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;

/// A notification entry as the service returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: i64,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnreadCount {
    #[serde(default, alias = "Count")]
    pub count: u64,
}

impl ApiClient {
    /// Fetch the full notification feed, newest first.
    pub async fn list_notifications(&self) -> Result<Vec<NotificationRecord>, Error> {
        let url = self.api_url("device/notifications");
        debug!("GET {}", url);
        self.request_json(self.http().get(url)).await
    }

    /// Fetch the server's unread counter.
    pub async fn unread_count(&self) -> Result<u64, Error> {
        let url = self.api_url("device/notifications/unread-count");
        debug!("GET {}", url);
        let body: UnreadCount = self.request_json(self.http().get(url)).await?;
        Ok(body.count)
    }

    /// Confirm a single notification as read.
    pub async fn mark_read(&self, id: i64) -> Result<(), Error> {
        let url = self.api_url(&format!("device/notifications/markread/{id}"));
        debug!("PUT {}", url);
        self.request_unit(self.http().put(url)).await
    }

    /// Confirm the whole feed as read.
    pub async fn mark_all_read(&self) -> Result<(), Error> {
        let url = self.api_url("device/notifications/markallread");
        debug!("PUT {}", url);
        self.request_unit(self.http().put(url)).await
    }
}
