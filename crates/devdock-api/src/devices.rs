// Device endpoints
//
// List (filterable by the deleted flag), create, update, soft-delete,
// restore, and the async column-average trigger. All calls ride through
// the refresh-and-retry wrapper in `client.rs`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;

/// A device record as the service returns it.
///
/// The list endpoint omits `isDeleted` (the query parameter already fixes
/// it); callers stamp the partition flag after fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub id: i64,
    pub device_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
}

/// Payload for create and update.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePayload {
    pub device_name: String,
    pub description: String,
}

/// Acknowledgement from the async average-computation trigger.
///
/// The computed value arrives later as a `ReceiveAverage` hub event.
#[derive(Debug, Clone, Deserialize)]
pub struct AverageAck {
    #[serde(default, alias = "Message")]
    pub message: Option<String>,
}

impl ApiClient {
    /// Fetch one partition of the device collection.
    ///
    /// `deleted: false` returns active devices, `true` the soft-deleted
    /// ones (the latter requires a privileged session server-side).
    pub async fn list_devices(&self, deleted: bool) -> Result<Vec<DeviceRecord>, Error> {
        let mut url = self.api_url("device");
        url.query_pairs_mut()
            .append_pair("deleted", if deleted { "true" } else { "false" });
        debug!("GET {}", url);

        let records: Vec<DeviceRecord> = self.request_json(self.http().get(url)).await?;

        // Stamp the partition flag -- the list body doesn't carry it.
        Ok(records
            .into_iter()
            .map(|d| DeviceRecord {
                is_deleted: deleted,
                ..d
            })
            .collect())
    }

    /// Create a device.
    ///
    /// A name collision with a soft-deleted record surfaces as
    /// [`Error::NameConflict`] carrying the colliding record's id when the
    /// server includes it.
    pub async fn create_device(&self, payload: &DevicePayload) -> Result<(), Error> {
        let url = self.api_url("device");
        debug!("POST {}", url);
        self.request_unit(self.http().post(url).json(payload)).await
    }

    /// Update a device's name and description.
    pub async fn update_device(&self, id: i64, payload: &DevicePayload) -> Result<(), Error> {
        let url = self.api_url(&format!("device/{id}"));
        debug!("PUT {}", url);
        self.request_unit(self.http().put(url).json(payload)).await
    }

    /// Soft-delete a device. The record stays restorable server-side.
    pub async fn delete_device(&self, id: i64) -> Result<(), Error> {
        let url = self.api_url(&format!("device/{id}"));
        debug!("DELETE {}", url);
        self.request_unit(self.http().delete(url)).await
    }

    /// Restore a soft-deleted device into the active partition.
    pub async fn restore_device(&self, id: i64) -> Result<(), Error> {
        let url = self.api_url(&format!("device/restore/{id}"));
        debug!("PUT {}", url);
        self.request_unit(self.http().put(url)).await
    }

    /// Queue an average computation over the named column.
    pub async fn calculate_average(&self, column: &str) -> Result<AverageAck, Error> {
        let url = self.api_url("device/calculate-average");
        debug!("POST {}", url);
        let body = serde_json::json!({ "columnName": column });
        self.request_json(self.http().post(url).json(&body)).await
    }
}
