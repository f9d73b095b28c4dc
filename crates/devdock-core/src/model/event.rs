// ── Typed hub events ──
//
// Raw hub payloads are loosely-typed records whose key casing varies by
// producer (`DeviceName` vs `deviceName`). Normalization happens here,
// once, at the boundary: everything past this module works with tagged
// variants.

use chrono::Utc;

use devdock_api::HubMessage;

use super::notification::Notification;

/// A normalized hub event, one variant per named invocation target.
#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    /// Someone created a device. `user_id` identifies the acting user so
    /// consumers can tell their own mutations from everyone else's.
    DeviceAdded {
        device_name: String,
        added_by: String,
        user_id: Option<String>,
    },
    DeviceUpdated {
        device_name: String,
        updated_by: String,
    },
    DeviceDeleted,
    DeviceRestored {
        device_name: String,
    },
    /// A server-side notification was created; always arrives unread.
    NotificationCreated(Notification),
    /// Result of an async column-average computation.
    AverageComputed {
        column: String,
        average: f64,
    },
    /// Target this client doesn't consume.
    Unknown {
        target: String,
    },
}

impl HubEvent {
    /// Map a raw hub message into a typed event, accepting either payload
    /// key casing.
    pub fn from_message(msg: &HubMessage) -> Self {
        let data = &msg.data;
        match msg.target.as_str() {
            "DeviceAdded" => Self::DeviceAdded {
                device_name: str_field(data, "deviceName", "DeviceName").unwrap_or_default(),
                added_by: str_field(data, "addedBy", "AddedBy").unwrap_or_default(),
                user_id: str_field(data, "userId", "UserId"),
            },
            "DeviceUpdated" => Self::DeviceUpdated {
                device_name: str_field(data, "deviceName", "DeviceName").unwrap_or_default(),
                updated_by: str_field(data, "updatedBy", "UpdatedBy").unwrap_or_default(),
            },
            "DeviceDeleted" => Self::DeviceDeleted,
            "DeviceRestored" => Self::DeviceRestored {
                device_name: str_field(data, "deviceName", "DeviceName").unwrap_or_default(),
            },
            "NewNotification" => Self::NotificationCreated(Notification {
                id: int_field(data, "id", "Id").unwrap_or_default(),
                message: str_field(data, "message", "Message").unwrap_or_default(),
                created_at: str_field(data, "createdAt", "CreatedAt")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(Utc::now),
                // Pushed notifications are unread by definition.
                read: false,
            }),
            "ReceiveAverage" => Self::AverageComputed {
                column: str_field(data, "column", "Column").unwrap_or_default(),
                average: float_field(data, "average", "Average").unwrap_or_default(),
            },
            other => Self::Unknown {
                target: other.to_owned(),
            },
        }
    }
}

// ── Casing-tolerant field access ─────────────────────────────────────

fn field<'a>(
    data: &'a serde_json::Value,
    camel: &str,
    pascal: &str,
) -> Option<&'a serde_json::Value> {
    data.get(camel).or_else(|| data.get(pascal))
}

fn str_field(data: &serde_json::Value, camel: &str, pascal: &str) -> Option<String> {
    field(data, camel, pascal)
        .and_then(serde_json::Value::as_str)
        .map(String::from)
}

fn int_field(data: &serde_json::Value, camel: &str, pascal: &str) -> Option<i64> {
    field(data, camel, pascal).and_then(serde_json::Value::as_i64)
}

fn float_field(data: &serde_json::Value, camel: &str, pascal: &str) -> Option<f64> {
    field(data, camel, pascal).and_then(serde_json::Value::as_f64)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn msg(target: &str, data: serde_json::Value) -> HubMessage {
        HubMessage {
            target: target.to_owned(),
            data,
        }
    }

    #[test]
    fn device_added_accepts_pascal_case() {
        let event = HubEvent::from_message(&msg(
            "DeviceAdded",
            json!({ "DeviceName": "Sensor-A", "AddedBy": "alice", "UserId": "u-42" }),
        ));

        assert_eq!(
            event,
            HubEvent::DeviceAdded {
                device_name: "Sensor-A".into(),
                added_by: "alice".into(),
                user_id: Some("u-42".into()),
            }
        );
    }

    #[test]
    fn device_added_accepts_camel_case() {
        let event = HubEvent::from_message(&msg(
            "DeviceAdded",
            json!({ "deviceName": "Sensor-A", "addedBy": "alice", "userId": "u-42" }),
        ));

        assert_eq!(
            event,
            HubEvent::DeviceAdded {
                device_name: "Sensor-A".into(),
                added_by: "alice".into(),
                user_id: Some("u-42".into()),
            }
        );
    }

    #[test]
    fn device_updated_and_restored_carry_names() {
        let updated = HubEvent::from_message(&msg(
            "DeviceUpdated",
            json!({ "deviceName": "Old-Cam", "UpdatedBy": "bob" }),
        ));
        assert_eq!(
            updated,
            HubEvent::DeviceUpdated {
                device_name: "Old-Cam".into(),
                updated_by: "bob".into(),
            }
        );

        let restored =
            HubEvent::from_message(&msg("DeviceRestored", json!({ "DeviceName": "Old-Cam" })));
        assert_eq!(
            restored,
            HubEvent::DeviceRestored {
                device_name: "Old-Cam".into(),
            }
        );
    }

    #[test]
    fn new_notification_normalizes_to_unread() {
        let event = HubEvent::from_message(&msg(
            "NewNotification",
            json!({
                "Id": 9,
                "Message": "alice added device \"Sensor-A\"",
                "CreatedAt": "2026-03-01T10:00:00Z",
                "IsRead": true
            }),
        ));

        match event {
            HubEvent::NotificationCreated(n) => {
                assert_eq!(n.id, 9);
                assert_eq!(n.message, "alice added device \"Sensor-A\"");
                // Unread regardless of what the payload claims.
                assert!(!n.read);
            }
            other => panic!("expected NotificationCreated, got {other:?}"),
        }
    }

    #[test]
    fn new_notification_defaults_missing_timestamp() {
        let event = HubEvent::from_message(&msg("NewNotification", json!({ "message": "hi" })));

        match event {
            HubEvent::NotificationCreated(n) => {
                assert_eq!(n.message, "hi");
                assert_eq!(n.id, 0);
            }
            other => panic!("expected NotificationCreated, got {other:?}"),
        }
    }

    #[test]
    fn receive_average_parses_value() {
        let event = HubEvent::from_message(&msg(
            "ReceiveAverage",
            json!({ "column": "Temperature", "average": 21.5 }),
        ));

        assert_eq!(
            event,
            HubEvent::AverageComputed {
                column: "Temperature".into(),
                average: 21.5,
            }
        );
    }

    #[test]
    fn unknown_targets_are_tagged() {
        let event = HubEvent::from_message(&msg("SomethingElse", json!({})));
        assert_eq!(
            event,
            HubEvent::Unknown {
                target: "SomethingElse".into(),
            }
        );
    }
}
