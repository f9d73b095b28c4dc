// ── Device domain type ──

use serde::{Deserialize, Serialize};

use devdock_api::DeviceRecord;

/// A device record as the client sees it.
///
/// `id` is server-assigned and immutable. `deleted` marks which partition
/// the record belongs to; the client never hard-deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_by: Option<String>,
    pub deleted: bool,
}

impl Device {
    /// Case-insensitive name comparison against a trimmed candidate.
    pub fn name_matches(&self, candidate: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(candidate.trim())
    }
}

impl From<DeviceRecord> for Device {
    fn from(r: DeviceRecord) -> Self {
        Self {
            id: r.id,
            name: r.device_name,
            description: r.description,
            created_by: r.created_by,
            deleted: r.is_deleted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_matches_ignores_case_and_whitespace() {
        let d = Device {
            id: 1,
            name: "Sensor-A".into(),
            description: String::new(),
            created_by: None,
            deleted: false,
        };
        assert!(d.name_matches("sensor-a"));
        assert!(d.name_matches("  SENSOR-A  "));
        assert!(!d.name_matches("Sensor-B"));
    }
}
