// ── Device view state ──
//
// Client-local projection of the remote device collection, split into
// disjoint active/deleted partitions keyed by id. Each partition is
// replaced wholesale from the source of truth; between a mutation and its
// follow-up refresh the view is eventually consistent with the server.

use std::sync::Arc;

use tokio::sync::watch;

use crate::model::Device;

/// The two disjoint partitions of the device collection.
pub struct DeviceStore {
    active: watch::Sender<Arc<Vec<Device>>>,
    deleted: watch::Sender<Arc<Vec<Device>>>,
}

impl DeviceStore {
    pub fn new() -> Self {
        let (active, _) = watch::channel(Arc::new(Vec::new()));
        let (deleted, _) = watch::channel(Arc::new(Vec::new()));
        Self { active, deleted }
    }

    // ── Wholesale replacement ────────────────────────────────────────

    /// Replace the active partition. The partition flag is stamped so the
    /// invariant holds regardless of what the fetch returned.
    pub fn replace_active(&self, devices: Vec<Device>) {
        let stamped: Vec<Device> = devices
            .into_iter()
            .map(|d| Device { deleted: false, ..d })
            .collect();
        self.active.send_modify(|snap| *snap = Arc::new(stamped));
    }

    /// Replace the deleted partition.
    pub fn replace_deleted(&self, devices: Vec<Device>) {
        let stamped: Vec<Device> = devices
            .into_iter()
            .map(|d| Device { deleted: true, ..d })
            .collect();
        self.deleted.send_modify(|snap| *snap = Arc::new(stamped));
    }

    /// Reset the active partition -- the fail-safe after a fetch error.
    pub fn clear_active(&self) {
        self.active.send_modify(|snap| *snap = Arc::new(Vec::new()));
    }

    /// Reset the deleted partition.
    pub fn clear_deleted(&self) {
        self.deleted.send_modify(|snap| *snap = Arc::new(Vec::new()));
    }

    pub fn clear_all(&self) {
        self.clear_active();
        self.clear_deleted();
    }

    // ── Snapshots & subscriptions ────────────────────────────────────

    /// Current active partition (cheap `Arc` clone).
    pub fn active(&self) -> Arc<Vec<Device>> {
        self.active.borrow().clone()
    }

    /// Current deleted partition.
    pub fn deleted(&self) -> Arc<Vec<Device>> {
        self.deleted.borrow().clone()
    }

    pub fn subscribe_active(&self) -> watch::Receiver<Arc<Vec<Device>>> {
        self.active.subscribe()
    }

    pub fn subscribe_deleted(&self) -> watch::Receiver<Arc<Vec<Device>>> {
        self.deleted.subscribe()
    }

    // ── Lookups ──────────────────────────────────────────────────────

    /// Case-insensitive name lookup in the deleted partition.
    ///
    /// Fallback path for the add-conflict flow when the server omits the
    /// colliding record's id. Heuristic: if two deleted devices share a
    /// name, the first match wins.
    pub fn find_deleted_by_name(&self, name: &str) -> Option<Device> {
        self.deleted
            .borrow()
            .iter()
            .find(|d| d.name_matches(name))
            .cloned()
    }

    /// Case-insensitive duplicate check against the active partition,
    /// optionally excluding one id (the record being edited).
    pub fn active_name_taken(&self, name: &str, exclude_id: Option<i64>) -> bool {
        self.active
            .borrow()
            .iter()
            .any(|d| d.name_matches(name) && Some(d.id) != exclude_id)
    }
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────────
