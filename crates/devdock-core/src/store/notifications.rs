// ── Notification feed state ──
//
// Ordered list of notification entries (newest first) plus an unread
// counter. `refresh` replaces the feed wholesale and recomputes the
// counter; push events prepend single entries. Mark-read mutations are
// local-first -- server confirmation is the coordinator's concern.

use std::sync::Arc;

use tokio::sync::watch;

use crate::model::Notification;

pub struct NotificationFeed {
    entries: watch::Sender<Arc<Vec<Notification>>>,
    unread: watch::Sender<u64>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        let (entries, _) = watch::channel(Arc::new(Vec::new()));
        let (unread, _) = watch::channel(0);
        Self { entries, unread }
    }

    // ── Wholesale replacement ────────────────────────────────────────

    /// Replace the feed and recompute the unread counter from scratch.
    pub fn replace_all(&self, notifications: Vec<Notification>) {
        let unread = notifications.iter().filter(|n| !n.read).count() as u64;
        self.entries
            .send_modify(|snap| *snap = Arc::new(notifications));
        let _ = self.unread.send(unread);
    }

    /// Prepend one entry (a push event) and bump the unread counter.
    pub fn prepend(&self, notification: Notification) {
        let is_unread = !notification.read;
        self.entries.send_modify(|snap| {
            let mut next = Vec::with_capacity(snap.len() + 1);
            next.push(notification);
            next.extend(snap.iter().cloned());
            *snap = Arc::new(next);
        });
        if is_unread {
            self.unread.send_modify(|n| *n += 1);
        }
    }

    // ── Local read-state mutations (optimistic) ──────────────────────

    /// Flip one entry to read. Returns `true` if the entry existed and
    /// was unread.
    pub fn mark_read(&self, id: i64) -> bool {
        let mut flipped = false;
        self.entries.send_modify(|snap| {
            let mut next: Vec<Notification> = snap.as_ref().clone();
            for n in &mut next {
                if n.id == id && !n.read {
                    n.read = true;
                    flipped = true;
                }
            }
            *snap = Arc::new(next);
        });
        if flipped {
            self.unread.send_modify(|n| *n = n.saturating_sub(1));
        }
        flipped
    }

    /// Flip every entry to read and zero the counter.
    pub fn mark_all_read(&self) {
        self.entries.send_modify(|snap| {
            let next: Vec<Notification> = snap
                .iter()
                .map(|n| Notification {
                    read: true,
                    ..n.clone()
                })
                .collect();
            *snap = Arc::new(next);
        });
        let _ = self.unread.send(0);
    }

    /// Empty the local feed only -- server-side history is untouched.
    pub fn clear(&self) {
        self.entries.send_modify(|snap| *snap = Arc::new(Vec::new()));
        let _ = self.unread.send(0);
    }

    // ── Snapshots & subscriptions ────────────────────────────────────

    pub fn entries(&self) -> Arc<Vec<Notification>> {
        self.entries.borrow().clone()
    }

    pub fn unread_count(&self) -> u64 {
        *self.unread.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Notification>>> {
        self.entries.subscribe()
    }

    pub fn subscribe_unread(&self) -> watch::Receiver<u64> {
        self.unread.subscribe()
    }
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────────
