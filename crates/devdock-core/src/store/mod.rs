// ── Client-local view state ──
//
// Watch-backed snapshot holders. Every mutation replaces a snapshot
// wholesale, so concurrent refreshes commute -- last write wins, no merge
// logic needed.

pub mod devices;
pub mod notifications;

pub use devices::DeviceStore;
pub use notifications::NotificationFeed;
