// ── Domain model ──

pub mod device;
pub mod event;
pub mod notification;

pub use device::Device;
pub use event::HubEvent;
pub use notification::Notification;
