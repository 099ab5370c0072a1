//! Notification dispatch engine.
//!
//! Ties the pure domain logic in `habita-core` to storage and the outbound
//! channel adapters: [`engine::NotificationEngine`] is the application-facing
//! API, [`dispatch::Dispatcher`] is the background loop that drains due work.

pub mod delivery;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod memory;
pub mod pg;
pub mod store;

pub use engine::{CreateNotification, NotificationEngine};
pub use error::NotifyError;
