//! Storage seams for the engine.
//!
//! The engine talks to storage through these traits so the HTTP surface and
//! the dispatcher can be exercised against [`crate::memory`] in tests while
//! production wires up the Postgres implementations in [`crate::pg`].

use async_trait::async_trait;
use thiserror::Error;

use habita_core::event::EventKind;
use habita_core::notification::{NewNotification, Notification};
use habita_core::preferences::UserPreferences;
use habita_core::types::{DbId, Timestamp};

#[derive(Debug, Error)]
#[error("storage backend error: {0}")]
pub struct StoreError(#[source] pub Box<dyn std::error::Error + Send + Sync>);

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Filters for [`NotificationStore::list_for_user`].
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub unread_only: bool,
    pub event: Option<EventKind>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            unread_only: false,
            event: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Result of a mark-as-read attempt.
#[derive(Debug)]
pub enum MarkReadOutcome {
    /// The row transitioned to `read`; callers record the analytics event.
    Updated(Notification),
    /// The row exists but was already read (or not yet readable). No-op.
    AlreadyRead,
    NotFound,
}

/// Result of a cancel attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    /// `sent_at` was already set; the message left the system.
    AlreadyDispatched,
    NotFound,
}

/// Persistence operations for the notification lifecycle.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, new: &NewNotification) -> Result<Notification, StoreError>;

    async fn get(&self, id: DbId) -> Result<Option<Notification>, StoreError>;

    /// Pending or scheduled rows whose send time has passed, oldest first.
    async fn claim_due(&self, now: Timestamp, limit: i64)
        -> Result<Vec<Notification>, StoreError>;

    async fn mark_sent(&self, id: DbId, at: Timestamp) -> Result<(), StoreError>;

    async fn mark_delivered(&self, id: DbId) -> Result<(), StoreError>;

    async fn mark_failed(&self, id: DbId, retry_count: i32) -> Result<(), StoreError>;

    async fn schedule_retry(
        &self,
        id: DbId,
        retry_count: i32,
        due: Timestamp,
    ) -> Result<(), StoreError>;

    async fn cancel(&self, id: DbId) -> Result<CancelOutcome, StoreError>;

    async fn list_for_user(
        &self,
        user_id: DbId,
        query: &ListQuery,
    ) -> Result<Vec<Notification>, StoreError>;

    async fn unread_count(&self, user_id: DbId) -> Result<i64, StoreError>;

    async fn mark_read(&self, id: DbId, at: Timestamp) -> Result<MarkReadOutcome, StoreError>;

    /// Returns the rows that actually transitioned.
    async fn mark_all_read(
        &self,
        user_id: DbId,
        at: Timestamp,
    ) -> Result<Vec<Notification>, StoreError>;
}

/// Persistence operations for user preferences.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, user_id: DbId) -> Result<Option<UserPreferences>, StoreError>;

    async fn upsert(&self, user_id: DbId, prefs: &UserPreferences) -> Result<(), StoreError>;
}
