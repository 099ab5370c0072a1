//! Row model for the `notifications` table.
//!
//! Enum-valued columns are stored as TEXT; the row converts into the typed
//! [`Notification`] entity at the repository boundary so the rest of the
//! system never sees raw strings.

use sqlx::FromRow;

use habita_core::notification::Notification;
use habita_core::types::{DbId, Timestamp};

/// A row from the `notifications` table, one column per field.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: DbId,
    pub user_id: DbId,
    pub event_kind: String,
    pub priority: String,
    pub title: String,
    pub body: String,
    pub channel: String,
    pub scheduled_for: Timestamp,
    pub metadata: serde_json::Value,
    pub status: String,
    pub created_at: Timestamp,
    pub sent_at: Option<Timestamp>,
    pub read_at: Option<Timestamp>,
    pub retry_count: i32,
    pub max_retries: i32,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = habita_core::error::UnknownVariant;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            event: row.event_kind.parse()?,
            priority: row.priority.parse()?,
            title: row.title,
            body: row.body,
            channel: row.channel.parse()?,
            scheduled_for: row.scheduled_for,
            metadata: row.metadata,
            status: row.status.parse()?,
            created_at: row.created_at,
            sent_at: row.sent_at,
            read_at: row.read_at,
            retry_count: row.retry_count,
            max_retries: row.max_retries,
        })
    }
}
