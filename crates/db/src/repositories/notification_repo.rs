//! Repository for the `notifications` table.
//!
//! All lifecycle mutations funnel through here; no other component writes
//! notification state. Status guards in the `WHERE` clauses keep the
//! forward-only state machine honest even under concurrent callers.

use sqlx::PgPool;

use habita_core::notification::{NewNotification, Notification};
use habita_core::types::{DbId, Timestamp};

use crate::models::notification::NotificationRow;

/// Column list for `notifications` queries.
const COLUMNS: &str = "id, user_id, event_kind, priority, title, body, channel, scheduled_for, \
     metadata, status, created_at, sent_at, read_at, retry_count, max_retries";

/// Provides lifecycle and query operations for notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Persist a new notification in `scheduled` state, returning the full
    /// stored entity.
    pub async fn insert(pool: &PgPool, new: &NewNotification) -> Result<Notification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications \
                (user_id, event_kind, priority, title, body, channel, scheduled_for, \
                 metadata, status, max_retries) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'scheduled', $9) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, NotificationRow>(&query)
            .bind(new.user_id)
            .bind(new.event.as_str())
            .bind(new.priority.as_str())
            .bind(&new.title)
            .bind(&new.body)
            .bind(new.channel.as_str())
            .bind(new.scheduled_for)
            .bind(&new.metadata)
            .bind(new.max_retries)
            .fetch_one(pool)
            .await?;
        decode(row)
    }

    pub async fn get(pool: &PgPool, id: DbId) -> Result<Option<Notification>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notifications WHERE id = $1");
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(decode)
            .transpose()
    }

    /// Fetch due work for the dispatcher: scheduled notifications whose send
    /// time has passed, oldest first. The single-dispatcher deployment model
    /// means no row-claim marker is needed; a batch is fully processed
    /// before the next poll.
    pub async fn claim_due(
        pool: &PgPool,
        now: Timestamp,
        limit: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE status IN ('pending', 'scheduled') AND scheduled_for <= $1 \
             ORDER BY scheduled_for, id \
             LIMIT $2"
        );
        let rows = sqlx::query_as::<_, NotificationRow>(&query)
            .bind(now)
            .bind(limit)
            .fetch_all(pool)
            .await?;
        rows.into_iter().map(decode).collect()
    }

    /// Transition to `sent` and stamp `sent_at`.
    pub async fn mark_sent(pool: &PgPool, id: DbId, at: Timestamp) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE notifications SET status = 'sent', sent_at = $2 \
             WHERE id = $1 AND status IN ('pending', 'scheduled')",
        )
        .bind(id)
        .bind(at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Transition a sent notification to `delivered`.
    pub async fn mark_delivered(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE notifications SET status = 'delivered' WHERE id = $1 AND status = 'sent'")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Terminal failure: retries exhausted.
    pub async fn mark_failed(
        pool: &PgPool,
        id: DbId,
        retry_count: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE notifications SET status = 'failed', retry_count = $2 \
             WHERE id = $1 AND status IN ('pending', 'scheduled')",
        )
        .bind(id)
        .bind(retry_count)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Re-queue a failed attempt: bump the retry count and push the send
    /// time out to the backoff deadline.
    pub async fn schedule_retry(
        pool: &PgPool,
        id: DbId,
        retry_count: i32,
        due: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE notifications \
             SET status = 'scheduled', retry_count = $2, scheduled_for = $3 \
             WHERE id = $1 AND sent_at IS NULL",
        )
        .bind(id)
        .bind(retry_count)
        .bind(due)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Cancel a notification that has not been sent yet.
    ///
    /// Returns `true` when the row transitioned, `false` when it was already
    /// dispatched (or does not exist).
    pub async fn cancel(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET status = 'cancelled' \
             WHERE id = $1 AND sent_at IS NULL AND status NOT IN ('cancelled', 'failed')",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List notifications for a user, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        unread_only: bool,
        event_kind: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let unread_filter = if unread_only {
            "AND read_at IS NULL AND status <> 'cancelled'"
        } else {
            ""
        };
        let event_filter = if event_kind.is_some() {
            "AND event_kind = $4"
        } else {
            ""
        };
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE user_id = $1 {unread_filter} {event_filter} \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );

        let mut q = sqlx::query_as::<_, NotificationRow>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset);
        if let Some(kind) = event_kind {
            q = q.bind(kind);
        }
        let rows = q.fetch_all(pool).await?;
        rows.into_iter().map(decode).collect()
    }

    /// Number of unread (and not cancelled) notifications for a user.
    pub async fn unread_count(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications \
             WHERE user_id = $1 AND read_at IS NULL AND status <> 'cancelled'",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }

    /// Mark a notification as read.
    ///
    /// Idempotent at the SQL level: only rows that are sent or delivered and
    /// not yet read transition, so a second call returns `None` and leaves
    /// `read_at` unchanged. Callers distinguish "already read" from "not
    /// found" via [`NotificationRepo::get`].
    pub async fn mark_read(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
    ) -> Result<Option<Notification>, sqlx::Error> {
        let query = format!(
            "UPDATE notifications SET status = 'read', read_at = $2 \
             WHERE id = $1 AND read_at IS NULL AND status IN ('sent', 'delivered') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(id)
            .bind(at)
            .fetch_optional(pool)
            .await?
            .map(decode)
            .transpose()
    }

    /// Mark every readable notification for a user as read, returning the
    /// rows that transitioned (for analytics accounting).
    pub async fn mark_all_read(
        pool: &PgPool,
        user_id: DbId,
        at: Timestamp,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "UPDATE notifications SET status = 'read', read_at = $2 \
             WHERE user_id = $1 AND read_at IS NULL AND status IN ('sent', 'delivered') \
             RETURNING {COLUMNS}"
        );
        let rows = sqlx::query_as::<_, NotificationRow>(&query)
            .bind(user_id)
            .bind(at)
            .fetch_all(pool)
            .await?;
        rows.into_iter().map(decode).collect()
    }
}

/// Convert a raw row, surfacing corrupt enum columns as decode errors.
fn decode(row: NotificationRow) -> Result<Notification, sqlx::Error> {
    Notification::try_from(row).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}
