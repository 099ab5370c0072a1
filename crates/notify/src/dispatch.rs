//! Background delivery loop.
//!
//! The dispatcher polls the store for due notifications and pushes each one
//! through its channel adapter. The schedule lives in the store, not in
//! in-process timers, so queued work survives restarts; a notification
//! created for next Tuesday is simply a row the poll picks up next Tuesday.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use habita_core::analytics::DeliveryEvent;
use habita_core::notification::Notification;
use habita_core::types::Timestamp;

use crate::delivery::Delivery;
use crate::engine::NotificationEngine;

/// How often the dispatcher polls for due notifications.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Maximum notifications claimed per poll.
const BATCH_SIZE: i64 = 100;

/// Exponential backoff delay after a failed attempt: 1 s, 2 s, 4 s, ...
pub fn backoff_delay(retry_count: i32) -> chrono::Duration {
    let exp = retry_count.clamp(0, 20) as u32;
    chrono::Duration::seconds(1_i64 << exp)
}

/// Background service that delivers due notifications.
pub struct Dispatcher {
    engine: Arc<NotificationEngine>,
}

impl Dispatcher {
    pub fn new(engine: Arc<NotificationEngine>) -> Self {
        Self { engine }
    }

    /// Run the dispatch loop until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(POLL_INTERVAL);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Dispatcher cancelled");
                    break;
                }
                _ = interval.tick() => {
                    self.poll_once(Utc::now()).await;
                }
            }
        }
    }

    /// Claim and dispatch every notification due at `now`.
    ///
    /// Returns the number of notifications processed. Dispatch within the
    /// batch is concurrent; there is no cross-user ordering guarantee.
    pub async fn poll_once(&self, now: Timestamp) -> usize {
        let due = match self.engine.store().claim_due(now, BATCH_SIZE).await {
            Ok(due) => due,
            Err(e) => {
                tracing::error!(error = %e, "Failed to claim due notifications");
                return 0;
            }
        };

        let count = due.len();
        join_all(due.into_iter().map(|n| self.dispatch_one(n))).await;

        if count > 0 {
            tracing::debug!(count, "Dispatched notification batch");
        }
        count
    }

    /// One delivery attempt for one notification.
    async fn dispatch_one(&self, notification: Notification) {
        let facts = match self.engine.preference_store().get(notification.user_id).await {
            Ok(prefs) => prefs.map(|p| p.facts).unwrap_or_default(),
            Err(e) => {
                tracing::warn!(
                    notification_id = notification.id,
                    error = %e,
                    "Preference read failed before send"
                );
                self.handle_failure(&notification).await;
                return;
            }
        };

        let Some(sender) = self.engine.sender_for(notification.channel) else {
            tracing::warn!(
                notification_id = notification.id,
                channel = notification.channel.as_str(),
                "No adapter registered for channel"
            );
            self.handle_failure(&notification).await;
            return;
        };

        match sender.send(&notification, &facts).await {
            Ok(delivery) => self.handle_success(&notification, delivery).await,
            Err(e) => {
                tracing::warn!(
                    notification_id = notification.id,
                    channel = notification.channel.as_str(),
                    attempt = notification.retry_count + 1,
                    error = %e,
                    "Send attempt failed"
                );
                self.handle_failure(&notification).await;
            }
        }
    }

    async fn handle_success(&self, notification: &Notification, delivery: Delivery) {
        let now = Utc::now();
        if let Err(e) = self.engine.store().mark_sent(notification.id, now).await {
            tracing::error!(notification_id = notification.id, error = %e, "Failed to mark sent");
            return;
        }
        self.engine
            .record(notification.channel, notification.event, DeliveryEvent::Sent, now);

        if delivery == Delivery::Delivered {
            if let Err(e) = self.engine.store().mark_delivered(notification.id).await {
                tracing::error!(
                    notification_id = notification.id,
                    error = %e,
                    "Failed to mark delivered"
                );
                return;
            }
            self.engine.record(
                notification.channel,
                notification.event,
                DeliveryEvent::Delivered,
                now,
            );
        }

        tracing::info!(
            notification_id = notification.id,
            channel = notification.channel.as_str(),
            "Notification sent"
        );
    }

    /// Reschedule with backoff, or fail terminally once retries are spent.
    ///
    /// The terminal `failed` analytics event is recorded exactly once, here,
    /// never per attempt.
    async fn handle_failure(&self, notification: &Notification) {
        let now = Utc::now();
        let attempts = notification.retry_count + 1;

        if attempts >= notification.max_retries {
            if let Err(e) = self.engine.store().mark_failed(notification.id, attempts).await {
                tracing::error!(
                    notification_id = notification.id,
                    error = %e,
                    "Failed to mark notification failed"
                );
                return;
            }
            self.engine.record(
                notification.channel,
                notification.event,
                DeliveryEvent::Failed,
                now,
            );
            tracing::error!(
                notification_id = notification.id,
                attempts,
                "Notification failed permanently, retries exhausted"
            );
            return;
        }

        let due = now + backoff_delay(notification.retry_count);
        if let Err(e) = self
            .engine
            .store()
            .schedule_retry(notification.id, attempts, due)
            .await
        {
            tracing::error!(
                notification_id = notification.id,
                error = %e,
                "Failed to schedule retry"
            );
            return;
        }
        tracing::info!(
            notification_id = notification.id,
            retry_count = attempts,
            due = %due,
            "Notification rescheduled with backoff"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(0), chrono::Duration::seconds(1));
        assert_eq!(backoff_delay(1), chrono::Duration::seconds(2));
        assert_eq!(backoff_delay(2), chrono::Duration::seconds(4));
    }

    #[test]
    fn backoff_shift_is_bounded() {
        assert_eq!(backoff_delay(100), chrono::Duration::seconds(1 << 20));
    }
}
