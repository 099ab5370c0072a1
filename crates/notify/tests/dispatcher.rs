//! Dispatcher behavior: delivery transitions, exponential-backoff retries
//! and the retry bound.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use habita_core::channel::Channel;
use habita_core::event::EventKind;
use habita_core::notification::Status;
use habita_notify::delivery::{Delivery, InAppSender};
use habita_notify::dispatch::Dispatcher;
use habita_notify::{CreateNotification, NotificationEngine};

use common::{memory_engine, Attempt, ScriptedSender};

async fn create_due(engine: &Arc<NotificationEngine>, user_id: i64) -> i64 {
    let mut req = CreateNotification::new(user_id, EventKind::PaymentDue);
    req.metadata.insert("name".to_string(), json!("Diego"));
    req.metadata.insert("amount".to_string(), json!(380000));
    req.metadata
        .insert("due_date".to_string(), json!("2026-09-10T12:00:00Z"));
    req.scheduled_for = Some(Utc::now() - Duration::seconds(1));
    engine.create_notification(req).await.unwrap().id
}

#[tokio::test]
async fn successful_send_marks_sent() {
    let sender = ScriptedSender::new(Channel::Push, vec![Attempt::Succeed(Delivery::Sent)]);
    let engine = memory_engine(vec![Arc::clone(&sender) as _]);
    let id = create_due(&engine, 1).await;

    let processed = Dispatcher::new(Arc::clone(&engine)).poll_once(Utc::now()).await;
    assert_eq!(processed, 1);
    assert_eq!(sender.call_count(), 1);

    let stored = engine.get_notification(id).await.unwrap();
    assert_eq!(stored.status, Status::Sent);
    assert!(stored.sent_at.is_some());
    assert_eq!(engine.analytics_snapshot().sent, 1);
}

#[tokio::test]
async fn in_app_delivery_is_confirmed_synchronously() {
    let engine = memory_engine(vec![Arc::new(InAppSender)]);
    let mut req = CreateNotification::new(2, EventKind::PaymentDue);
    req.channels = Some(vec![Channel::InApp]);
    req.scheduled_for = Some(Utc::now() - Duration::seconds(1));
    let id = engine.create_notification(req).await.unwrap().id;

    Dispatcher::new(Arc::clone(&engine)).poll_once(Utc::now()).await;

    let stored = engine.get_notification(id).await.unwrap();
    assert_eq!(stored.status, Status::Delivered);
    let snapshot = engine.analytics_snapshot();
    assert_eq!(snapshot.sent, 1);
    assert_eq!(snapshot.delivered, 1);
}

#[tokio::test]
async fn failure_reschedules_with_backoff() {
    let sender = ScriptedSender::new(
        Channel::Push,
        vec![Attempt::Fail, Attempt::Succeed(Delivery::Sent)],
    );
    let engine = memory_engine(vec![Arc::clone(&sender) as _]);
    let id = create_due(&engine, 1).await;
    let dispatcher = Dispatcher::new(Arc::clone(&engine));

    dispatcher.poll_once(Utc::now()).await;
    let after_first = engine.get_notification(id).await.unwrap();
    assert_eq!(after_first.status, Status::Scheduled);
    assert_eq!(after_first.retry_count, 1);
    assert!(after_first.scheduled_for > Utc::now() - Duration::seconds(1));

    // Not due yet at the original time.
    assert_eq!(dispatcher.poll_once(after_first.scheduled_for - Duration::seconds(1)).await, 0);

    // Due once the backoff deadline passes; the second attempt succeeds.
    dispatcher.poll_once(Utc::now() + Duration::seconds(10)).await;
    let after_second = engine.get_notification(id).await.unwrap();
    assert_eq!(after_second.status, Status::Sent);
    assert_eq!(after_second.retry_count, 1);
    assert_eq!(sender.call_count(), 2);
}

#[tokio::test]
async fn retries_exhaust_into_terminal_failure() {
    let sender = ScriptedSender::always_failing(Channel::Push);
    let engine = memory_engine(vec![Arc::clone(&sender) as _]);
    let id = create_due(&engine, 1).await;
    let dispatcher = Dispatcher::new(Arc::clone(&engine));

    let mut poll_at = Utc::now();
    for _ in 0..3 {
        dispatcher.poll_once(poll_at).await;
        poll_at = poll_at + Duration::minutes(1);
    }

    let stored = engine.get_notification(id).await.unwrap();
    assert_eq!(stored.status, Status::Failed);
    assert_eq!(stored.retry_count, 3);
    assert_eq!(stored.retry_count, stored.max_retries);
    assert_eq!(sender.call_count(), 3);

    // Terminal failure is counted once, not per attempt.
    assert_eq!(engine.analytics_snapshot().failed, 1);

    // Nothing left to pick up, no further attempts.
    assert_eq!(dispatcher.poll_once(poll_at + Duration::days(1)).await, 0);
    assert_eq!(sender.call_count(), 3);
}

#[tokio::test]
async fn missing_adapter_follows_the_retry_path() {
    let engine = memory_engine(vec![]);
    let id = create_due(&engine, 1).await;
    let dispatcher = Dispatcher::new(Arc::clone(&engine));

    dispatcher.poll_once(Utc::now()).await;
    let stored = engine.get_notification(id).await.unwrap();
    assert_eq!(stored.status, Status::Scheduled);
    assert_eq!(stored.retry_count, 1);
}

#[tokio::test]
async fn future_work_is_not_claimed_early() {
    let sender = ScriptedSender::new(Channel::Push, vec![]);
    let engine = memory_engine(vec![Arc::clone(&sender) as _]);
    let mut req = CreateNotification::new(1, EventKind::PaymentDue);
    req.scheduled_for = Some(Utc::now() + Duration::days(2));
    engine.create_notification(req).await.unwrap();

    let dispatcher = Dispatcher::new(Arc::clone(&engine));
    assert_eq!(dispatcher.poll_once(Utc::now()).await, 0);
    assert_eq!(sender.call_count(), 0);

    // The row is durable schedule state: it becomes due by clock alone.
    assert_eq!(dispatcher.poll_once(Utc::now() + Duration::days(3)).await, 1);
}

#[tokio::test]
async fn batch_dispatch_covers_multiple_users() {
    let sender = ScriptedSender::new(Channel::Push, vec![]);
    let engine = memory_engine(vec![Arc::clone(&sender) as _]);
    for user_id in 1..=4 {
        create_due(&engine, user_id).await;
    }

    let processed = Dispatcher::new(Arc::clone(&engine)).poll_once(Utc::now()).await;
    assert_eq!(processed, 4);
    assert_eq!(engine.analytics_snapshot().sent, 4);
}
