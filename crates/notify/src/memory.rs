//! In-memory store implementations.
//!
//! Behaviorally equivalent to the Postgres stores (same status guards, same
//! ordering) so engine and dispatcher tests run without a database. Also
//! usable as a scratch backend in local tooling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use habita_core::notification::{NewNotification, Notification, Status};
use habita_core::preferences::UserPreferences;
use habita_core::types::{DbId, Timestamp};

use crate::store::{
    CancelOutcome, ListQuery, MarkReadOutcome, NotificationStore, PreferenceStore, StoreError,
};

#[derive(Default)]
pub struct MemoryStore {
    next_id: AtomicI64,
    rows: Mutex<HashMap<DbId, Notification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            rows: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<DbId, Notification>> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert(&self, new: &NewNotification) -> Result<Notification, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let row = Notification {
            id,
            user_id: new.user_id,
            event: new.event,
            priority: new.priority,
            title: new.title.clone(),
            body: new.body.clone(),
            channel: new.channel,
            scheduled_for: new.scheduled_for,
            metadata: new.metadata.clone(),
            status: Status::Scheduled,
            created_at: Utc::now(),
            sent_at: None,
            read_at: None,
            retry_count: 0,
            max_retries: new.max_retries,
        };
        self.lock().insert(id, row.clone());
        Ok(row)
    }

    async fn get(&self, id: DbId) -> Result<Option<Notification>, StoreError> {
        Ok(self.lock().get(&id).cloned())
    }

    async fn claim_due(
        &self,
        now: Timestamp,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let rows = self.lock();
        let mut due: Vec<Notification> = rows
            .values()
            .filter(|n| matches!(n.status, Status::Pending | Status::Scheduled))
            .filter(|n| n.scheduled_for <= now)
            .cloned()
            .collect();
        due.sort_by_key(|n| (n.scheduled_for, n.id));
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn mark_sent(&self, id: DbId, at: Timestamp) -> Result<(), StoreError> {
        let mut rows = self.lock();
        if let Some(n) = rows.get_mut(&id) {
            if matches!(n.status, Status::Pending | Status::Scheduled) {
                n.status = Status::Sent;
                n.sent_at = Some(at);
            }
        }
        Ok(())
    }

    async fn mark_delivered(&self, id: DbId) -> Result<(), StoreError> {
        let mut rows = self.lock();
        if let Some(n) = rows.get_mut(&id) {
            if n.status == Status::Sent {
                n.status = Status::Delivered;
            }
        }
        Ok(())
    }

    async fn mark_failed(&self, id: DbId, retry_count: i32) -> Result<(), StoreError> {
        let mut rows = self.lock();
        if let Some(n) = rows.get_mut(&id) {
            if matches!(n.status, Status::Pending | Status::Scheduled) {
                n.status = Status::Failed;
                n.retry_count = retry_count;
            }
        }
        Ok(())
    }

    async fn schedule_retry(
        &self,
        id: DbId,
        retry_count: i32,
        due: Timestamp,
    ) -> Result<(), StoreError> {
        let mut rows = self.lock();
        if let Some(n) = rows.get_mut(&id) {
            if n.sent_at.is_none() {
                n.status = Status::Scheduled;
                n.retry_count = retry_count;
                n.scheduled_for = due;
            }
        }
        Ok(())
    }

    async fn cancel(&self, id: DbId) -> Result<CancelOutcome, StoreError> {
        let mut rows = self.lock();
        match rows.get_mut(&id) {
            None => Ok(CancelOutcome::NotFound),
            Some(n) if n.sent_at.is_some() => Ok(CancelOutcome::AlreadyDispatched),
            Some(n) if matches!(n.status, Status::Cancelled | Status::Failed) => {
                Ok(CancelOutcome::AlreadyDispatched)
            }
            Some(n) => {
                n.status = Status::Cancelled;
                Ok(CancelOutcome::Cancelled)
            }
        }
    }

    async fn list_for_user(
        &self,
        user_id: DbId,
        query: &ListQuery,
    ) -> Result<Vec<Notification>, StoreError> {
        let rows = self.lock();
        let mut out: Vec<Notification> = rows
            .values()
            .filter(|n| n.user_id == user_id)
            .filter(|n| {
                !query.unread_only || (n.read_at.is_none() && n.status != Status::Cancelled)
            })
            .filter(|n| query.event.is_none_or(|e| n.event == e))
            .cloned()
            .collect();
        out.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        let start = (query.offset as usize).min(out.len());
        let end = (start + query.limit as usize).min(out.len());
        Ok(out[start..end].to_vec())
    }

    async fn unread_count(&self, user_id: DbId) -> Result<i64, StoreError> {
        let rows = self.lock();
        Ok(rows
            .values()
            .filter(|n| {
                n.user_id == user_id && n.read_at.is_none() && n.status != Status::Cancelled
            })
            .count() as i64)
    }

    async fn mark_read(&self, id: DbId, at: Timestamp) -> Result<MarkReadOutcome, StoreError> {
        let mut rows = self.lock();
        match rows.get_mut(&id) {
            None => Ok(MarkReadOutcome::NotFound),
            Some(n)
                if n.read_at.is_none()
                    && matches!(n.status, Status::Sent | Status::Delivered) =>
            {
                n.status = Status::Read;
                n.read_at = Some(at);
                Ok(MarkReadOutcome::Updated(n.clone()))
            }
            Some(_) => Ok(MarkReadOutcome::AlreadyRead),
        }
    }

    async fn mark_all_read(
        &self,
        user_id: DbId,
        at: Timestamp,
    ) -> Result<Vec<Notification>, StoreError> {
        let mut rows = self.lock();
        let mut updated = Vec::new();
        for n in rows.values_mut() {
            if n.user_id == user_id
                && n.read_at.is_none()
                && matches!(n.status, Status::Sent | Status::Delivered)
            {
                n.status = Status::Read;
                n.read_at = Some(at);
                updated.push(n.clone());
            }
        }
        updated.sort_by_key(|n| n.id);
        Ok(updated)
    }
}

#[derive(Default)]
pub struct MemoryPreferenceStore {
    rows: Mutex<HashMap<DbId, UserPreferences>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn get(&self, user_id: DbId) -> Result<Option<UserPreferences>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&user_id)
            .cloned())
    }

    async fn upsert(&self, user_id: DbId, prefs: &UserPreferences) -> Result<(), StoreError> {
        self.rows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user_id, prefs.clone());
        Ok(())
    }
}
