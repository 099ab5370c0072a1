//! Postgres-backed store implementations, delegating to the `habita-db`
//! repositories.

use async_trait::async_trait;

use habita_core::notification::{NewNotification, Notification};
use habita_core::preferences::UserPreferences;
use habita_core::types::{DbId, Timestamp};
use habita_db::repositories::{NotificationRepo, PreferenceRepo};
use habita_db::DbPool;

use crate::store::{
    CancelOutcome, ListQuery, MarkReadOutcome, NotificationStore, PreferenceStore, StoreError,
};

#[derive(Clone)]
pub struct PgNotificationStore {
    pool: DbPool,
}

impl PgNotificationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn insert(&self, new: &NewNotification) -> Result<Notification, StoreError> {
        Ok(NotificationRepo::insert(&self.pool, new).await?)
    }

    async fn get(&self, id: DbId) -> Result<Option<Notification>, StoreError> {
        Ok(NotificationRepo::get(&self.pool, id).await?)
    }

    async fn claim_due(
        &self,
        now: Timestamp,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        Ok(NotificationRepo::claim_due(&self.pool, now, limit).await?)
    }

    async fn mark_sent(&self, id: DbId, at: Timestamp) -> Result<(), StoreError> {
        Ok(NotificationRepo::mark_sent(&self.pool, id, at).await?)
    }

    async fn mark_delivered(&self, id: DbId) -> Result<(), StoreError> {
        Ok(NotificationRepo::mark_delivered(&self.pool, id).await?)
    }

    async fn mark_failed(&self, id: DbId, retry_count: i32) -> Result<(), StoreError> {
        Ok(NotificationRepo::mark_failed(&self.pool, id, retry_count).await?)
    }

    async fn schedule_retry(
        &self,
        id: DbId,
        retry_count: i32,
        due: Timestamp,
    ) -> Result<(), StoreError> {
        Ok(NotificationRepo::schedule_retry(&self.pool, id, retry_count, due).await?)
    }

    async fn cancel(&self, id: DbId) -> Result<CancelOutcome, StoreError> {
        if NotificationRepo::cancel(&self.pool, id).await? {
            return Ok(CancelOutcome::Cancelled);
        }
        match NotificationRepo::get(&self.pool, id).await? {
            Some(_) => Ok(CancelOutcome::AlreadyDispatched),
            None => Ok(CancelOutcome::NotFound),
        }
    }

    async fn list_for_user(
        &self,
        user_id: DbId,
        query: &ListQuery,
    ) -> Result<Vec<Notification>, StoreError> {
        Ok(NotificationRepo::list_for_user(
            &self.pool,
            user_id,
            query.unread_only,
            query.event.map(|e| e.as_str()),
            query.limit,
            query.offset,
        )
        .await?)
    }

    async fn unread_count(&self, user_id: DbId) -> Result<i64, StoreError> {
        Ok(NotificationRepo::unread_count(&self.pool, user_id).await?)
    }

    async fn mark_read(&self, id: DbId, at: Timestamp) -> Result<MarkReadOutcome, StoreError> {
        if let Some(updated) = NotificationRepo::mark_read(&self.pool, id, at).await? {
            return Ok(MarkReadOutcome::Updated(updated));
        }
        match NotificationRepo::get(&self.pool, id).await? {
            Some(_) => Ok(MarkReadOutcome::AlreadyRead),
            None => Ok(MarkReadOutcome::NotFound),
        }
    }

    async fn mark_all_read(
        &self,
        user_id: DbId,
        at: Timestamp,
    ) -> Result<Vec<Notification>, StoreError> {
        Ok(NotificationRepo::mark_all_read(&self.pool, user_id, at).await?)
    }
}

#[derive(Clone)]
pub struct PgPreferenceStore {
    pool: DbPool,
}

impl PgPreferenceStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferenceStore for PgPreferenceStore {
    async fn get(&self, user_id: DbId) -> Result<Option<UserPreferences>, StoreError> {
        Ok(PreferenceRepo::get(&self.pool, user_id).await?)
    }

    async fn upsert(&self, user_id: DbId, prefs: &UserPreferences) -> Result<(), StoreError> {
        Ok(PreferenceRepo::upsert(&self.pool, user_id, prefs).await?)
    }
}
