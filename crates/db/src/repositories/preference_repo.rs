//! Repository for per-user notification preferences.
//!
//! Preferences are stored as a single JSONB payload per user; the shape is
//! owned by `habita_core::preferences` and the database never inspects it.

use sqlx::PgPool;

use habita_core::preferences::UserPreferences;
use habita_core::types::DbId;

use crate::models::preferences::PreferenceRow;

pub struct PreferenceRepo;

impl PreferenceRepo {
    /// Fetch a user's stored preferences, if any.
    pub async fn get(pool: &PgPool, user_id: DbId) -> Result<Option<UserPreferences>, sqlx::Error> {
        let row = sqlx::query_as::<_, PreferenceRow>(
            "SELECT user_id, payload, created_at, updated_at \
             FROM notification_preferences WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        row.map(|r| r.decode().map_err(|e| sqlx::Error::Decode(Box::new(e))))
            .transpose()
    }

    /// Insert or replace a user's preferences.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        prefs: &UserPreferences,
    ) -> Result<(), sqlx::Error> {
        let payload =
            serde_json::to_value(prefs).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        sqlx::query(
            "INSERT INTO notification_preferences (user_id, payload) \
             VALUES ($1, $2) \
             ON CONFLICT (user_id) \
             DO UPDATE SET payload = EXCLUDED.payload, updated_at = NOW()",
        )
        .bind(user_id)
        .bind(payload)
        .execute(pool)
        .await?;
        Ok(())
    }
}
