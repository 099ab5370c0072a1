//! Row model for the `notification_preferences` table.
//!
//! The whole preference record is stored as one JSONB payload keyed by
//! user id, so schema evolution happens in serde instead of migrations.

use sqlx::FromRow;

use habita_core::preferences::UserPreferences;
use habita_core::types::{DbId, Timestamp};

/// A row from the `notification_preferences` table.
#[derive(Debug, Clone, FromRow)]
pub struct PreferenceRow {
    pub user_id: DbId,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PreferenceRow {
    /// Decode the JSONB payload into the typed preference record.
    pub fn decode(self) -> Result<UserPreferences, serde_json::Error> {
        serde_json::from_value(self.payload)
    }
}
