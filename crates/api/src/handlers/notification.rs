//! Handlers for the notification, preference and analytics resources.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use habita_core::channel::Channel;
use habita_core::event::{EventKind, Priority};
use habita_core::notification::Notification;
use habita_core::preferences::PreferencesUpdate;
use habita_core::types::{DbId, Timestamp};
use habita_notify::store::ListQuery;
use habita_notify::CreateNotification;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum page size for notification listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for notification listing.
const DEFAULT_LIMIT: i64 = 50;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body for `POST /notifications`.
#[derive(Debug, Deserialize)]
pub struct CreateNotificationBody {
    pub user_id: DbId,
    pub event: EventKind,
    /// Event payload; supplies the template variables and is stored on the
    /// notification.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    pub priority: Option<Priority>,
    /// Restrict the candidate channel set.
    pub channels: Option<Vec<Channel>>,
    /// Explicit send time; bypasses the scheduling heuristics.
    pub scheduled_for: Option<Timestamp>,
}

/// Query parameters for `GET /users/{user_id}/notifications`.
#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    /// If `true`, return only unread notifications. Defaults to `false`.
    pub unread_only: Option<bool>,
    /// Restrict to one event kind.
    pub event: Option<EventKind>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// Payload for the notification listing: the page plus the unread badge
/// count the inbox UI renders next to it.
#[derive(Debug, serde::Serialize)]
pub struct NotificationPage {
    pub items: Vec<Notification>,
    pub unread_count: i64,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// POST /api/v1/notifications
///
/// Create (and queue) a notification. Returns the persisted entity with the
/// selected channel and computed send time.
pub async fn create_notification(
    State(state): State<AppState>,
    Json(body): Json<CreateNotificationBody>,
) -> AppResult<impl IntoResponse> {
    let created = state
        .engine
        .create_notification(CreateNotification {
            user_id: body.user_id,
            event: body.event,
            metadata: body.metadata,
            channels: body.channels,
            priority: body.priority,
            scheduled_for: body.scheduled_for,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// GET /api/v1/users/{user_id}/notifications
///
/// List a user's notifications, newest first, with optional filtering.
pub async fn list_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Query(params): Query<NotificationQuery>,
) -> AppResult<Json<DataResponse<NotificationPage>>> {
    let query = ListQuery {
        unread_only: params.unread_only.unwrap_or(false),
        event: params.event,
        limit: params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        offset: params.offset.unwrap_or(0).max(0),
    };

    let items = state.engine.get_user_notifications(user_id, &query).await?;
    let unread_count = state.engine.unread_count(user_id).await?;

    Ok(Json(DataResponse {
        data: NotificationPage { items, unread_count },
    }))
}

/// GET /api/v1/users/{user_id}/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<Json<serde_json::Value>> {
    let count = state.engine.unread_count(user_id).await?;

    Ok(Json(serde_json::json!({
        "data": { "count": count }
    })))
}

/// POST /api/v1/notifications/{id}/read
///
/// Mark a single notification as read. Idempotent: repeating the call
/// returns the stored entity unchanged.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Notification>>> {
    let notification = state.engine.mark_as_read(notification_id).await?;
    Ok(Json(DataResponse { data: notification }))
}

/// POST /api/v1/users/{user_id}/notifications/read-all
///
/// Returns the number of notifications that were marked.
pub async fn mark_all_read(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<Json<serde_json::Value>> {
    let count = state.engine.mark_all_as_read(user_id).await?;

    Ok(Json(serde_json::json!({
        "data": { "marked_read": count }
    })))
}

/// POST /api/v1/notifications/{id}/cancel
///
/// Cancel a queued notification. 409 once it has been dispatched.
pub async fn cancel(
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.engine.cancel(notification_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// GET /api/v1/users/{user_id}/preferences
///
/// The stored record, or the documented defaults for first-time users.
pub async fn get_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let prefs = state.engine.get_preferences(user_id).await?;
    Ok(Json(DataResponse { data: prefs }))
}

/// PUT /api/v1/users/{user_id}/preferences
///
/// Partial update: only the provided fields change.
pub async fn update_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Json(update): Json<PreferencesUpdate>,
) -> AppResult<impl IntoResponse> {
    let prefs = state.engine.update_preferences(user_id, update).await?;
    Ok(Json(DataResponse { data: prefs }))
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

/// GET /api/v1/analytics
pub async fn analytics(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(DataResponse {
        data: state.engine.analytics_snapshot(),
    }))
}
