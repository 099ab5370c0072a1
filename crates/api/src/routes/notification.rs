//! Route definitions for notifications, preferences and analytics.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::notification;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        // Notification lifecycle
        .route("/notifications", post(notification::create_notification))
        .route("/notifications/{id}/read", post(notification::mark_read))
        .route("/notifications/{id}/cancel", post(notification::cancel))
        // Per-user views
        .route(
            "/users/{user_id}/notifications",
            get(notification::list_notifications),
        )
        .route(
            "/users/{user_id}/notifications/unread-count",
            get(notification::unread_count),
        )
        .route(
            "/users/{user_id}/notifications/read-all",
            post(notification::mark_all_read),
        )
        // Preferences
        .route(
            "/users/{user_id}/preferences",
            get(notification::get_preferences).put(notification::update_preferences),
        )
        // Analytics
        .route("/analytics", get(notification::analytics))
}
