pub mod health;
pub mod notification;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// POST /notifications                              create
/// POST /notifications/{id}/read                    mark read (idempotent)
/// POST /notifications/{id}/cancel                  cancel (409 once sent)
///
/// GET  /users/{user_id}/notifications              list + unread count
/// GET  /users/{user_id}/notifications/unread-count
/// POST /users/{user_id}/notifications/read-all
/// GET  /users/{user_id}/preferences
/// PUT  /users/{user_id}/preferences                partial update
///
/// GET  /analytics                                  aggregator snapshot
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(notification::router())
}
