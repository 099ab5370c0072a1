use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use habita_notify::NotifyError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`NotifyError`] for engine errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// An engine-level error from `habita_notify`.
    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Notify(err) => match err {
                NotifyError::TemplateNotFound(event) => (
                    StatusCode::NOT_FOUND,
                    "TEMPLATE_NOT_FOUND",
                    format!("No template registered for event kind: {event}"),
                ),
                NotifyError::PreferencesUnavailable(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "PREFERENCES_UNAVAILABLE",
                    "Notification preferences are temporarily unavailable".to_string(),
                ),
                NotifyError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                NotifyError::AlreadyDispatched(id) => (
                    StatusCode::CONFLICT,
                    "ALREADY_DISPATCHED",
                    format!("Notification {id} has already been dispatched"),
                ),
                NotifyError::Store(e) => {
                    tracing::error!(error = %e, "Store error in handler");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use habita_core::event::EventKind;

    #[test]
    fn template_not_found_maps_to_404() {
        let response =
            AppError::Notify(NotifyError::TemplateNotFound(EventKind::Reminder)).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn already_dispatched_maps_to_409() {
        let response = AppError::Notify(NotifyError::AlreadyDispatched(3)).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
