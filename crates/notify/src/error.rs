//! Engine error taxonomy.

use thiserror::Error;

use habita_core::event::EventKind;
use habita_core::template::TemplateError;
use habita_core::types::DbId;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum NotifyError {
    /// No template exists for the event kind. Producer-side programming
    /// error; never retried.
    #[error("No template registered for event kind: {0}")]
    TemplateNotFound(EventKind),

    /// The preference store could not be read while creating a
    /// notification. Transient; the caller may retry.
    #[error("Notification preferences are unavailable: {0}")]
    PreferencesUnavailable(#[source] StoreError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// Cancellation arrived after the notification left the system.
    #[error("Notification {0} has already been dispatched")]
    AlreadyDispatched(DbId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<TemplateError> for NotifyError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::NotFound(event) => Self::TemplateNotFound(event),
        }
    }
}
