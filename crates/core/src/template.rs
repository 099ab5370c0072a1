//! Static template catalog mapping event kinds to message templates.
//!
//! Templates are loaded once at process start and never mutated. Variables
//! use `{{name}}` placeholders; the declared `variables` list is what the
//! personalizer substitutes (and warns about when missing).

use std::collections::HashMap;

use crate::channel::Channel;
use crate::event::{EventKind, Priority};

/// An immutable message template.
#[derive(Debug, Clone)]
pub struct NotificationTemplate {
    pub event: EventKind,
    pub title: String,
    pub body: String,
    pub variables: Vec<String>,
    pub channels: Vec<Channel>,
    pub priority: Priority,
    pub ai_optimized: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// An event producer referenced an event kind with no template. This is
    /// a programming error on the producer side, never a retryable
    /// condition.
    #[error("No template registered for event kind: {0}")]
    NotFound(EventKind),
}

/// Read-only catalog of templates, keyed by event kind.
#[derive(Debug)]
pub struct TemplateRegistry {
    by_event: HashMap<EventKind, NotificationTemplate>,
}

impl TemplateRegistry {
    /// Build a registry from an explicit template list. Later entries for
    /// the same event kind replace earlier ones.
    pub fn new(templates: Vec<NotificationTemplate>) -> Self {
        let by_event = templates.into_iter().map(|t| (t.event, t)).collect();
        Self { by_event }
    }

    /// The built-in Spanish catalog used in production.
    pub fn builtin() -> Self {
        Self::new(builtin_templates())
    }

    pub fn resolve(&self, event: EventKind) -> Result<&NotificationTemplate, TemplateError> {
        self.by_event.get(&event).ok_or(TemplateError::NotFound(event))
    }

    pub fn len(&self) -> usize {
        self.by_event.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_event.is_empty()
    }
}

/// One helper to keep the catalog below readable.
fn template(
    event: EventKind,
    title: &str,
    body: &str,
    variables: &[&str],
    channels: &[Channel],
    priority: Priority,
) -> NotificationTemplate {
    NotificationTemplate {
        event,
        title: title.to_string(),
        body: body.to_string(),
        variables: variables.iter().map(|v| v.to_string()).collect(),
        channels: channels.to_vec(),
        priority,
        ai_optimized: true,
    }
}

fn builtin_templates() -> Vec<NotificationTemplate> {
    use Channel::{Email, InApp, Push, Sms};

    vec![
        template(
            EventKind::PaymentDue,
            "Pago de renta próximo a vencer",
            "Hola {{name}}, tu pago de renta de {{amount}} vence el {{due_date}}. \
             ¡No olvides realizar el pago a tiempo!",
            &["name", "amount", "due_date"],
            &[Email, Sms, Push, InApp],
            Priority::High,
        ),
        template(
            EventKind::PaymentReceived,
            "Pago recibido exitosamente",
            "¡Gracias {{name}}! Hemos recibido tu pago de {{amount}}. \
             Tu recibo está disponible en tu cuenta.",
            &["name", "amount"],
            &[Email, Push, InApp],
            Priority::Medium,
        ),
        template(
            EventKind::MaintenanceRequest,
            "Nueva solicitud de mantenimiento",
            "Hemos recibido tu solicitud de mantenimiento para {{property}}. \
             Te mantendremos informado del progreso.",
            &["property"],
            &[Email, Push, InApp],
            Priority::Medium,
        ),
        template(
            EventKind::MaintenanceCompleted,
            "Mantenimiento completado",
            "¡Excelente noticia {{name}}! El mantenimiento en {{property}} ha sido \
             completado. Puedes verificar el trabajo realizado.",
            &["name", "property"],
            &[Email, Sms, Push, InApp],
            Priority::Medium,
        ),
        template(
            EventKind::ContractExpiring,
            "Contrato próximo a vencer",
            "Tu contrato en {{property}} vence el {{due_date}}. \
             ¿Te gustaría renovar o necesitas ayuda?",
            &["property", "due_date"],
            &[Email, Sms, Push, InApp],
            Priority::High,
        ),
        template(
            EventKind::PropertyViewed,
            "Tu propiedad fue vista",
            "¡{{name}}! Tu propiedad en {{location}} recibió {{views}} esta semana. \
             ¡Excelente interés!",
            &["name", "location", "views"],
            &[Email, Push, InApp],
            Priority::Low,
        ),
        template(
            EventKind::MarketUpdate,
            "Actualización del mercado",
            "El mercado en {{area}} muestra {{trend}}. Te recomendamos {{recommendation}}.",
            &["area", "trend", "recommendation"],
            &[Email, Push, InApp],
            Priority::Low,
        ),
        template(
            EventKind::Recommendation,
            "Recomendación personalizada",
            "{{name}}, hemos encontrado {{count}} que coinciden con tus preferencias \
             en {{area}}.",
            &["name", "count", "area"],
            &[Email, Push, InApp],
            Priority::Medium,
        ),
    ]
}
