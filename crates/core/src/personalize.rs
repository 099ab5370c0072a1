//! Template rendering and content shaping.
//!
//! Rendering substitutes every variable a template declares. Missing values
//! substitute the empty string and are reported back to the caller (the
//! engine logs them as warnings); a missing variable never blocks dispatch.
//!
//! The "optimization" pass is a deterministic rule table, not a model call:
//! a display-name prefix, category iconography keyed off title keywords,
//! and engagement-tier message shaping. All of it is pure and independently
//! testable.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde_json::Value;

use crate::preferences::EngagementTier;
use crate::template::NotificationTemplate;
use crate::types::Timestamp;

/// Output of a render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub title: String,
    pub body: String,
    /// Declared variables that had no supplied value and were replaced by
    /// the empty string.
    pub missing: Vec<String>,
}

/// Substitute all declared template variables from `values`.
pub fn render(template: &NotificationTemplate, values: &BTreeMap<String, Value>) -> Rendered {
    let mut title = template.title.clone();
    let mut body = template.body.clone();
    let mut missing = Vec::new();

    for variable in &template.variables {
        let placeholder = format!("{{{{{variable}}}}}");
        let replacement = match values.get(variable) {
            Some(value) => format_variable(variable, value),
            None => {
                missing.push(variable.clone());
                String::new()
            }
        };
        title = title.replace(&placeholder, &replacement);
        body = body.replace(&placeholder, &replacement);
    }

    Rendered { title, body, missing }
}

// ---------------------------------------------------------------------------
// Variable formatting (es-CL)
// ---------------------------------------------------------------------------

/// Format a variable according to its conventional meaning: amounts as CLP
/// currency, dates long-form in Spanish, counters pluralized. Everything
/// else renders as-is.
fn format_variable(variable: &str, value: &Value) -> String {
    match variable {
        "amount" => match value.as_f64() {
            Some(amount) => format_clp(amount),
            None => value_to_string(value),
        },
        "due_date" => match parse_timestamp(value) {
            Some(ts) => format_date_es(ts),
            None => value_to_string(value),
        },
        "views" => pluralize(value, "visita", "visitas"),
        "count" => pluralize(value, "propiedad", "propiedades"),
        _ => value_to_string(value),
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_timestamp(value: &Value) -> Option<Timestamp> {
    value.as_str().and_then(|s| s.parse().ok())
}

fn pluralize(value: &Value, singular: &str, plural: &str) -> String {
    let n = value.as_i64().unwrap_or(0);
    let noun = if n == 1 { singular } else { plural };
    format!("{n} {noun}")
}

/// Chilean peso formatting: no decimals, dot thousands separators.
pub fn format_clp(amount: f64) -> String {
    let whole = amount.round() as i64;
    let negative = whole < 0;
    let digits = whole.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    if negative {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

const MONTHS_ES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Long-form Spanish date, e.g. `5 de marzo de 2026`.
pub fn format_date_es(ts: Timestamp) -> String {
    let month = MONTHS_ES[ts.month0() as usize];
    format!("{} de {} de {}", ts.day(), month, ts.year())
}

// ---------------------------------------------------------------------------
// Rule-based content optimization
// ---------------------------------------------------------------------------

/// Keyword-to-emoji category table for title iconography.
const TITLE_ICONS: [(&str, &str); 4] = [
    ("pago", "💰"),
    ("mantenimiento", "🔧"),
    ("contrato", "📄"),
    ("propiedad", "🏠"),
];

/// Prefix the title with the user's name and a category icon.
pub fn optimize_title(title: &str, display_name: Option<&str>) -> String {
    let mut out = match display_name {
        Some(name) if !name.is_empty() => format!("{name}, {title}"),
        _ => title.to_string(),
    };

    let lowered = out.to_lowercase();
    if let Some((_, icon)) = TITLE_ICONS.iter().find(|(kw, _)| lowered.contains(kw)) {
        out = format!("{icon} {out}");
    }
    out
}

/// Shape the body to the user's engagement tier: highly engaged users get a
/// gratitude suffix, low-engagement users only the first sentence.
pub fn optimize_body(body: &str, engagement: EngagementTier) -> String {
    match engagement {
        EngagementTier::High => format!("{body} ¡Gracias por tu confianza!"),
        EngagementTier::Low => match body.split_once('.') {
            Some((first, _)) => format!("{first}."),
            None => body.to_string(),
        },
        EngagementTier::Medium => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::event::{EventKind, Priority};
    use chrono::TimeZone;
    use serde_json::json;

    fn test_template(title: &str, body: &str, variables: &[&str]) -> NotificationTemplate {
        NotificationTemplate {
            event: EventKind::PaymentDue,
            title: title.to_string(),
            body: body.to_string(),
            variables: variables.iter().map(|v| v.to_string()).collect(),
            channels: vec![Channel::InApp],
            priority: Priority::Medium,
            ai_optimized: true,
        }
    }

    #[test]
    fn substitutes_declared_variables_in_title_and_body() {
        let template = test_template("Hola {{name}}", "{{name}}, tienes {{count}}.", &["name", "count"]);
        let mut values = BTreeMap::new();
        values.insert("name".to_string(), json!("Matías"));
        values.insert("count".to_string(), json!(3));

        let rendered = render(&template, &values);
        assert_eq!(rendered.title, "Hola Matías");
        assert_eq!(rendered.body, "Matías, tienes 3 propiedades.");
        assert!(rendered.missing.is_empty());
    }

    #[test]
    fn missing_variable_substitutes_empty_and_is_reported() {
        let template = test_template("Hola {{name}}", "Vence: {{due_date}}", &["name", "due_date"]);
        let values = BTreeMap::new();

        let rendered = render(&template, &values);
        assert_eq!(rendered.title, "Hola ");
        assert_eq!(rendered.body, "Vence: ");
        assert_eq!(rendered.missing, vec!["name", "due_date"]);
    }

    #[test]
    fn amount_formats_as_clp() {
        let template = test_template("t", "Pago de {{amount}}", &["amount"]);
        let mut values = BTreeMap::new();
        values.insert("amount".to_string(), json!(450000));

        let rendered = render(&template, &values);
        assert_eq!(rendered.body, "Pago de $450.000");
    }

    #[test]
    fn clp_grouping() {
        assert_eq!(format_clp(0.0), "$0");
        assert_eq!(format_clp(999.0), "$999");
        assert_eq!(format_clp(1000.0), "$1.000");
        assert_eq!(format_clp(1234567.0), "$1.234.567");
        assert_eq!(format_clp(-35000.0), "-$35.000");
    }

    #[test]
    fn due_date_formats_in_spanish() {
        let ts = chrono::Utc.with_ymd_and_hms(2026, 3, 5, 12, 0, 0).unwrap();
        assert_eq!(format_date_es(ts), "5 de marzo de 2026");

        let template = test_template("t", "Vence el {{due_date}}", &["due_date"]);
        let mut values = BTreeMap::new();
        values.insert("due_date".to_string(), json!(ts.to_rfc3339()));
        let rendered = render(&template, &values);
        assert_eq!(rendered.body, "Vence el 5 de marzo de 2026");
    }

    #[test]
    fn views_pluralization() {
        let template = test_template("t", "Recibió {{views}}", &["views"]);
        let mut one = BTreeMap::new();
        one.insert("views".to_string(), json!(1));
        assert_eq!(render(&template, &one).body, "Recibió 1 visita");

        let mut many = BTreeMap::new();
        many.insert("views".to_string(), json!(12));
        assert_eq!(render(&template, &many).body, "Recibió 12 visitas");
    }

    #[test]
    fn title_gains_name_prefix_and_icon() {
        let out = optimize_title("Pago de renta próximo a vencer", Some("Carolina"));
        assert_eq!(out, "💰 Carolina, Pago de renta próximo a vencer");
    }

    #[test]
    fn title_without_name_keeps_icon_only() {
        let out = optimize_title("Mantenimiento completado", None);
        assert_eq!(out, "🔧 Mantenimiento completado");
    }

    #[test]
    fn title_without_keyword_gets_no_icon() {
        let out = optimize_title("Actualización del mercado", None);
        assert_eq!(out, "Actualización del mercado");
    }

    #[test]
    fn high_engagement_appends_gratitude() {
        let out = optimize_body("Tu pago fue recibido.", EngagementTier::High);
        assert_eq!(out, "Tu pago fue recibido. ¡Gracias por tu confianza!");
    }

    #[test]
    fn low_engagement_truncates_to_first_sentence() {
        let out = optimize_body(
            "Tu pago fue recibido. Tu recibo está disponible en tu cuenta.",
            EngagementTier::Low,
        );
        assert_eq!(out, "Tu pago fue recibido.");
    }

    #[test]
    fn medium_engagement_leaves_body_unchanged() {
        let body = "Tu pago fue recibido. Gracias.";
        assert_eq!(optimize_body(body, EngagementTier::Medium), body);
    }
}
