//! HTTP gateway adapter for the carrier channels (SMS, WhatsApp, push).
//!
//! Each carrier is fronted by an external gateway that accepts a JSON POST.
//! One adapter instance serves one channel; the dispatcher owns the retry
//! policy, so a failed request surfaces immediately as a [`SendError`].

use std::time::Duration;

use async_trait::async_trait;

use habita_core::channel::Channel;
use habita_core::notification::Notification;
use habita_core::preferences::PersonalizationFacts;

use super::{Delivery, SendError, Sender};

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for one carrier gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Endpoint URL accepting the delivery POST.
    pub url: String,
    /// Bearer token, when the gateway requires one.
    pub api_key: Option<String>,
}

impl GatewayConfig {
    /// Load a gateway configuration from `{PREFIX}_GATEWAY_URL` and
    /// `{PREFIX}_GATEWAY_KEY`. Returns `None` when the URL is not set.
    pub fn from_env(prefix: &str) -> Option<Self> {
        let url = std::env::var(format!("{prefix}_GATEWAY_URL")).ok()?;
        Some(Self {
            url,
            api_key: std::env::var(format!("{prefix}_GATEWAY_KEY")).ok(),
        })
    }
}

/// Delivers notifications through a carrier HTTP gateway.
pub struct HttpGatewaySender {
    channel: Channel,
    config: GatewayConfig,
    client: reqwest::Client,
}

impl HttpGatewaySender {
    pub fn new(channel: Channel, config: GatewayConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            channel,
            config,
            client,
        }
    }

    /// The contact field this channel addresses messages to.
    fn recipient<'a>(&self, facts: &'a PersonalizationFacts) -> Result<&'a str, SendError> {
        match self.channel {
            Channel::Sms | Channel::Whatsapp => facts
                .phone
                .as_deref()
                .ok_or(SendError::MissingContact("phone number")),
            Channel::Push => facts
                .push_token
                .as_deref()
                .ok_or(SendError::MissingContact("push token")),
            Channel::Email | Channel::InApp => {
                unreachable!("gateway sender is only constructed for carrier channels")
            }
        }
    }
}

#[async_trait]
impl Sender for HttpGatewaySender {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(
        &self,
        notification: &Notification,
        facts: &PersonalizationFacts,
    ) -> Result<Delivery, SendError> {
        let to = self.recipient(facts)?;
        let payload = serde_json::json!({
            "channel": self.channel.as_str(),
            "to": to,
            "title": notification.title,
            "body": notification.body,
            "reference": notification.id,
        });

        let mut request = self.client.post(&self.config.url).json(&payload);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SendError::GatewayStatus(response.status().as_u16()));
        }

        tracing::info!(
            notification_id = notification.id,
            channel = self.channel.as_str(),
            "Notification handed off to gateway"
        );
        Ok(Delivery::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender(channel: Channel) -> HttpGatewaySender {
        HttpGatewaySender::new(
            channel,
            GatewayConfig {
                url: "http://localhost:9/send".to_string(),
                api_key: None,
            },
        )
    }

    #[test]
    fn sms_requires_phone_number() {
        let facts = PersonalizationFacts::default();
        let err = sender(Channel::Sms).recipient(&facts).unwrap_err();
        assert!(err.to_string().contains("phone number"));
    }

    #[test]
    fn push_requires_token() {
        let facts = PersonalizationFacts {
            phone: Some("+56912345678".to_string()),
            ..Default::default()
        };
        let err = sender(Channel::Push).recipient(&facts).unwrap_err();
        assert!(err.to_string().contains("push token"));
    }

    #[test]
    fn whatsapp_uses_phone_number() {
        let facts = PersonalizationFacts {
            phone: Some("+56912345678".to_string()),
            ..Default::default()
        };
        let to = sender(Channel::Whatsapp).recipient(&facts).unwrap();
        assert_eq!(to, "+56912345678");
    }
}
