//! In-app channel.
//!
//! The notification row itself is the delivery medium: once stored it shows
//! up in the user's inbox, so a send attempt reports `Delivered` without any
//! outbound call. This is also why the in-app channel can never fail and
//! serves as the selector's fallback.

use async_trait::async_trait;

use habita_core::notification::Notification;
use habita_core::preferences::PersonalizationFacts;

use super::{Delivery, SendError, Sender};

pub struct InAppSender;

#[async_trait]
impl Sender for InAppSender {
    fn channel(&self) -> habita_core::channel::Channel {
        habita_core::channel::Channel::InApp
    }

    async fn send(
        &self,
        notification: &Notification,
        _facts: &PersonalizationFacts,
    ) -> Result<Delivery, SendError> {
        tracing::debug!(
            notification_id = notification.id,
            "In-app notification available in inbox"
        );
        Ok(Delivery::Delivered)
    }
}
