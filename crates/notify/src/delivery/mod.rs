//! Outbound channel adapters.
//!
//! One [`Sender`] per delivery channel; the dispatcher looks them up by
//! [`Channel`] at send time. Adapters make exactly one attempt per call —
//! retry policy lives in the dispatcher, not here.

pub mod email;
pub mod gateway;
pub mod in_app;

use async_trait::async_trait;
use thiserror::Error;

use habita_core::notification::Notification;
use habita_core::preferences::PersonalizationFacts;

pub use email::{EmailConfig, EmailSender};
pub use gateway::{GatewayConfig, HttpGatewaySender};
pub use in_app::InAppSender;

/// How far the message got in one attempt.
///
/// Carrier channels only confirm hand-off (`Sent`); delivery receipts would
/// arrive out of band. The in-app channel lands directly in our own store,
/// so it reports `Delivered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Delivered,
}

#[derive(Debug, Error)]
pub enum SendError {
    /// The user has no usable address/number/token for this channel.
    #[error("No {0} on file for user")]
    MissingContact(&'static str),

    #[error("Invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build email message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway rejected the message with HTTP {0}")]
    GatewayStatus(u16),
}

/// A single-attempt channel adapter.
#[async_trait]
pub trait Sender: Send + Sync {
    /// The channel this adapter serves; used to register it with the engine.
    fn channel(&self) -> habita_core::channel::Channel;

    async fn send(
        &self,
        notification: &Notification,
        facts: &PersonalizationFacts,
    ) -> Result<Delivery, SendError>;
}
