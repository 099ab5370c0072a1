//! Delivery channels.
//!
//! The string forms must match the values stored in the
//! `notifications.channel` column and accepted by the API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownVariant;

/// A delivery medium for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
    Push,
    Whatsapp,
    InApp,
}

impl Channel {
    /// Every channel, in the deterministic order used for score tie-breaks:
    /// when two channels score equally, the first enabled one in this order
    /// wins.
    pub const ALL: [Channel; 5] = [
        Channel::Email,
        Channel::Sms,
        Channel::Push,
        Channel::Whatsapp,
        Channel::InApp,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Stable wire/storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::Push => "push",
            Channel::Whatsapp => "whatsapp",
            Channel::InApp => "in_app",
        }
    }

    /// Dense index into per-channel counter arrays.
    pub fn index(self) -> usize {
        match self {
            Channel::Email => 0,
            Channel::Sms => 1,
            Channel::Push => 2,
            Channel::Whatsapp => 3,
            Channel::InApp => 4,
        }
    }

    /// Channels that incur per-message carrier cost. Disabled by default.
    pub fn is_paid(self) -> bool {
        matches!(self, Channel::Sms | Channel::Whatsapp)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Channel::Email),
            "sms" => Ok(Channel::Sms),
            "push" => Ok(Channel::Push),
            "whatsapp" => Ok(Channel::Whatsapp),
            "in_app" => Ok(Channel::InApp),
            other => Err(UnknownVariant::new("channel", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for channel in Channel::ALL {
            assert_eq!(channel.as_str().parse::<Channel>().unwrap(), channel);
        }
    }

    #[test]
    fn indexes_are_dense_and_unique() {
        let mut seen = [false; Channel::COUNT];
        for channel in Channel::ALL {
            assert!(!seen[channel.index()]);
            seen[channel.index()] = true;
        }
    }

    #[test]
    fn unknown_channel_is_rejected() {
        assert!("carrier_pigeon".parse::<Channel>().is_err());
    }

    #[test]
    fn paid_channels() {
        assert!(Channel::Sms.is_paid());
        assert!(Channel::Whatsapp.is_paid());
        assert!(!Channel::Email.is_paid());
        assert!(!Channel::InApp.is_paid());
    }
}
