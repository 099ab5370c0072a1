//! Event kinds and notification priorities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownVariant;

/// A logical event in the rental domain that can trigger a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PaymentDue,
    PaymentReceived,
    MaintenanceRequest,
    MaintenanceCompleted,
    ContractExpiring,
    ContractRenewed,
    PropertyViewed,
    NewMessage,
    SystemAlert,
    MarketUpdate,
    Recommendation,
    Reminder,
}

impl EventKind {
    pub const ALL: [EventKind; 12] = [
        EventKind::PaymentDue,
        EventKind::PaymentReceived,
        EventKind::MaintenanceRequest,
        EventKind::MaintenanceCompleted,
        EventKind::ContractExpiring,
        EventKind::ContractRenewed,
        EventKind::PropertyViewed,
        EventKind::NewMessage,
        EventKind::SystemAlert,
        EventKind::MarketUpdate,
        EventKind::Recommendation,
        EventKind::Reminder,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Stable wire/storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::PaymentDue => "payment_due",
            EventKind::PaymentReceived => "payment_received",
            EventKind::MaintenanceRequest => "maintenance_request",
            EventKind::MaintenanceCompleted => "maintenance_completed",
            EventKind::ContractExpiring => "contract_expiring",
            EventKind::ContractRenewed => "contract_renewed",
            EventKind::PropertyViewed => "property_viewed",
            EventKind::NewMessage => "new_message",
            EventKind::SystemAlert => "system_alert",
            EventKind::MarketUpdate => "market_update",
            EventKind::Recommendation => "recommendation",
            EventKind::Reminder => "reminder",
        }
    }

    /// Dense index into per-event counter arrays.
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|k| *k == self).unwrap_or(0)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("event kind", s))
    }
}

/// How urgently a notification should reach the user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(UnknownVariant::new("priority", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kinds_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_event_kind_is_rejected() {
        let err = "lease_signed".parse::<EventKind>().unwrap_err();
        assert_eq!(err.value, "lease_signed");
    }

    #[test]
    fn priority_ordering_follows_urgency() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert!(Priority::High < Priority::Urgent);
    }

    #[test]
    fn event_indexes_are_dense() {
        for (i, kind) in EventKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }
}
