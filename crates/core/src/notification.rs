//! The notification entity and its lifecycle state machine.
//!
//! Status transitions are forward-only:
//!
//! ```text
//! pending -> scheduled -> sent -> {delivered, failed}
//! sent / delivered -> read
//! failed -> scheduled        (retry manager, while retry_count < max_retries)
//! any state with sent_at unset -> cancelled
//! ```
//!
//! `failed`, `read`, and `cancelled` are terminal once retries are exhausted
//! or the notification has been consumed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::channel::Channel;
use crate::error::UnknownVariant;
use crate::event::{EventKind, Priority};
use crate::types::{DbId, Timestamp};

/// Default number of delivery attempts after the first failure.
pub const DEFAULT_MAX_RETRIES: i32 = 3;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle state of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Scheduled,
    Sent,
    Delivered,
    Read,
    Failed,
    Cancelled,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Scheduled => "scheduled",
            Status::Sent => "sent",
            Status::Delivered => "delivered",
            Status::Read => "read",
            Status::Failed => "failed",
            Status::Cancelled => "cancelled",
        }
    }

    /// Valid target states reachable from this state.
    ///
    /// `Failed -> Scheduled` is only legal while retries remain; that guard
    /// lives in the retry manager, not here.
    pub fn valid_transitions(self) -> &'static [Status] {
        match self {
            Status::Pending => &[Status::Scheduled, Status::Cancelled],
            Status::Scheduled => &[Status::Sent, Status::Failed, Status::Cancelled],
            Status::Sent => &[Status::Delivered, Status::Read],
            Status::Delivered => &[Status::Read],
            Status::Failed => &[Status::Scheduled],
            Status::Read | Status::Cancelled => &[],
        }
    }

    pub fn can_transition(self, to: Status) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// States in which the notification still counts toward the unread badge.
    pub fn is_unread(self) -> bool {
        !matches!(self, Status::Read | Status::Cancelled)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Status::Pending),
            "scheduled" => Ok(Status::Scheduled),
            "sent" => Ok(Status::Sent),
            "delivered" => Ok(Status::Delivered),
            "read" => Ok(Status::Read),
            "failed" => Ok(Status::Failed),
            "cancelled" => Ok(Status::Cancelled),
            other => Err(UnknownVariant::new("status", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// A persisted notification. Owned exclusively by the dispatch engine and
/// never deleted (append-only history, so analytics stay recomputable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: DbId,
    pub user_id: DbId,
    pub event: EventKind,
    pub priority: Priority,
    pub title: String,
    pub body: String,
    pub channel: Channel,
    pub scheduled_for: Timestamp,
    pub metadata: Value,
    pub status: Status,
    pub created_at: Timestamp,
    pub sent_at: Option<Timestamp>,
    pub read_at: Option<Timestamp>,
    pub retry_count: i32,
    pub max_retries: i32,
}

/// Insert payload for a new notification. The store assigns `id`,
/// `created_at`, and the initial `scheduled` status.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: DbId,
    pub event: EventKind,
    pub priority: Priority,
    pub title: String,
    pub body: String,
    pub channel: Channel,
    pub scheduled_for: Timestamp,
    pub metadata: Value,
    pub max_retries: i32,
}
