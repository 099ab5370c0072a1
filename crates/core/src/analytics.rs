//! Delivery and engagement metrics.
//!
//! The aggregator is purely additive and lock-free: fixed arrays of atomic
//! counters indexed by channel, event kind, and hour of day, updated on
//! every status transition. It is never a source of truth — everything here
//! is recomputable from the notification history.
//!
//! Timezone policy: the hourly histogram is keyed by the UTC hour of
//! `sent_at`, for every user, so buckets stay comparable across users.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::channel::Channel;
use crate::event::EventKind;
use crate::selector::OpenRates;
use crate::types::Timestamp;

/// A lifecycle transition worth counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryEvent {
    Sent,
    Delivered,
    Read,
    Failed,
}

const EVENT_SLOTS: usize = 4;

impl DeliveryEvent {
    fn index(self) -> usize {
        match self {
            DeliveryEvent::Sent => 0,
            DeliveryEvent::Delivered => 1,
            DeliveryEvent::Read => 2,
            DeliveryEvent::Failed => 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Counters([AtomicU64; EVENT_SLOTS]);

impl Counters {
    fn new() -> Self {
        Self(std::array::from_fn(|_| AtomicU64::new(0)))
    }

    fn bump(&self, event: DeliveryEvent) {
        self.0[event.index()].fetch_add(1, Ordering::Relaxed);
    }

    fn get(&self, event: DeliveryEvent) -> u64 {
        self.0[event.index()].load(Ordering::Relaxed)
    }
}

/// Accumulates counts and rates by channel, event kind, and hour.
#[derive(Debug)]
pub struct AnalyticsAggregator {
    totals: Counters,
    by_channel: [Counters; Channel::COUNT],
    by_event: [Counters; EventKind::COUNT],
    hourly: [AtomicU64; 24],
}

impl AnalyticsAggregator {
    pub fn new() -> Self {
        Self {
            totals: Counters::new(),
            by_channel: std::array::from_fn(|_| Counters::new()),
            by_event: std::array::from_fn(|_| Counters::new()),
            hourly: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    /// Record one lifecycle transition. `at` feeds the hourly histogram and
    /// is only consulted for `Sent` events.
    pub fn record(&self, channel: Channel, event: EventKind, kind: DeliveryEvent, at: Timestamp) {
        self.totals.bump(kind);
        self.by_channel[channel.index()].bump(kind);
        self.by_event[event.index()].bump(kind);

        if kind == DeliveryEvent::Sent {
            use chrono::Timelike;
            let hour = at.hour() as usize;
            self.hourly[hour].fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Historical open rate per channel, for the channel selector.
    pub fn open_rates(&self) -> OpenRates {
        let mut rates = OpenRates::default();
        for channel in Channel::ALL {
            let counters = &self.by_channel[channel.index()];
            rates.set(
                channel,
                open_rate(
                    counters.get(DeliveryEvent::Read),
                    counters.get(DeliveryEvent::Sent),
                ),
            );
        }
        rates
    }

    /// Point-in-time copy of every counter with derived rates.
    pub fn snapshot(&self) -> AnalyticsSnapshot {
        let channels = Channel::ALL
            .into_iter()
            .map(|c| (c, BucketSnapshot::from(&self.by_channel[c.index()])))
            .collect();
        let events = EventKind::ALL
            .into_iter()
            .map(|e| (e, BucketSnapshot::from(&self.by_event[e.index()])))
            .collect();
        let hourly = std::array::from_fn(|h| self.hourly[h].load(Ordering::Relaxed));

        AnalyticsSnapshot {
            sent: self.totals.get(DeliveryEvent::Sent),
            delivered: self.totals.get(DeliveryEvent::Delivered),
            read: self.totals.get(DeliveryEvent::Read),
            failed: self.totals.get(DeliveryEvent::Failed),
            open_rate: open_rate(
                self.totals.get(DeliveryEvent::Read),
                self.totals.get(DeliveryEvent::Sent),
            ),
            channels,
            events,
            hourly,
        }
    }
}

impl Default for AnalyticsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// `read / sent`, guarded so `sent == 0` yields 0 rather than dividing by
/// zero.
fn open_rate(read: u64, sent: u64) -> f64 {
    if sent == 0 {
        0.0
    } else {
        read as f64 / sent as f64
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Counters for one channel or event-kind bucket.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BucketSnapshot {
    pub sent: u64,
    pub delivered: u64,
    pub read: u64,
    pub failed: u64,
    pub open_rate: f64,
}

impl From<&Counters> for BucketSnapshot {
    fn from(counters: &Counters) -> Self {
        let sent = counters.get(DeliveryEvent::Sent);
        let read = counters.get(DeliveryEvent::Read);
        Self {
            sent,
            delivered: counters.get(DeliveryEvent::Delivered),
            read,
            failed: counters.get(DeliveryEvent::Failed),
            open_rate: open_rate(read, sent),
        }
    }
}

/// Serializable aggregate served by the analytics endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSnapshot {
    pub sent: u64,
    pub delivered: u64,
    pub read: u64,
    pub failed: u64,
    pub open_rate: f64,
    pub channels: BTreeMap<Channel, BucketSnapshot>,
    pub events: BTreeMap<EventKind, BucketSnapshot>,
    /// Sends per UTC hour of day.
    pub hourly: [u64; 24],
}
