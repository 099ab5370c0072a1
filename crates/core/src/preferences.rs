//! Per-user notification preferences.
//!
//! Preferences are read on every notification creation; the persistence
//! layer stores the whole record as one JSONB payload, so every field here
//! must keep a stable serde shape.

use std::collections::BTreeMap;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::event::EventKind;
use crate::types::DbId;

/// Default quiet-hours window: 22:00 – 08:00 local time.
const DEFAULT_QUIET_START: (u32, u32) = (22, 0);
const DEFAULT_QUIET_END: (u32, u32) = (8, 0);

/// Default timezone for new users (the platform operates in Chile).
pub const DEFAULT_TIMEZONE: &str = "America/Santiago";

/// Default locale for rendered content.
pub const DEFAULT_LOCALE: &str = "es";

// ---------------------------------------------------------------------------
// Channel toggles
// ---------------------------------------------------------------------------

/// Per-channel opt-in flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelToggles {
    pub email: bool,
    pub sms: bool,
    pub push: bool,
    pub whatsapp: bool,
    pub in_app: bool,
}

impl ChannelToggles {
    pub fn is_enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::Email => self.email,
            Channel::Sms => self.sms,
            Channel::Push => self.push,
            Channel::Whatsapp => self.whatsapp,
            Channel::InApp => self.in_app,
        }
    }

    /// Enabled channels in [`Channel::ALL`] order.
    pub fn enabled(&self) -> Vec<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|c| self.is_enabled(*c))
            .collect()
    }
}

impl Default for ChannelToggles {
    /// Everything on except the paid carrier channels (SMS, WhatsApp).
    fn default() -> Self {
        Self {
            email: true,
            sms: false,
            push: true,
            whatsapp: false,
            in_app: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Quiet hours
// ---------------------------------------------------------------------------

/// A daily window during which non-urgent sends are deferred.
///
/// `start` and `end` are local times in `timezone`; windows that wrap past
/// midnight (e.g. 22:00 – 08:00) are supported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    pub enabled: bool,
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// IANA timezone name, e.g. `America/Santiago`. Unknown names fall back
    /// to UTC at evaluation time.
    pub timezone: String,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: true,
            start: NaiveTime::from_hms_opt(DEFAULT_QUIET_START.0, DEFAULT_QUIET_START.1, 0)
                .expect("valid default quiet start"),
            end: NaiveTime::from_hms_opt(DEFAULT_QUIET_END.0, DEFAULT_QUIET_END.1, 0)
                .expect("valid default quiet end"),
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Personalization facts
// ---------------------------------------------------------------------------

/// Rough engagement tier used by the content personalizer to shape message
/// length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementTier {
    Low,
    #[default]
    Medium,
    High,
}

/// Facts about the user consumed by templates and channel adapters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalizationFacts {
    pub display_name: Option<String>,
    pub preferred_channel: Option<Channel>,
    pub engagement: EngagementTier,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub push_token: Option<String>,
}

// ---------------------------------------------------------------------------
// UserPreferences
// ---------------------------------------------------------------------------

/// Delivery cadence. Only `Immediate` affects scheduling today; the other
/// values are stored for future digest batching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Immediate,
    Hourly,
    Daily,
    Weekly,
}

/// The full per-user preference record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: DbId,
    pub channels: ChannelToggles,
    /// Per-event restriction of the candidate channel set. Absent kinds use
    /// the template's allowed channels unchanged.
    #[serde(default)]
    pub event_channels: BTreeMap<EventKind, Vec<Channel>>,
    pub quiet_hours: QuietHours,
    pub frequency: Frequency,
    pub locale: String,
    pub facts: PersonalizationFacts,
}

impl UserPreferences {
    /// The documented default record used when a user has never stored
    /// preferences: all channels except SMS/WhatsApp, quiet hours
    /// 22:00–08:00 local, locale `es`.
    pub fn default_for(user_id: DbId) -> Self {
        Self {
            user_id,
            channels: ChannelToggles::default(),
            event_channels: BTreeMap::new(),
            quiet_hours: QuietHours::default(),
            frequency: Frequency::default(),
            locale: DEFAULT_LOCALE.to_string(),
            facts: PersonalizationFacts::default(),
        }
    }

    /// Candidate channels for an event after applying any per-event override.
    pub fn candidates_for(&self, event: EventKind) -> Option<&[Channel]> {
        self.event_channels.get(&event).map(|v| v.as_slice())
    }
}

/// Partial update applied over the stored (or default) record; `None` fields
/// are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferencesUpdate {
    pub channels: Option<ChannelToggles>,
    pub event_channels: Option<BTreeMap<EventKind, Vec<Channel>>>,
    pub quiet_hours: Option<QuietHours>,
    pub frequency: Option<Frequency>,
    pub locale: Option<String>,
    pub facts: Option<PersonalizationFacts>,
}

impl PreferencesUpdate {
    pub fn apply(self, prefs: &mut UserPreferences) {
        if let Some(channels) = self.channels {
            prefs.channels = channels;
        }
        if let Some(event_channels) = self.event_channels {
            prefs.event_channels = event_channels;
        }
        if let Some(quiet_hours) = self.quiet_hours {
            prefs.quiet_hours = quiet_hours;
        }
        if let Some(frequency) = self.frequency {
            prefs.frequency = frequency;
        }
        if let Some(locale) = self.locale {
            prefs.locale = locale;
        }
        if let Some(facts) = self.facts {
            prefs.facts = facts;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_toggles_exclude_paid_channels() {
        let toggles = ChannelToggles::default();
        assert!(toggles.email && toggles.push && toggles.in_app);
        assert!(!toggles.sms && !toggles.whatsapp);
    }

    #[test]
    fn default_quiet_hours_are_ten_to_eight() {
        let quiet = QuietHours::default();
        assert!(quiet.enabled);
        assert_eq!(quiet.start, NaiveTime::from_hms_opt(22, 0, 0).unwrap());
        assert_eq!(quiet.end, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(quiet.timezone, "America/Santiago");
    }

    #[test]
    fn update_only_touches_some_fields() {
        let mut prefs = UserPreferences::default_for(7);
        let update = PreferencesUpdate {
            locale: Some("en".to_string()),
            ..Default::default()
        };
        update.apply(&mut prefs);
        assert_eq!(prefs.locale, "en");
        assert_eq!(prefs.channels, ChannelToggles::default());
        assert_eq!(prefs.quiet_hours, QuietHours::default());
    }

    #[test]
    fn preferences_round_trip_through_json() {
        let mut prefs = UserPreferences::default_for(42);
        prefs
            .event_channels
            .insert(EventKind::PaymentDue, vec![Channel::Sms, Channel::Push]);
        prefs.facts.display_name = Some("Carolina".to_string());

        let json = serde_json::to_value(&prefs).unwrap();
        let back: UserPreferences = serde_json::from_value(json).unwrap();
        assert_eq!(back, prefs);
    }
}
