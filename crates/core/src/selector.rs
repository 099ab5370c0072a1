//! Channel scoring and selection.
//!
//! For each candidate channel the selector computes
//!
//! ```text
//! score = 100 * historical_open_rate
//!       + event bonus (data-driven table)
//!       + 10 if the channel is the user's declared preferred channel
//! ```
//!
//! and picks the argmax. Ties break toward the earlier channel in
//! [`Channel::ALL`], so selection is fully deterministic for identical
//! inputs.

use std::collections::HashMap;

use crate::channel::Channel;
use crate::event::EventKind;
use crate::preferences::UserPreferences;

/// Weight applied to a channel's historical open rate (a 0..=1 ratio).
const OPEN_RATE_WEIGHT: f64 = 100.0;

/// Bonus for the user's declared preferred channel.
const PREFERRED_CHANNEL_BONUS: f64 = 10.0;

// ---------------------------------------------------------------------------
// Open rates
// ---------------------------------------------------------------------------

/// Historical open rate per channel, fed in from the analytics aggregator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OpenRates([f64; Channel::COUNT]);

impl OpenRates {
    pub fn new(rates: [f64; Channel::COUNT]) -> Self {
        Self(rates)
    }

    pub fn get(&self, channel: Channel) -> f64 {
        self.0[channel.index()]
    }

    pub fn set(&mut self, channel: Channel, rate: f64) {
        self.0[channel.index()] = rate;
    }
}

// ---------------------------------------------------------------------------
// Score table
// ---------------------------------------------------------------------------

/// Event-specific channel bonuses. This is configuration data, not logic:
/// tests and deployments can supply their own table.
#[derive(Debug, Clone, Default)]
pub struct ScoreTable {
    bonuses: HashMap<(EventKind, Channel), f64>,
}

impl ScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bonus(mut self, event: EventKind, channel: Channel, bonus: f64) -> Self {
        self.bonuses.insert((event, channel), bonus);
        self
    }

    pub fn bonus(&self, event: EventKind, channel: Channel) -> f64 {
        self.bonuses.get(&(event, channel)).copied().unwrap_or(0.0)
    }

    /// The production table. Time-critical events favor the immediate
    /// carrier channels; informational events favor email.
    pub fn builtin() -> Self {
        use Channel::{Email, InApp, Push, Sms, Whatsapp};

        let mut table = Self::new();
        // Time-critical: payment deadlines and expiring contracts.
        for event in [EventKind::PaymentDue, EventKind::ContractExpiring] {
            table = table
                .with_bonus(event, Sms, 20.0)
                .with_bonus(event, Whatsapp, 20.0)
                .with_bonus(event, Push, 15.0);
        }
        // Confirmations: receipts and completed work read well over email.
        for event in [EventKind::PaymentReceived, EventKind::MaintenanceCompleted] {
            table = table
                .with_bonus(event, Email, 25.0)
                .with_bonus(event, Push, 20.0);
        }
        // Informational: email dominates.
        for event in [EventKind::PropertyViewed, EventKind::MarketUpdate] {
            table = table
                .with_bonus(event, Email, 30.0)
                .with_bonus(event, Push, 15.0);
        }
        table
            .with_bonus(EventKind::Recommendation, Email, 25.0)
            .with_bonus(EventKind::Recommendation, InApp, 20.0)
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// Picks the best delivery channel for a notification.
#[derive(Debug)]
pub struct ChannelSelector {
    table: ScoreTable,
}

impl ChannelSelector {
    pub fn new(table: ScoreTable) -> Self {
        Self { table }
    }

    /// Select a channel for `event`.
    ///
    /// The candidate set is the intersection of the user's enabled channels,
    /// the template's allowed channels, the user's per-event override (if
    /// any), and the caller's explicit `candidates` restriction (if any).
    /// When the intersection is empty the always-available in-app channel is
    /// returned.
    pub fn select(
        &self,
        event: EventKind,
        allowed: &[Channel],
        prefs: &UserPreferences,
        candidates: Option<&[Channel]>,
        open_rates: &OpenRates,
    ) -> Channel {
        let event_override = prefs.candidates_for(event);

        // Channel::ALL order makes the iteration (and tie-breaks) stable.
        let enabled: Vec<Channel> = Channel::ALL
            .into_iter()
            .filter(|c| prefs.channels.is_enabled(*c))
            .filter(|c| allowed.contains(c))
            .filter(|c| event_override.is_none_or(|o| o.contains(c)))
            .filter(|c| candidates.is_none_or(|cs| cs.contains(c)))
            .collect();

        let Some(&first) = enabled.first() else {
            return Channel::InApp;
        };

        let mut best = first;
        let mut best_score = self.score(event, first, prefs, open_rates);
        for &channel in &enabled[1..] {
            let score = self.score(event, channel, prefs, open_rates);
            if score > best_score {
                best = channel;
                best_score = score;
            }
        }
        best
    }

    fn score(
        &self,
        event: EventKind,
        channel: Channel,
        prefs: &UserPreferences,
        open_rates: &OpenRates,
    ) -> f64 {
        let mut score = OPEN_RATE_WEIGHT * open_rates.get(channel);
        score += self.table.bonus(event, channel);
        if prefs.facts.preferred_channel == Some(channel) {
            score += PREFERRED_CHANNEL_BONUS;
        }
        score
    }
}

impl Default for ChannelSelector {
    fn default() -> Self {
        Self::new(ScoreTable::builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::ChannelToggles;

    fn prefs_with(toggles: ChannelToggles) -> UserPreferences {
        let mut prefs = UserPreferences::default_for(1);
        prefs.channels = toggles;
        prefs
    }

    fn all_channels() -> Vec<Channel> {
        Channel::ALL.to_vec()
    }

    #[test]
    fn payment_due_favors_sms_over_email() {
        // Scenario: email + SMS enabled, no history. The time-critical
        // bonus puts SMS ahead.
        let prefs = prefs_with(ChannelToggles {
            email: true,
            sms: true,
            push: false,
            whatsapp: false,
            in_app: false,
        });
        let selector = ChannelSelector::default();
        let chosen = selector.select(
            EventKind::PaymentDue,
            &all_channels(),
            &prefs,
            None,
            &OpenRates::default(),
        );
        assert_eq!(chosen, Channel::Sms);
    }

    #[test]
    fn property_viewed_favors_email() {
        let prefs = prefs_with(ChannelToggles {
            email: true,
            sms: false,
            push: true,
            whatsapp: false,
            in_app: false,
        });
        let selector = ChannelSelector::default();
        let chosen = selector.select(
            EventKind::PropertyViewed,
            &all_channels(),
            &prefs,
            None,
            &OpenRates::default(),
        );
        assert_eq!(chosen, Channel::Email);
    }

    #[test]
    fn empty_intersection_falls_back_to_in_app() {
        let prefs = prefs_with(ChannelToggles {
            email: false,
            sms: false,
            push: false,
            whatsapp: false,
            in_app: false,
        });
        let selector = ChannelSelector::default();
        let chosen = selector.select(
            EventKind::PaymentDue,
            &all_channels(),
            &prefs,
            None,
            &OpenRates::default(),
        );
        assert_eq!(chosen, Channel::InApp);
    }

    #[test]
    fn explicit_candidates_restrict_the_set() {
        let prefs = prefs_with(ChannelToggles {
            email: true,
            sms: true,
            push: true,
            whatsapp: false,
            in_app: true,
        });
        let selector = ChannelSelector::default();
        let chosen = selector.select(
            EventKind::PaymentDue,
            &all_channels(),
            &prefs,
            Some(&[Channel::Email, Channel::InApp]),
            &OpenRates::default(),
        );
        // SMS would win but is not a candidate.
        assert_ne!(chosen, Channel::Sms);
        assert_eq!(chosen, Channel::Email);
    }

    #[test]
    fn preferred_channel_breaks_near_ties() {
        // With equal bonuses the +10 preferred-channel bonus decides.
        let mut prefs = prefs_with(ChannelToggles {
            email: true,
            sms: false,
            push: true,
            whatsapp: false,
            in_app: false,
        });
        prefs.facts.preferred_channel = Some(Channel::Push);

        let table = ScoreTable::new()
            .with_bonus(EventKind::NewMessage, Channel::Email, 15.0)
            .with_bonus(EventKind::NewMessage, Channel::Push, 15.0);
        let selector = ChannelSelector::new(table);
        let chosen = selector.select(
            EventKind::NewMessage,
            &all_channels(),
            &prefs,
            None,
            &OpenRates::default(),
        );
        assert_eq!(chosen, Channel::Push);
    }

    #[test]
    fn open_rate_history_outweighs_small_bonuses() {
        let prefs = prefs_with(ChannelToggles {
            email: true,
            sms: false,
            push: true,
            whatsapp: false,
            in_app: false,
        });
        let mut rates = OpenRates::default();
        // 40% open rate on push = +40, beating email's +30 bonus.
        rates.set(Channel::Push, 0.4);
        rates.set(Channel::Email, 0.05);

        let selector = ChannelSelector::default();
        let chosen = selector.select(
            EventKind::MarketUpdate,
            &all_channels(),
            &prefs,
            None,
            &rates,
        );
        assert_eq!(chosen, Channel::Push);
    }

    #[test]
    fn selection_is_deterministic() {
        let prefs = prefs_with(ChannelToggles {
            email: true,
            sms: true,
            push: true,
            whatsapp: true,
            in_app: true,
        });
        let selector = ChannelSelector::default();
        let first = selector.select(
            EventKind::ContractExpiring,
            &all_channels(),
            &prefs,
            None,
            &OpenRates::default(),
        );
        for _ in 0..100 {
            let again = selector.select(
                EventKind::ContractExpiring,
                &all_channels(),
                &prefs,
                None,
                &OpenRates::default(),
            );
            assert_eq!(again, first);
        }
    }

    #[test]
    fn ties_break_toward_earlier_channel_order() {
        // No bonuses, no history, no preference: everything scores zero,
        // so the first enabled channel in Channel::ALL order must win.
        let prefs = prefs_with(ChannelToggles {
            email: false,
            sms: true,
            push: true,
            whatsapp: false,
            in_app: true,
        });
        let selector = ChannelSelector::new(ScoreTable::new());
        let chosen = selector.select(
            EventKind::Reminder,
            &all_channels(),
            &prefs,
            None,
            &OpenRates::default(),
        );
        assert_eq!(chosen, Channel::Sms);
    }

    #[test]
    fn per_event_override_restricts_candidates() {
        let mut prefs = prefs_with(ChannelToggles {
            email: true,
            sms: true,
            push: true,
            whatsapp: false,
            in_app: true,
        });
        prefs
            .event_channels
            .insert(EventKind::PaymentDue, vec![Channel::Email]);

        let selector = ChannelSelector::default();
        let chosen = selector.select(
            EventKind::PaymentDue,
            &all_channels(),
            &prefs,
            None,
            &OpenRates::default(),
        );
        assert_eq!(chosen, Channel::Email);
    }
}
