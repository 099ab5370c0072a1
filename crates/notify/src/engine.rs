//! The application-facing notification API.
//!
//! `NotificationEngine` owns the template catalog, the channel selector, the
//! analytics aggregator, the stores and the channel adapters. Creating a
//! notification resolves the template, picks a channel, renders the content
//! and persists the row; actual delivery happens later in the
//! [`crate::dispatch::Dispatcher`] poll loop.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use habita_core::analytics::{AnalyticsAggregator, AnalyticsSnapshot, DeliveryEvent};
use habita_core::channel::Channel;
use habita_core::event::{EventKind, Priority};
use habita_core::notification::{NewNotification, Notification, DEFAULT_MAX_RETRIES};
use habita_core::personalize;
use habita_core::preferences::{PreferencesUpdate, UserPreferences};
use habita_core::schedule;
use habita_core::selector::ChannelSelector;
use habita_core::template::TemplateRegistry;
use habita_core::types::{DbId, Timestamp};

use crate::delivery::Sender;
use crate::error::NotifyError;
use crate::store::{
    CancelOutcome, ListQuery, MarkReadOutcome, NotificationStore, PreferenceStore,
};

/// Request to create one notification.
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub user_id: DbId,
    pub event: EventKind,
    /// Event payload; supplies the template's declared variables and is
    /// persisted on the notification.
    pub metadata: BTreeMap<String, Value>,
    /// Explicit restriction of the candidate channel set.
    pub channels: Option<Vec<Channel>>,
    /// Overrides the template's default priority.
    pub priority: Option<Priority>,
    /// Explicit send time; bypasses quiet hours and the best-hour heuristic.
    pub scheduled_for: Option<Timestamp>,
}

impl CreateNotification {
    pub fn new(user_id: DbId, event: EventKind) -> Self {
        Self {
            user_id,
            event,
            metadata: BTreeMap::new(),
            channels: None,
            priority: None,
            scheduled_for: None,
        }
    }
}

pub struct NotificationEngine {
    templates: TemplateRegistry,
    selector: ChannelSelector,
    store: Arc<dyn NotificationStore>,
    prefs: Arc<dyn PreferenceStore>,
    senders: HashMap<Channel, Arc<dyn Sender>>,
    analytics: AnalyticsAggregator,
}

impl NotificationEngine {
    /// Engine with the built-in template catalog and score table and no
    /// registered senders.
    pub fn new(store: Arc<dyn NotificationStore>, prefs: Arc<dyn PreferenceStore>) -> Self {
        Self {
            templates: TemplateRegistry::builtin(),
            selector: ChannelSelector::default(),
            store,
            prefs,
            senders: HashMap::new(),
            analytics: AnalyticsAggregator::new(),
        }
    }

    pub fn with_templates(mut self, templates: TemplateRegistry) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_selector(mut self, selector: ChannelSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Register a channel adapter under the channel it reports.
    pub fn with_sender(mut self, sender: Arc<dyn Sender>) -> Self {
        self.senders.insert(sender.channel(), sender);
        self
    }

    pub(crate) fn sender_for(&self, channel: Channel) -> Option<&Arc<dyn Sender>> {
        self.senders.get(&channel)
    }

    pub(crate) fn store(&self) -> &Arc<dyn NotificationStore> {
        &self.store
    }

    pub(crate) fn preference_store(&self) -> &Arc<dyn PreferenceStore> {
        &self.prefs
    }

    pub(crate) fn record(
        &self,
        channel: Channel,
        event: EventKind,
        kind: DeliveryEvent,
        at: Timestamp,
    ) {
        self.analytics.record(channel, event, kind, at);
    }

    // ---- Creation ----

    /// Resolve, select, render, schedule and persist one notification.
    ///
    /// Returns as soon as the row is stored; delivery is picked up by the
    /// dispatcher when the scheduled time arrives.
    pub async fn create_notification(
        &self,
        req: CreateNotification,
    ) -> Result<Notification, NotifyError> {
        let template = self.templates.resolve(req.event)?;

        let prefs = self
            .prefs
            .get(req.user_id)
            .await
            .map_err(NotifyError::PreferencesUnavailable)?
            .unwrap_or_else(|| UserPreferences::default_for(req.user_id));

        let channel = self.selector.select(
            req.event,
            &template.channels,
            &prefs,
            req.channels.as_deref(),
            &self.analytics.open_rates(),
        );

        let rendered = personalize::render(template, &req.metadata);
        if !rendered.missing.is_empty() {
            tracing::warn!(
                user_id = req.user_id,
                event_kind = req.event.as_str(),
                missing = ?rendered.missing,
                "Template variables missing, substituted empty strings"
            );
        }

        let (title, body) = if template.ai_optimized {
            (
                personalize::optimize_title(&rendered.title, prefs.facts.display_name.as_deref()),
                personalize::optimize_body(&rendered.body, prefs.facts.engagement),
            )
        } else {
            (rendered.title, rendered.body)
        };

        let now = Utc::now();
        let scheduled_for =
            schedule::compute_send_time(&prefs.quiet_hours, now, req.scheduled_for);

        let new = NewNotification {
            user_id: req.user_id,
            event: req.event,
            priority: req.priority.unwrap_or(template.priority),
            title,
            body,
            channel,
            scheduled_for,
            metadata: Value::Object(req.metadata.into_iter().collect()),
            max_retries: DEFAULT_MAX_RETRIES,
        };
        let stored = self.store.insert(&new).await?;

        tracing::info!(
            notification_id = stored.id,
            user_id = stored.user_id,
            event_kind = stored.event.as_str(),
            channel = stored.channel.as_str(),
            scheduled_for = %stored.scheduled_for,
            "Notification created"
        );
        Ok(stored)
    }

    // ---- Queries and lifecycle ----

    pub async fn get_notification(&self, id: DbId) -> Result<Notification, NotifyError> {
        self.store
            .get(id)
            .await?
            .ok_or(NotifyError::NotFound { entity: "notification", id })
    }

    pub async fn get_user_notifications(
        &self,
        user_id: DbId,
        query: &ListQuery,
    ) -> Result<Vec<Notification>, NotifyError> {
        Ok(self.store.list_for_user(user_id, query).await?)
    }

    pub async fn unread_count(&self, user_id: DbId) -> Result<i64, NotifyError> {
        Ok(self.store.unread_count(user_id).await?)
    }

    /// Idempotent: marking an already-read notification returns the stored
    /// row unchanged.
    pub async fn mark_as_read(&self, id: DbId) -> Result<Notification, NotifyError> {
        let now = Utc::now();
        match self.store.mark_read(id, now).await? {
            MarkReadOutcome::Updated(n) => {
                self.analytics.record(n.channel, n.event, DeliveryEvent::Read, now);
                Ok(n)
            }
            MarkReadOutcome::AlreadyRead => self.get_notification(id).await,
            MarkReadOutcome::NotFound => {
                Err(NotifyError::NotFound { entity: "notification", id })
            }
        }
    }

    /// Returns how many notifications transitioned to read.
    pub async fn mark_all_as_read(&self, user_id: DbId) -> Result<u64, NotifyError> {
        let now = Utc::now();
        let updated = self.store.mark_all_read(user_id, now).await?;
        for n in &updated {
            self.analytics.record(n.channel, n.event, DeliveryEvent::Read, now);
        }
        Ok(updated.len() as u64)
    }

    /// Cancel a notification that has not been dispatched yet.
    pub async fn cancel(&self, id: DbId) -> Result<(), NotifyError> {
        match self.store.cancel(id).await? {
            CancelOutcome::Cancelled => {
                tracing::info!(notification_id = id, "Notification cancelled");
                Ok(())
            }
            CancelOutcome::AlreadyDispatched => Err(NotifyError::AlreadyDispatched(id)),
            CancelOutcome::NotFound => {
                Err(NotifyError::NotFound { entity: "notification", id })
            }
        }
    }

    // ---- Preferences ----

    /// The stored record, or the documented defaults for first-time users.
    pub async fn get_preferences(&self, user_id: DbId) -> Result<UserPreferences, NotifyError> {
        Ok(self
            .prefs
            .get(user_id)
            .await?
            .unwrap_or_else(|| UserPreferences::default_for(user_id)))
    }

    /// Merge a partial update over the stored (or default) record.
    pub async fn update_preferences(
        &self,
        user_id: DbId,
        update: PreferencesUpdate,
    ) -> Result<UserPreferences, NotifyError> {
        let mut prefs = self.get_preferences(user_id).await?;
        update.apply(&mut prefs);
        self.prefs.upsert(user_id, &prefs).await?;
        Ok(prefs)
    }

    // ---- Analytics ----

    pub fn analytics_snapshot(&self) -> AnalyticsSnapshot {
        self.analytics.snapshot()
    }
}
