//! Shared harness for engine and dispatcher tests: an engine wired to the
//! in-memory stores plus a scriptable channel adapter.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use habita_core::channel::Channel;
use habita_core::notification::Notification;
use habita_core::preferences::PersonalizationFacts;
use habita_notify::delivery::{Delivery, SendError, Sender};
use habita_notify::memory::{MemoryPreferenceStore, MemoryStore};
use habita_notify::NotificationEngine;

/// Outcome of one scripted send attempt.
#[derive(Debug, Clone, Copy)]
pub enum Attempt {
    Succeed(Delivery),
    Fail,
}

/// Adapter whose attempts follow a script; once the script runs out every
/// further attempt succeeds with `Sent`.
pub struct ScriptedSender {
    channel: Channel,
    script: Mutex<VecDeque<Attempt>>,
    calls: AtomicUsize,
}

impl ScriptedSender {
    pub fn new(channel: Channel, script: Vec<Attempt>) -> Arc<Self> {
        Arc::new(Self {
            channel,
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Adapter that fails every attempt (an empty script falls through to
    /// `Sent`, so seed more failures than any retry sequence can consume).
    pub fn always_failing(channel: Channel) -> Arc<Self> {
        Self::new(channel, vec![Attempt::Fail; 32])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sender for ScriptedSender {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(
        &self,
        _notification: &Notification,
        _facts: &PersonalizationFacts,
    ) -> Result<Delivery, SendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let attempt = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Attempt::Succeed(Delivery::Sent));
        match attempt {
            Attempt::Succeed(delivery) => Ok(delivery),
            Attempt::Fail => Err(SendError::GatewayStatus(503)),
        }
    }
}

/// Engine over fresh in-memory stores with the given adapters registered.
pub fn memory_engine(senders: Vec<Arc<dyn Sender>>) -> Arc<NotificationEngine> {
    let store = Arc::new(MemoryStore::new());
    let prefs = Arc::new(MemoryPreferenceStore::new());
    let mut engine = NotificationEngine::new(store, prefs);
    for sender in senders {
        engine = engine.with_sender(sender);
    }
    Arc::new(engine)
}
