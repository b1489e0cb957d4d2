//! Pub/sub for pipeline observability.
//!
//! Three fixed topics: [`Topic::Request`], [`Topic::RateLimit`] and
//! [`Topic::Error`]. Listeners run synchronously on the task that emitted the
//! event. A panicking listener is logged and skipped.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::error;

use crate::rate_limit::{RateLimitStatus, duration_ms};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Topic {
    Request,
    RateLimit,
    Error,
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Topic::Request => "request",
            Topic::RateLimit => "rateLimit",
            Topic::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    Request {
        endpoint: String,
        method: String,
        url: String,
        cached: bool,
        status: Option<u16>,
        attempts: u32,
        #[serde(with = "duration_ms")]
        elapsed: Duration,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    RateLimit {
        endpoint: String,
        #[serde(with = "duration_ms")]
        retry_after: Duration,
        status: RateLimitStatus,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        endpoint: String,
        code: String,
        message: String,
        attempts: u32,
        timestamp: DateTime<Utc>,
    },
}

impl ClientEvent {
    pub fn topic(&self) -> Topic {
        match self {
            ClientEvent::Request { .. } => Topic::Request,
            ClientEvent::RateLimit { .. } => Topic::RateLimit,
            ClientEvent::Error { .. } => Topic::Error,
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            ClientEvent::Request { endpoint, .. }
            | ClientEvent::RateLimit { endpoint, .. }
            | ClientEvent::Error { endpoint, .. } => endpoint,
        }
    }
}

type Listener = Arc<dyn Fn(&ClientEvent) + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    listeners: DashMap<Topic, HashMap<u64, Listener>>,
    next_id: AtomicU64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("request", &self.listener_count(Topic::Request))
            .field("rate_limit", &self.listener_count(Topic::RateLimit))
            .field("error", &self.listener_count(Topic::Error))
            .finish()
    }
}

/// Handle returned by [`EventBus::on`].
///
/// Dropping it leaves the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    bus: std::sync::Weak<EventBus>,
    topic: Topic,
    id: u64,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    // true when the listener was still registered
    pub fn unsubscribe(self) -> bool {
        match self.bus.upgrade() {
            Some(bus) => bus.remove(self.topic, self.id),
            None => false,
        }
    }
}

impl EventBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on<F>(self: &Arc<Self>, topic: Topic, callback: F) -> Subscription
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .entry(topic)
            .or_default()
            .insert(id, Arc::new(callback));

        Subscription {
            bus: Arc::downgrade(self),
            topic,
            id,
        }
    }

    pub fn listener_count(&self, topic: Topic) -> usize {
        self.listeners.get(&topic).map(|l| l.len()).unwrap_or(0)
    }

    pub(crate) fn emit(&self, event: &ClientEvent) {
        let topic = event.topic();

        // snapshot so listeners can (un)subscribe while we iterate
        let mut snapshot: Vec<(u64, Listener)> = match self.listeners.get(&topic) {
            Some(listeners) => listeners
                .iter()
                .map(|(id, listener)| (*id, listener.clone()))
                .collect(),
            None => return,
        };
        snapshot.sort_by_key(|(id, _)| *id);

        for (id, listener) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                error!(topic = %topic, listener = id, "event listener panicked");
            }
        }
    }

    fn remove(&self, topic: Topic, id: u64) -> bool {
        self.listeners
            .get_mut(&topic)
            .map(|mut listeners| listeners.remove(&id).is_some())
            .unwrap_or(false)
    }
}
