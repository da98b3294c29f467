//! Topic registry: subscriber fan-out for received frames.
//!
//! Maps a topic name to an ordered list of subscriber callbacks. Dispatch
//! is deterministic (registration order), exact-match only, and
//! best-effort fault-isolated: one misbehaving callback never starves its
//! siblings.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};
use vesta_core::SubscriberId;

/// Callback invoked with the decoded payload of a frame on a topic.
///
/// Callbacks run on the connection task, so they must stay non-blocking;
/// hand sustained work off to another task.
pub type TopicCallback = Arc<dyn Fn(&Value) + Send + Sync>;

struct SubscriberEntry {
    id: SubscriberId,
    callback: TopicCallback,
}

/// Ordered mapping from topic name to subscriber callbacks.
#[derive(Default)]
pub struct TopicRegistry {
    topics: HashMap<String, Vec<SubscriberEntry>>,
}

impl TopicRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` under `(topic, id)`.
    ///
    /// Re-subscribing with the same id replaces the prior callback in
    /// place, keeping its original position in the dispatch order.
    pub fn subscribe(&mut self, topic: &str, id: SubscriberId, callback: TopicCallback) {
        debug!(topic, subscriber = %id, "subscribe");
        let entries = self.topics.entry(topic.to_owned()).or_default();
        if let Some(entry) = entries.iter_mut().find(|e| e.id == id) {
            entry.callback = callback;
        } else {
            entries.push(SubscriberEntry { id, callback });
        }
    }

    /// Remove the callback registered under `(topic, id)`; no-op when
    /// absent.
    pub fn unsubscribe(&mut self, topic: &str, id: &SubscriberId) {
        debug!(topic, subscriber = %id, "unsubscribe");
        if let Some(entries) = self.topics.get_mut(topic) {
            entries.retain(|e| &e.id != id);
            if entries.is_empty() {
                let _ = self.topics.remove(topic);
            }
        }
    }

    /// Clone the callbacks currently registered for `topic`, in dispatch
    /// order.
    ///
    /// The connection task snapshots before invoking so callbacks run
    /// outside the registry lock.
    #[must_use]
    pub fn snapshot(&self, topic: &str) -> Vec<(SubscriberId, TopicCallback)> {
        self.topics
            .get(topic)
            .map(|entries| {
                entries
                    .iter()
                    .map(|e| (e.id.clone(), Arc::clone(&e.callback)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Invoke every callback registered for `topic` with `payload`.
    ///
    /// Unknown topics are silently ignored.
    pub fn dispatch(&self, topic: &str, payload: &Value) {
        invoke_all(topic, &self.snapshot(topic), payload);
    }

    /// Number of subscribers currently registered for `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, Vec::len)
    }
}

/// Invoke a snapshot of callbacks, isolating per-callback panics so the
/// remaining subscribers still receive the payload.
pub(crate) fn invoke_all(
    topic: &str,
    entries: &[(SubscriberId, TopicCallback)],
    payload: &Value,
) {
    for (id, callback) in entries {
        if catch_unwind(AssertUnwindSafe(|| callback(payload))).is_err() {
            warn!(topic, subscriber = %id, "subscriber callback panicked, continuing fan-out");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
