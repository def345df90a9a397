//! The topic hub.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

/// Maps topic names to the channels subscribed to them.
///
/// One hub is shared (behind an `Arc`) by every connection in the server.
/// All methods take `&self`; the registry lives behind a `Mutex` that is
/// only ever held for a few map operations and never across an `.await`,
/// so a plain `std::sync::Mutex` is the right tool here.
///
/// ## Sink identity
///
/// A sink is identified by the channel it feeds, not by the `Sender`
/// value: two clones of the same sender are the same sink
/// ([`mpsc::Sender::same_channel`]). Subscribing the same sink to the same
/// topic twice is a no-op.
///
/// ## Lifecycle
///
/// ```text
/// subscribe("h.abc", &tx) ──→ publish("h.abc", msg) ──→ tx's receiver gets msg
///            │
///            ▼
/// unsubscribe_all(&tx) ──→ hub holds no clone of tx ──→ owner drops tx
/// ```
pub struct PubSub<M> {
    /// Subscribers per topic. Topics with no subscribers are removed.
    topics: Mutex<HashMap<String, Vec<mpsc::Sender<M>>>>,
}

impl<M> PubSub<M>
where
    M: Clone + Send + 'static,
{
    /// Creates an empty hub.
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribes `sink` to `topic`.
    ///
    /// Returns `true` if the sink was newly added, `false` if it was
    /// already subscribed.
    pub fn subscribe(&self, topic: &str, sink: &mpsc::Sender<M>) -> bool {
        let mut topics = self.topics();
        let sinks = topics.entry(topic.to_string()).or_default();

        if sinks.iter().any(|s| s.same_channel(sink)) {
            return false;
        }
        sinks.push(sink.clone());
        tracing::debug!(topic, subscribers = sinks.len(), "subscribed");
        true
    }

    /// Removes `sink` from `topic`. Returns `true` if it was subscribed.
    pub fn unsubscribe(&self, topic: &str, sink: &mpsc::Sender<M>) -> bool {
        let mut topics = self.topics();
        let Some(sinks) = topics.get_mut(topic) else {
            return false;
        };

        let before = sinks.len();
        sinks.retain(|s| !s.same_channel(sink));
        let removed = sinks.len() != before;
        if sinks.is_empty() {
            topics.remove(topic);
        }
        removed
    }

    /// Removes `sink` from every topic it is subscribed to.
    ///
    /// Returns the number of topics it was removed from. Calling this for a
    /// sink that was never subscribed is fine and returns `0`.
    pub fn unsubscribe_all(&self, sink: &mpsc::Sender<M>) -> usize {
        let mut topics = self.topics();
        let mut removed = 0;

        topics.retain(|_, sinks| {
            let before = sinks.len();
            sinks.retain(|s| !s.same_channel(sink));
            removed += before - sinks.len();
            !sinks.is_empty()
        });

        if removed > 0 {
            tracing::debug!(topics = removed, "unsubscribed from all");
        }
        removed
    }

    /// Delivers `message` to every sink subscribed to `topic`.
    ///
    /// Sends wait for channel capacity, so a slow subscriber slows the
    /// publisher down instead of growing an unbounded buffer. Sinks whose
    /// receiver has been dropped are pruned.
    ///
    /// Returns the number of sinks the message was delivered to.
    pub async fn publish(&self, topic: &str, message: M) -> usize {
        // Snapshot the subscriber list; the lock must not be held while
        // awaiting channel capacity.
        let sinks = {
            let topics = self.topics();
            topics.get(topic).cloned().unwrap_or_default()
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for sink in sinks {
            if sink.send(message.clone()).await.is_ok() {
                delivered += 1;
            } else {
                dead.push(sink);
            }
        }

        if !dead.is_empty() {
            tracing::debug!(topic, dead = dead.len(), "pruning closed sinks");
            for sink in &dead {
                self.unsubscribe(topic, sink);
            }
        }

        delivered
    }

    /// Returns `true` if `sink` is subscribed to `topic`.
    pub fn is_subscribed(&self, topic: &str, sink: &mpsc::Sender<M>) -> bool {
        self.topics()
            .get(topic)
            .is_some_and(|sinks| sinks.iter().any(|s| s.same_channel(sink)))
    }

    /// Returns the number of sinks subscribed to `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics().get(topic).map_or(0, Vec::len)
    }

    /// Returns the number of topics with at least one subscriber.
    pub fn topic_count(&self) -> usize {
        self.topics().len()
    }

    /// Locks the registry.
    ///
    /// A panic while holding this lock can only leave a half-edited
    /// subscriber list, which is still a valid list, so poisoning is
    /// ignored.
    fn topics(&self) -> MutexGuard<'_, HashMap<String, Vec<mpsc::Sender<M>>>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<M> Default for PubSub<M>
where
    M: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
