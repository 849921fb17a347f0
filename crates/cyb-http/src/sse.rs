//! `GET /v1/events` (spec §4.14): a Server-Sent-Events feed bridging the
//! telemetry bus (C4) to external subscribers, with a 15s heartbeat and a
//! 60s stall disconnect.
//!
//! Each subscriber gets its own bounded channel. `publish` uses `try_send`
//! so one slow reader backpressures only itself; the first failed send
//! starts a `stalled_since` clock, and the hub drops the subscriber once
//! that clock has run 60s, ending its SSE stream. A background ticker
//! pushes a heartbeat event into every channel every 15s, which both keeps
//! intermediaries from closing the connection and doubles as the signal
//! that un-stalls a subscriber that only looked dead.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cyb_telemetry::TelemetryEvent;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

/// How long a subscriber may fail to keep up before it is disconnected.
pub const STALL_TIMEOUT: Duration = Duration::from_secs(60);
/// How often the hub pushes a heartbeat to every subscriber.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
/// Per-subscriber channel capacity before a send is considered a stall.
const CHANNEL_CAPACITY: usize = 64;

/// One message delivered down the SSE stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SseMessage {
    /// A telemetry emission, flattened to its wire-relevant fields.
    Event {
        name: String,
        source: String,
        metadata: std::collections::HashMap<String, String>,
        measurements: std::collections::HashMap<String, f64>,
    },
    /// The periodic keep-alive.
    Heartbeat,
}

impl From<&TelemetryEvent> for SseMessage {
    fn from(e: &TelemetryEvent) -> Self {
        Self::Event {
            name: e.event_name.clone(),
            source: e.source.clone(),
            metadata: e.metadata.clone(),
            measurements: e.measurements.clone(),
        }
    }
}

struct Subscriber {
    sender: mpsc::Sender<SseMessage>,
    stalled_since: Mutex<Option<Instant>>,
}

/// Fans telemetry events (and heartbeats) out to every connected SSE
/// subscriber.
pub struct SseHub {
    subscribers: DashMap<Uuid, Subscriber>,
}

impl SseHub {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
        }
    }

    /// Register a new subscriber, returning its id (used to unsubscribe on
    /// stream drop) and the receiving half of its channel.
    #[must_use]
    pub fn subscribe(&self) -> (Uuid, mpsc::Receiver<SseMessage>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.subscribers.insert(
            id,
            Subscriber {
                sender: tx,
                stalled_since: Mutex::new(None),
            },
        );
        (id, rx)
    }

    /// Drop a subscriber explicitly (the handler calls this when its
    /// stream future is dropped).
    pub fn unsubscribe(&self, id: Uuid) {
        self.subscribers.remove(&id);
    }

    /// Deliver `message` to every subscriber, dropping any that has been
    /// stalled for longer than [`STALL_TIMEOUT`].
    pub fn broadcast(&self, message: SseMessage) {
        let now = Instant::now();
        let mut to_drop = Vec::new();

        for entry in self.subscribers.iter() {
            let id = *entry.key();
            let subscriber = entry.value();
            match subscriber.sender.try_send(message.clone()) {
                Ok(()) => {
                    *subscriber.stalled_since.lock() = None;
                }
                Err(_) => {
                    let mut stalled = subscriber.stalled_since.lock();
                    let since = *stalled.get_or_insert(now);
                    if now.duration_since(since) >= STALL_TIMEOUT {
                        to_drop.push(id);
                    }
                }
            }
        }

        for id in to_drop {
            self.subscribers.remove(&id);
        }
    }

    /// Current subscriber count, for the `/metrics`/`/health` endpoints.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Spawn the 15s heartbeat ticker. The returned handle is aborted when
    /// the daemon shuts down.
    pub fn spawn_heartbeat(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let hub = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
            loop {
                interval.tick().await;
                hub.broadcast(SseMessage::Heartbeat);
            }
        })
    }

    /// Register a telemetry listener that re-broadcasts every event onto
    /// this hub's subscribers.
    pub fn bridge_telemetry(self: &Arc<Self>, telemetry: &cyb_telemetry::TelemetryBus) {
        let hub = Arc::clone(self);
        telemetry.register("sse-hub", "", move |event| {
            hub.broadcast(SseMessage::from(event));
        });
    }
}

impl Default for SseHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_broadcast_message() {
        let hub = SseHub::new();
        let (_id, mut rx) = hub.subscribe();
        hub.broadcast(SseMessage::Heartbeat);
        let msg = rx.recv().await.unwrap();
        assert!(matches!(msg, SseMessage::Heartbeat));
    }

    #[tokio::test]
    async fn unsubscribe_drops_the_subscriber() {
        let hub = SseHub::new();
        let (id, _rx) = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);
        hub.unsubscribe(id);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn stalled_subscriber_is_dropped_after_timeout() {
        let hub = SseHub::new();
        let (id, rx) = hub.subscribe();
        // Fill the channel without draining it so every future send fails.
        for _ in 0..CHANNEL_CAPACITY {
            hub.broadcast(SseMessage::Heartbeat);
        }
        {
            let entry = hub.subscribers.get(&id).unwrap();
            *entry.stalled_since.lock() = Some(Instant::now() - STALL_TIMEOUT - Duration::from_secs(1));
        }
        hub.broadcast(SseMessage::Heartbeat);
        assert_eq!(hub.subscriber_count(), 0);
        drop(rx);
    }
}
