//! C1: durable publish/consume on topic exchanges.
//!
//! `InMemoryMessageBus` stands in for the external broker (spec §1 treats
//! the bus implementation as an assumed-reliable collaborator): topic
//! exchange fanout, per-queue FIFO delivery, ack/nack with exponential
//! backoff, and dead-lettering after a retry ceiling all happen here so the
//! rest of the workspace can be driven against it in tests without a real
//! broker.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use cyb_telemetry::TelemetryBus;

use crate::envelope::Envelope;
use crate::error::{BusError, BusResult};
use crate::nonce::ReplayCache;
use crate::topic::matches_any;

/// What a handler decided to do with a delivered message.
#[derive(Debug, Clone)]
pub enum AckOutcome {
    /// Accept the message; it will not be redelivered.
    Ack,
    /// Reject the message; requeue with exponential backoff.
    Nack,
    /// Reject and redeliver after an explicit delay rather than the
    /// computed backoff (used when the handler knows a better retry time,
    /// e.g. a rate-limit response carrying `Retry-After`).
    RetryAfter(Duration),
}

/// A consumer callback. Implementations MUST be idempotent: the bus
/// delivers at-least-once, keyed by the envelope's nonce.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, envelope: Envelope) -> AckOutcome;
}

/// Tuning for a single queue's retry/backoff/dead-letter policy.
#[derive(Debug, Clone, Copy)]
pub struct QueuePolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub channel_capacity: usize,
    pub replay_window: Duration,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(30),
            channel_capacity: 1000,
            replay_window: Duration::from_secs(120),
        }
    }
}

struct Delivery {
    envelope: Envelope,
    attempt: u32,
}

struct QueueHandle {
    bindings: Vec<String>,
    sender: mpsc::Sender<Delivery>,
    worker: JoinHandle<()>,
}

/// Dead-lettered messages, retained for inspection (admin CLI, tests).
#[derive(Default)]
pub struct DeadLetterStore {
    entries: DashMap<String, Vec<Envelope>>,
}

impl DeadLetterStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, queue: &str, envelope: Envelope) {
        self.entries.entry(queue.to_string()).or_default().push(envelope);
    }

    #[must_use]
    pub fn for_queue(&self, queue: &str) -> Vec<Envelope> {
        self.entries.get(queue).map(|v| v.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn total_count(&self) -> usize {
        self.entries.iter().map(|e| e.value().len()).sum()
    }
}

/// In-memory stand-in for a durable topic-routed broker.
pub struct InMemoryMessageBus {
    queues: DashMap<String, QueueHandle>,
    dead_letters: Arc<DeadLetterStore>,
    telemetry: Arc<TelemetryBus>,
    connected: Arc<AtomicBool>,
}

impl InMemoryMessageBus {
    #[must_use]
    pub fn new(telemetry: Arc<TelemetryBus>) -> Self {
        Self {
            queues: DashMap::new(),
            dead_letters: Arc::new(DeadLetterStore::new()),
            telemetry,
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    #[must_use]
    pub fn dead_letters(&self) -> Arc<DeadLetterStore> {
        Arc::clone(&self.dead_letters)
    }

    /// Register `queue` bound to `binding_patterns`, spawning its consumer
    /// task. The task pulls one delivery at a time (per-queue ordering) and
    /// drives `handler` to completion before accepting the next.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::QueueExists`] if `queue` is already registered.
    pub fn subscribe(
        &self,
        queue: impl Into<String>,
        binding_patterns: Vec<String>,
        handler: Arc<dyn Handler>,
        policy: QueuePolicy,
    ) -> BusResult<()> {
        let queue = queue.into();
        if self.queues.contains_key(&queue) {
            return Err(BusError::QueueExists(queue));
        }

        let (tx, rx) = mpsc::channel(policy.channel_capacity);
        let worker = spawn_consumer(
            queue.clone(),
            rx,
            tx.clone(),
            handler,
            policy,
            Arc::clone(&self.dead_letters),
            Arc::clone(&self.telemetry),
        );

        self.queues.insert(
            queue,
            QueueHandle {
                bindings: binding_patterns,
                sender: tx,
                worker,
            },
        );
        Ok(())
    }

    /// Stop a queue's consumer task and forget its bindings.
    pub fn unsubscribe(&self, queue: &str) {
        if let Some((_, handle)) = self.queues.remove(queue) {
            handle.worker.abort();
        }
    }

    /// Publish `envelope` on `routing_key`, fanning out to every bound
    /// queue whose pattern matches. Durable in the sense that the call
    /// does not return `Ok` until every match has been accepted into its
    /// queue; a full queue backpressures the caller with
    /// [`BusError::Backpressure`] rather than silently dropping.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::BrokerUnavailable`] if the broker connection is
    /// down, or [`BusError::Backpressure`] if a matching queue is full.
    pub async fn publish(&self, _exchange: &str, routing_key: &str, envelope: Envelope) -> BusResult<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(BusError::BrokerUnavailable("not connected".to_string()));
        }

        let matched: Vec<_> = self
            .queues
            .iter()
            .filter(|entry| matches_any(&entry.value().bindings, routing_key))
            .map(|entry| (entry.key().clone(), entry.value().sender.clone()))
            .collect();

        for (queue, sender) in matched {
            let delivery = Delivery {
                envelope: envelope.clone(),
                attempt: 0,
            };
            sender
                .try_send(delivery)
                .map_err(|_| BusError::Backpressure(queue))?;
        }
        Ok(())
    }

    /// Simulate a broker-connection drop (for reconnect testing). Queued
    /// consumers keep draining their local channel; only new publishes are
    /// rejected until [`Self::reconnect`].
    pub fn simulate_disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Reestablish the connection. Consumers were never torn down (their
    /// channels are in-process), so "replaying unacked messages" reduces to
    /// letting the consumer loop keep draining what it already had queued.
    pub fn reconnect(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }
}

impl Drop for InMemoryMessageBus {
    fn drop(&mut self) {
        for entry in self.queues.iter() {
            entry.value().worker.abort();
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_consumer(
    queue: String,
    mut rx: mpsc::Receiver<Delivery>,
    self_tx: mpsc::Sender<Delivery>,
    handler: Arc<dyn Handler>,
    policy: QueuePolicy,
    dead_letters: Arc<DeadLetterStore>,
    telemetry: Arc<TelemetryBus>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let replay = std::sync::Mutex::new(ReplayCache::new(policy.replay_window));

        while let Some(delivery) = rx.recv().await {
            let fresh = {
                let mut guard = replay.lock().expect("replay cache mutex poisoned");
                guard.check_and_record(delivery.envelope.tenant_id, delivery.envelope.nonce)
            };
            if !fresh {
                debug!(queue = %queue, nonce = %delivery.envelope.nonce, "dropping replayed message");
                continue;
            }

            let outcome = handler.handle(delivery.envelope.clone()).await;
            match outcome {
                AckOutcome::Ack => {}
                AckOutcome::Nack | AckOutcome::RetryAfter(_) => {
                    if delivery.attempt >= policy.max_retries {
                        warn!(queue = %queue, message_type = %delivery.envelope.message_type, "dead-lettering after max retries");
                        telemetry.publish(
                            &cyb_telemetry::TelemetryEvent::new("cyb.bus.dead_letter", "bus")
                                .with_metadata("queue", queue.clone())
                                .with_metadata("message_type", delivery.envelope.message_type.clone()),
                        );
                        dead_letters.record(&queue, delivery.envelope);
                        continue;
                    }

                    let delay = match outcome {
                        AckOutcome::RetryAfter(d) => d,
                        _ => backoff_delay(delivery.attempt, policy.base_backoff, policy.max_backoff),
                    };
                    let next_attempt = delivery.attempt + 1;
                    let requeue_tx = self_tx.clone();
                    let envelope = delivery.envelope;
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = requeue_tx
                            .send(Delivery {
                                envelope,
                                attempt: next_attempt,
                            })
                            .await;
                    });
                }
            }
        }
    })
}

fn backoff_delay(attempt: u32, base: Duration, ceiling: Duration) -> Duration {
    let exp = base.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX).max(1));
    exp.min(ceiling)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyb_core::TenantId;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::Duration as TokioDuration;

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
        outcome: AckOutcome,
    }

    #[async_trait]
    impl Handler for CountingHandler {
        async fn handle(&self, _envelope: Envelope) -> AckOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    #[tokio::test]
    async fn publish_delivers_to_matching_queue() {
        let bus = InMemoryMessageBus::new(Arc::new(TelemetryBus::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            "s4",
            vec!["vsm.s4.*".to_string()],
            Arc::new(CountingHandler {
                calls: Arc::clone(&calls),
                outcome: AckOutcome::Ack,
            }),
            QueuePolicy::default(),
        )
        .unwrap();

        let env = Envelope::new("vsm.s4.analyze", serde_json::json!({}), TenantId::new());
        bus.publish("cyb", "vsm.s4.analyze", env).await.unwrap();
        tokio::time::sleep(TokioDuration::from_millis(20)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_matching_routing_key_is_not_delivered() {
        let bus = InMemoryMessageBus::new(Arc::new(TelemetryBus::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            "s4",
            vec!["vsm.s4.*".to_string()],
            Arc::new(CountingHandler {
                calls: Arc::clone(&calls),
                outcome: AckOutcome::Ack,
            }),
            QueuePolicy::default(),
        )
        .unwrap();

        let env = Envelope::new("vsm.s1.operation", serde_json::json!({}), TenantId::new());
        bus.publish("cyb", "vsm.s1.operation", env).await.unwrap();
        tokio::time::sleep(TokioDuration::from_millis(20)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn duplicate_nonce_is_delivered_once() {
        let bus = InMemoryMessageBus::new(Arc::new(TelemetryBus::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            "s1",
            vec!["vsm.s1.*".to_string()],
            Arc::new(CountingHandler {
                calls: Arc::clone(&calls),
                outcome: AckOutcome::Ack,
            }),
            QueuePolicy::default(),
        )
        .unwrap();

        let env = Envelope::new("vsm.s1.operation", serde_json::json!({}), TenantId::new());
        bus.publish("cyb", "vsm.s1.operation", env.clone()).await.unwrap();
        bus.publish("cyb", "vsm.s1.operation", env).await.unwrap();
        tokio::time::sleep(TokioDuration::from_millis(20)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn nack_dead_letters_after_max_retries() {
        let bus = InMemoryMessageBus::new(Arc::new(TelemetryBus::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = QueuePolicy {
            max_retries: 1,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            ..QueuePolicy::default()
        };
        bus.subscribe(
            "s1",
            vec!["vsm.s1.*".to_string()],
            Arc::new(CountingHandler {
                calls: Arc::clone(&calls),
                outcome: AckOutcome::Nack,
            }),
            policy,
        )
        .unwrap();

        let env = Envelope::new("vsm.s1.operation", serde_json::json!({}), TenantId::new());
        bus.publish("cyb", "vsm.s1.operation", env).await.unwrap();
        tokio::time::sleep(TokioDuration::from_millis(50)).await;

        assert_eq!(bus.dead_letters().total_count(), 1);
    }

    #[tokio::test]
    async fn publish_while_disconnected_is_rejected() {
        let bus = InMemoryMessageBus::new(Arc::new(TelemetryBus::new()));
        bus.simulate_disconnect();
        let env = Envelope::new("vsm.s1.operation", serde_json::json!({}), TenantId::new());
        let result = bus.publish("cyb", "vsm.s1.operation", env).await;
        assert!(matches!(result, Err(BusError::BrokerUnavailable(_))));
        bus.reconnect();
        assert!(bus.is_connected());
    }

    #[test]
    fn backoff_doubles_and_caps_at_ceiling() {
        let base = Duration::from_millis(1000);
        let ceiling = Duration::from_secs(30);
        assert_eq!(backoff_delay(0, base, ceiling), Duration::from_millis(1000));
        assert_eq!(backoff_delay(1, base, ceiling), Duration::from_millis(2000));
        assert_eq!(backoff_delay(10, base, ceiling), ceiling);
    }
}
