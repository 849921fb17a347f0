//! Synchronous telemetry bus (C4).
//!
//! Emission is synchronous and in-process: `publish` calls every matching
//! listener inline, on the caller's thread. Listeners therefore must not
//! block; one that runs slow enough to trip [`SLOW_LISTENER_THRESHOLD`]
//! repeatedly is detached automatically rather than allowed to stall every
//! future publisher.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tracing::{trace, warn};

use crate::event::TelemetryEvent;

/// A listener call slower than this is considered a protection-worthy
/// slowdown.
pub const SLOW_LISTENER_THRESHOLD: Duration = Duration::from_millis(50);

/// Number of consecutive slow calls before a listener is detached.
pub const MAX_SLOW_STRIKES: u32 = 3;

type ListenerFn = dyn Fn(&TelemetryEvent) + Send + Sync;

struct ListenerEntry {
    id: String,
    prefix: String,
    callback: Arc<ListenerFn>,
    slow_strikes: AtomicU32,
}

/// Synchronous in-process event bus. Listeners register against an
/// event-name prefix (e.g. `"cyb.s4."` matches `cyb.s4.fallback`).
pub struct TelemetryBus {
    listeners: parking_lot::RwLock<Vec<ListenerEntry>>,
}

impl TelemetryBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: parking_lot::RwLock::new(Vec::new()),
        }
    }

    /// Register a listener with a stable `id` against `prefix`. Registering
    /// the same `id` again replaces the previous registration.
    pub fn register(
        &self,
        id: impl Into<String>,
        prefix: impl Into<String>,
        callback: impl Fn(&TelemetryEvent) + Send + Sync + 'static,
    ) {
        let id = id.into();
        let mut listeners = self.listeners.write();
        listeners.retain(|entry| entry.id != id);
        listeners.push(ListenerEntry {
            id,
            prefix: prefix.into(),
            callback: Arc::new(callback),
            slow_strikes: AtomicU32::new(0),
        });
    }

    /// Remove a listener by id. Idempotent.
    pub fn detach(&self, id: &str) {
        self.listeners.write().retain(|entry| entry.id != id);
    }

    /// Emit `event` to every listener whose prefix matches
    /// `event.event_name`.
    pub fn publish(&self, event: &TelemetryEvent) {
        let matching: Vec<(String, Arc<ListenerFn>)> = {
            let listeners = self.listeners.read();
            listeners
                .iter()
                .filter(|entry| event.event_name.starts_with(&entry.prefix))
                .map(|entry| (entry.id.clone(), Arc::clone(&entry.callback)))
                .collect()
        };

        if matching.is_empty() {
            trace!(event_name = %event.event_name, "no telemetry listeners");
            return;
        }

        for (id, callback) in matching {
            let start = Instant::now();
            callback(event);
            let elapsed = start.elapsed();
            if elapsed > SLOW_LISTENER_THRESHOLD {
                self.record_slow_call(&id, elapsed);
            } else {
                self.reset_strikes(&id);
            }
        }
    }

    fn record_slow_call(&self, id: &str, elapsed: Duration) {
        let mut detach_id = None;
        {
            let listeners = self.listeners.read();
            if let Some(entry) = listeners.iter().find(|entry| entry.id == id) {
                let strikes = entry.slow_strikes.fetch_add(1, Ordering::SeqCst) + 1;
                warn!(
                    listener_id = %entry.id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    strikes,
                    "slow telemetry listener"
                );
                if strikes >= MAX_SLOW_STRIKES {
                    detach_id = Some(entry.id.clone());
                }
            }
        }
        if let Some(id) = detach_id {
            warn!(listener_id = %id, "detaching slow telemetry listener");
            self.detach(&id);
        }
    }

    fn reset_strikes(&self, id: &str) {
        let listeners = self.listeners.read();
        if let Some(entry) = listeners.iter().find(|entry| entry.id == id) {
            entry.slow_strikes.store(0, Ordering::SeqCst);
        }
    }

    /// Current number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl Default for TelemetryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn listener_receives_matching_events() {
        let bus = TelemetryBus::new();
        let received = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&received);
        bus.register("counter", "cyb.s4.", move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(&TelemetryEvent::new("cyb.s4.fallback", "router"));
        bus.publish(&TelemetryEvent::new("cyb.s2.coordinate", "vsm"));

        assert_eq!(received.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn detach_removes_listener() {
        let bus = TelemetryBus::new();
        bus.register("a", "cyb.", |_| {});
        assert_eq!(bus.listener_count(), 1);
        bus.detach("a");
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn re_registering_same_id_replaces_listener() {
        let bus = TelemetryBus::new();
        bus.register("a", "cyb.", |_| {});
        bus.register("a", "cyb.", |_| {});
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn slow_listener_is_detached_after_max_strikes() {
        let bus = TelemetryBus::new();
        bus.register("slow", "cyb.", |_event| {
            std::thread::sleep(SLOW_LISTENER_THRESHOLD + Duration::from_millis(5));
        });

        for _ in 0..MAX_SLOW_STRIKES {
            bus.publish(&TelemetryEvent::new("cyb.slow", "test"));
        }

        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn strikes_are_attributed_per_listener_not_the_whole_prefix_group() {
        let bus = TelemetryBus::new();
        let fast_calls = Arc::new(AtomicUsize::new(0));
        let fast_counter = Arc::clone(&fast_calls);
        bus.register("fast", "cyb.", move |_event| {
            fast_counter.fetch_add(1, Ordering::SeqCst);
        });
        bus.register("slow", "cyb.", |_event| {
            std::thread::sleep(SLOW_LISTENER_THRESHOLD + Duration::from_millis(5));
        });

        for _ in 0..MAX_SLOW_STRIKES {
            bus.publish(&TelemetryEvent::new("cyb.mixed", "test"));
        }

        assert_eq!(bus.listener_count(), 1, "only the slow listener should be detached");
        assert_eq!(fast_calls.load(Ordering::SeqCst), MAX_SLOW_STRIKES as usize);
    }
}
