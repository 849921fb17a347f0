//! S3's global control state machine (spec §4.11, Open Question #1):
//! `normal → warning → critical → intervening`, driven by algedonic pain
//! severity against configurable thresholds, with a hysteresis window
//! that decays the state one level toward `normal` once it elapses
//! without a further signal at or above the current level's threshold.

use std::time::Duration;

use cyb_core::Timestamp;
use cyb_telemetry::{TelemetryBus, TelemetryEvent};
use std::sync::Arc;

/// The four states S3 can occupy. Ordered so `>=` comparisons read as
/// "at least this severe".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GlobalState {
    Normal,
    Warning,
    Critical,
    Intervening,
}

impl GlobalState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Intervening => "intervening",
        }
    }

    fn decayed(self) -> Self {
        match self {
            Self::Intervening => Self::Intervening,
            Self::Critical => Self::Warning,
            Self::Warning => Self::Normal,
            Self::Normal => Self::Normal,
        }
    }
}

/// Tuning for the state machine.
#[derive(Debug, Clone, Copy)]
pub struct S3Config {
    pub warning_threshold: f64,
    pub critical_threshold: f64,
    pub hysteresis_window: Duration,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            warning_threshold: 0.7,
            critical_threshold: 0.8,
            hysteresis_window: Duration::from_secs(30),
        }
    }
}

struct Inner {
    state: GlobalState,
    last_high_signal_at: Option<Timestamp>,
}

/// Owns S3's current state behind a single lock (spec §5: shared mutable
/// state owned by a single actor).
pub struct S3StateMachine {
    inner: parking_lot::Mutex<Inner>,
    config: S3Config,
    telemetry: Arc<TelemetryBus>,
}

impl S3StateMachine {
    #[must_use]
    pub fn new(config: S3Config, telemetry: Arc<TelemetryBus>) -> Self {
        Self {
            inner: parking_lot::Mutex::new(Inner {
                state: GlobalState::Normal,
                last_high_signal_at: None,
            }),
            config,
            telemetry,
        }
    }

    fn implied_level(&self, severity: f64) -> GlobalState {
        if severity >= self.config.critical_threshold {
            GlobalState::Critical
        } else if severity >= self.config.warning_threshold {
            GlobalState::Warning
        } else {
            GlobalState::Normal
        }
    }

    fn emit_transition(&self, state: GlobalState) {
        self.telemetry.publish(
            &TelemetryEvent::new("cyb.vsm.s3.transition", "vsm.s3").with_metadata("state", state.as_str()),
        );
    }

    /// Apply hysteresis decay if the window has elapsed since the last
    /// signal that held the current level. Call before consulting
    /// `current()` for up-to-date state, and internally before applying a
    /// new pain signal.
    fn decay_locked(&self, inner: &mut Inner, now: Timestamp) {
        if matches!(inner.state, GlobalState::Normal | GlobalState::Intervening) {
            return;
        }
        let Some(last) = inner.last_high_signal_at else {
            return;
        };
        if now.elapsed_since(last).to_std().unwrap_or_default() >= self.config.hysteresis_window {
            let next = inner.state.decayed();
            if next != inner.state {
                inner.state = next;
                inner.last_high_signal_at = Some(now);
                self.emit_transition(next);
            }
        }
    }

    /// Record a pain signal's severity, applying hysteresis decay first,
    /// then escalating (never auto-de-escalating below the decayed level)
    /// if the signal implies a higher state.
    pub fn record_pain(&self, severity: f64) -> GlobalState {
        let now = Timestamp::now();
        let mut inner = self.inner.lock();
        self.decay_locked(&mut inner, now);

        if inner.state == GlobalState::Intervening {
            return inner.state;
        }

        let implied = self.implied_level(severity);
        if implied > inner.state {
            inner.state = implied;
            inner.last_high_signal_at = Some(now);
            self.emit_transition(implied);
        } else if implied == inner.state && implied != GlobalState::Normal {
            // Refresh the hysteresis clock: the level is still justified.
            inner.last_high_signal_at = Some(now);
        }
        inner.state
    }

    /// S3 has decided to act: force `intervening` regardless of the
    /// current level.
    pub fn begin_intervention(&self) {
        let mut inner = self.inner.lock();
        inner.state = GlobalState::Intervening;
        self.emit_transition(GlobalState::Intervening);
    }

    /// The intervention concluded; return to `normal`.
    pub fn end_intervention(&self) {
        let mut inner = self.inner.lock();
        inner.state = GlobalState::Normal;
        inner.last_high_signal_at = None;
        self.emit_transition(GlobalState::Normal);
    }

    /// Current state, applying any decay the hysteresis window now
    /// justifies.
    #[must_use]
    pub fn current(&self) -> GlobalState {
        let now = Timestamp::now();
        let mut inner = self.inner.lock();
        self.decay_locked(&mut inner, now);
        inner.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(hysteresis_window: Duration) -> S3StateMachine {
        S3StateMachine::new(
            S3Config {
                hysteresis_window,
                ..S3Config::default()
            },
            Arc::new(TelemetryBus::new()),
        )
    }

    #[test]
    fn pain_at_warning_threshold_transitions_to_warning() {
        let m = machine(Duration::from_secs(30));
        assert_eq!(m.record_pain(0.75), GlobalState::Warning);
    }

    #[test]
    fn pain_at_critical_threshold_transitions_to_critical() {
        let m = machine(Duration::from_secs(30));
        assert_eq!(m.record_pain(0.85), GlobalState::Critical);
    }

    #[test]
    fn low_severity_pain_does_not_escalate() {
        let m = machine(Duration::from_secs(30));
        assert_eq!(m.record_pain(0.2), GlobalState::Normal);
    }

    #[test]
    fn state_decays_one_level_after_hysteresis_window_elapses() {
        let m = machine(Duration::from_millis(20));
        assert_eq!(m.record_pain(0.85), GlobalState::Critical);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(m.current(), GlobalState::Warning);
    }

    #[test]
    fn repeated_high_signals_reset_the_hysteresis_clock() {
        let m = machine(Duration::from_millis(30));
        m.record_pain(0.85);
        std::thread::sleep(Duration::from_millis(20));
        m.record_pain(0.85);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(m.current(), GlobalState::Critical);
    }

    #[test]
    fn intervention_forces_state_and_resets_to_normal_on_end() {
        let m = machine(Duration::from_secs(30));
        m.record_pain(0.85);
        m.begin_intervention();
        assert_eq!(m.current(), GlobalState::Intervening);
        m.end_intervention();
        assert_eq!(m.current(), GlobalState::Normal);
    }
}
