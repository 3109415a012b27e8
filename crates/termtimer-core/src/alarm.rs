//! Alarm controller: turns expired timers into a repeating notification
//! until a client acknowledges them.
//!
//! ```text
//!            enqueue(non-empty)
//!    Idle ─────────────────────▶ Active
//!     ▲                            │
//!     └────── acknowledge() ───────┘
//! ```
//!
//! The controller is driven from the control loop only. The side that
//! actually makes noise sits behind the [`Notifier`] trait and must never
//! block the caller.

use tracing::info;

use crate::duration::format_instant;
use crate::store::Timer;

/// Trailer appended to every expired-timer summary.
pub const SUMMARY_TRAILER: &str = "---- end of expired timers summary ----";

/// Whether expired timers are waiting to be acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlarmState {
    #[default]
    Idle,
    Active,
}

/// Something that can draw the user's attention.
///
/// `start_alerting` keeps producing output on a steady cadence until
/// `stop_alerting` is called; both return immediately.
pub trait Notifier: Send + Sync {
    fn start_alerting(&self);
    fn stop_alerting(&self);
}

/// Holds the pending-notification queue and the alarm state.
///
/// The state is [`AlarmState::Active`] exactly when the queue is non-empty.
pub struct AlarmController {
    state: AlarmState,
    pending: Vec<Timer>,
    notifier: Box<dyn Notifier>,
}

impl AlarmController {
    pub fn new(notifier: Box<dyn Notifier>) -> Self {
        Self {
            state: AlarmState::Idle,
            pending: Vec::new(),
            notifier,
        }
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    /// Expired timers not yet delivered to a client, in arrival order.
    pub fn pending(&self) -> &[Timer] {
        &self.pending
    }

    /// Append expired timers; starts alerting on the first one.
    pub fn enqueue(&mut self, expired: Vec<Timer>) {
        if expired.is_empty() {
            return;
        }
        self.pending.extend(expired);
        if self.state == AlarmState::Idle {
            self.state = AlarmState::Active;
            info!(pending = self.pending.len(), "Alarm raised");
            self.notifier.start_alerting();
        }
    }

    /// Drain the queue into a summary and go back to idle.
    ///
    /// Returns `None` when nothing is pending.
    pub fn acknowledge(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let mut summary: String = self
            .pending
            .drain(..)
            .map(|t| format!("{} : {}\n", format_instant(t.expiry), t.description))
            .collect();
        summary.push_str(SUMMARY_TRAILER);

        self.state = AlarmState::Idle;
        self.notifier.stop_alerting();
        info!("Alarm acknowledged");
        Some(summary)
    }

    /// Stop any ongoing alert without touching the queue. Used on shutdown.
    pub fn silence(&self) {
        if self.state == AlarmState::Active {
            self.notifier.stop_alerting();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::identity::IdentityGenerator;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Notifier that only counts calls.
    #[derive(Default, Clone)]
    pub(crate) struct CountingNotifier {
        pub starts: Arc<AtomicUsize>,
        pub stops: Arc<AtomicUsize>,
    }

    impl Notifier for CountingNotifier {
        fn start_alerting(&self) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn stop_alerting(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn timer(description: &str) -> Timer {
        Timer {
            id: IdentityGenerator::new().next_id().unwrap(),
            description: description.to_string(),
            expiry: Utc::now(),
        }
    }

    #[test]
    fn test_starts_idle() {
        let alarm = AlarmController::new(Box::new(CountingNotifier::default()));
        assert_eq!(alarm.state(), AlarmState::Idle);
        assert!(alarm.pending().is_empty());
    }

    #[test]
    fn test_enqueue_empty_stays_idle() {
        let notifier = CountingNotifier::default();
        let mut alarm = AlarmController::new(Box::new(notifier.clone()));
        alarm.enqueue(Vec::new());
        assert_eq!(alarm.state(), AlarmState::Idle);
        assert_eq!(notifier.starts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_enqueue_activates_once() {
        let notifier = CountingNotifier::default();
        let mut alarm = AlarmController::new(Box::new(notifier.clone()));

        alarm.enqueue(vec![timer("one")]);
        alarm.enqueue(vec![timer("two")]);

        assert_eq!(alarm.state(), AlarmState::Active);
        assert_eq!(alarm.pending().len(), 2);
        assert_eq!(notifier.starts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_acknowledge_drains_and_idles() {
        let notifier = CountingNotifier::default();
        let mut alarm = AlarmController::new(Box::new(notifier.clone()));
        alarm.enqueue(vec![timer("tea"), timer("laundry")]);

        let summary = alarm.acknowledge().unwrap();
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with(" : tea"));
        assert!(lines[1].ends_with(" : laundry"));
        assert_eq!(lines[2], SUMMARY_TRAILER);

        assert_eq!(alarm.state(), AlarmState::Idle);
        assert!(alarm.pending().is_empty());
        assert_eq!(notifier.stops.load(Ordering::SeqCst), 1);
        assert_eq!(alarm.acknowledge(), None);
    }

    #[test]
    fn test_silence_only_when_active() {
        let notifier = CountingNotifier::default();
        let mut alarm = AlarmController::new(Box::new(notifier.clone()));
        alarm.silence();
        assert_eq!(notifier.stops.load(Ordering::SeqCst), 0);

        alarm.enqueue(vec![timer("x")]);
        alarm.silence();
        assert_eq!(notifier.stops.load(Ordering::SeqCst), 1);
    }
}
