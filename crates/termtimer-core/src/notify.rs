//! Repeating notifier: the long-lived task that rings while the alarm is
//! active.
//!
//! The control loop flips a `watch` channel between [`AlarmState::Idle`] and
//! [`AlarmState::Active`]; the task sleeps on that channel while idle and,
//! while active, rings in bursts: `burst` rings `burst_gap` apart, then a
//! `pause`, then again. Every pause also listens on the channel, so
//! acknowledgement cuts the cycle short instead of waiting it out.

use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use termtimer_config::AlarmConfig;

use crate::alarm::{AlarmState, Notifier};

/// A single perceptible ring. Must return without waiting for the ring to
/// finish.
pub trait Chime: Send + Sync {
    fn ring(&self);
}

/// Spawns an external program per ring and never waits for it.
pub struct CommandChime {
    program: String,
    args: Vec<String>,
}

impl CommandChime {
    /// Build from an argv list; `None` when the list is empty.
    pub fn new(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl Chime for CommandChime {
    fn ring(&self) {
        let spawned = Command::new(&self.program)
            .args(&self.args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn();
        match spawned {
            // The child is reaped by the runtime once it exits.
            Ok(child) => debug!(pid = ?child.id(), program = %self.program, "Chime spawned"),
            Err(e) => warn!(program = %self.program, error = %e, "Failed to spawn chime"),
        }
    }
}

/// Rings into the log only.
pub struct LogChime;

impl Chime for LogChime {
    fn ring(&self) {
        warn!("Timer expired and not yet acknowledged");
    }
}

/// Pick the chime configured in `[alarm]`.
pub fn chime_from_config(config: &AlarmConfig) -> Arc<dyn Chime> {
    match CommandChime::new(&config.command) {
        Some(chime) => Arc::new(chime),
        None => Arc::new(LogChime),
    }
}

/// Ring timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub burst: u32,
    pub burst_gap: Duration,
    pub pause: Duration,
}

impl From<&AlarmConfig> for Cadence {
    fn from(config: &AlarmConfig) -> Self {
        Self {
            burst: config.burst.max(1),
            burst_gap: Duration::from_millis(config.burst_gap_ms),
            pause: Duration::from_millis(config.pause_ms),
        }
    }
}

/// [`Notifier`] backed by a background ringing task.
///
/// The task lives as long as this value; it is aborted on drop and never
/// joined.
pub struct RepeatingNotifier {
    state_tx: watch::Sender<AlarmState>,
    task: JoinHandle<()>,
}

impl RepeatingNotifier {
    /// Spawn the ringing task on the current runtime.
    pub fn spawn(chime: Arc<dyn Chime>, cadence: Cadence) -> Self {
        let (state_tx, state_rx) = watch::channel(AlarmState::Idle);
        let task = tokio::spawn(alert_loop(state_rx, chime, cadence));
        Self { state_tx, task }
    }
}

impl Notifier for RepeatingNotifier {
    fn start_alerting(&self) {
        self.state_tx.send_replace(AlarmState::Active);
    }

    fn stop_alerting(&self) {
        self.state_tx.send_replace(AlarmState::Idle);
    }
}

impl Drop for RepeatingNotifier {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn alert_loop(
    mut state_rx: watch::Receiver<AlarmState>,
    chime: Arc<dyn Chime>,
    cadence: Cadence,
) {
    loop {
        let woke = state_rx
            .wait_for(|state| *state == AlarmState::Active)
            .await
            .is_ok();
        if !woke {
            return;
        }
        debug!("Alerting started");

        'ringing: loop {
            for ring in 0..cadence.burst {
                chime.ring();
                let gap = if ring + 1 < cadence.burst {
                    cadence.burst_gap
                } else {
                    cadence.pause
                };
                if !hold(&mut state_rx, gap).await {
                    break 'ringing;
                }
            }
        }
        debug!("Alerting stopped");
    }
}

/// Sleep for `period`; returns whether the alarm is still active afterwards.
/// Returns `false` as soon as the alarm goes idle or the sender is gone.
async fn hold(state_rx: &mut watch::Receiver<AlarmState>, period: Duration) -> bool {
    let deadline = tokio::time::sleep(period);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            () = &mut deadline => return *state_rx.borrow() == AlarmState::Active,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    return false;
                }
                if *state_rx.borrow_and_update() == AlarmState::Idle {
                    return false;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingChime {
        rings: AtomicUsize,
    }

    impl Chime for CountingChime {
        fn ring(&self) {
            self.rings.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fast_cadence() -> Cadence {
        Cadence {
            burst: 2,
            burst_gap: Duration::from_millis(5),
            pause: Duration::from_millis(20),
        }
    }

    #[test]
    fn test_cadence_from_config() {
        let cadence = Cadence::from(&AlarmConfig::default());
        assert_eq!(cadence.burst, 2);
        assert_eq!(cadence.burst_gap, Duration::from_millis(200));
        assert_eq!(cadence.pause, Duration::from_millis(2000));
    }

    #[test]
    fn test_empty_command_has_no_command_chime() {
        assert!(CommandChime::new(&[]).is_none());
        assert!(CommandChime::new(&["true".to_string()]).is_some());
    }

    #[tokio::test]
    async fn test_idle_notifier_never_rings() {
        let chime = Arc::new(CountingChime::default());
        let _notifier = RepeatingNotifier::spawn(chime.clone(), fast_cadence());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(chime.rings.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rings_repeatedly_until_stopped() {
        let chime = Arc::new(CountingChime::default());
        let notifier = RepeatingNotifier::spawn(chime.clone(), fast_cadence());

        notifier.start_alerting();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(chime.rings.load(Ordering::SeqCst) >= 4);

        notifier.stop_alerting();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let after_stop = chime.rings.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(chime.rings.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn test_stop_cuts_a_long_pause_short() {
        let chime = Arc::new(CountingChime::default());
        let cadence = Cadence {
            burst: 1,
            burst_gap: Duration::from_millis(5),
            pause: Duration::from_secs(60),
        };
        let notifier = RepeatingNotifier::spawn(chime.clone(), cadence);

        notifier.start_alerting();
        tokio::time::sleep(Duration::from_millis(30)).await;
        notifier.stop_alerting();
        tokio::time::sleep(Duration::from_millis(30)).await;

        // Restarting rings again right away instead of finishing the old pause.
        notifier.start_alerting();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(chime.rings.load(Ordering::SeqCst), 2);
    }
}
