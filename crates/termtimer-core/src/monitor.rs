//! Expiry monitor: the per-tick sweep from the timer store into the alarm.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::alarm::AlarmController;
use crate::duration::format_instant;
use crate::store::TimerStore;

/// Move every timer due at `now` into the alarm's pending queue.
///
/// Runs on every control-loop tick whether or not a request was served.
/// Returns how many timers expired.
pub fn sweep(store: &mut TimerStore, alarm: &mut AlarmController, now: DateTime<Utc>) -> usize {
    let expired = store.take_expired(now);
    for timer in &expired {
        info!(
            id = %timer.id,
            description = %timer.description,
            expiry = %format_instant(timer.expiry),
            "Timer expired"
        );
    }
    let count = expired.len();
    alarm.enqueue(expired);
    count
}
