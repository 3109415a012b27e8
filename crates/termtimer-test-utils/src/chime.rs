//! A chime that records rings instead of making noise.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use termtimer_core::Chime;

/// Counts every ring. Clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct RecordingChime {
    rings: Arc<AtomicUsize>,
}

impl RecordingChime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rings(&self) -> usize {
        self.rings.load(Ordering::SeqCst)
    }

    /// Poll until at least `count` rings were recorded or `timeout` passes.
    pub async fn wait_for_rings(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.rings() < count {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }
}

impl Chime for RecordingChime {
    fn ring(&self) {
        self.rings.fetch_add(1, Ordering::SeqCst);
    }
}
