//! Clock backed by the tokio timer

use playmark_core::Clock;
use tokio::time::Instant;

/// Epoch-millisecond clock that follows tokio's notion of time
///
/// Under `tokio::time::pause()` it advances only when the runtime does,
/// which keeps scheduled deadlines and periodic checks on one timeline.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    base_ms: i64,
    origin: Instant,
}

impl TokioClock {
    /// Clock reading `base_ms` right now
    pub fn starting_at(base_ms: i64) -> Self {
        Self {
            base_ms,
            origin: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> i64 {
        let elapsed = i64::try_from(self.origin.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.base_ms.saturating_add(elapsed)
    }
}
