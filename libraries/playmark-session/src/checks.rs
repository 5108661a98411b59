//! Cancellation for the two periodic checks
//!
//! A session arms an elapsed-time tick and a completion check. Each gets a
//! child of one session token so both stop together when the session token
//! is cancelled.

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Tokens guarding a session's periodic checks
#[derive(Debug, Clone)]
pub struct PeriodicChecks {
    session: CancellationToken,
    elapsed: CancellationToken,
    completion: CancellationToken,
}

impl PeriodicChecks {
    pub fn new() -> Self {
        let session = CancellationToken::new();
        let elapsed = session.child_token();
        let completion = session.child_token();
        Self {
            session,
            elapsed,
            completion,
        }
    }

    /// Token for the elapsed-time tick
    pub fn elapsed_token(&self) -> CancellationToken {
        self.elapsed.clone()
    }

    /// Token for the completion check
    pub fn completion_token(&self) -> CancellationToken {
        self.completion.clone()
    }

    /// Stop both checks; later calls do nothing
    pub fn cancel_all(&self) {
        if self.session.is_cancelled() {
            return;
        }
        self.session.cancel();
        debug!("Periodic checks cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.session.is_cancelled()
    }
}

impl Default for PeriodicChecks {
    fn default() -> Self {
        Self::new()
    }
}
