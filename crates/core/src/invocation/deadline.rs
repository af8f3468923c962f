//! Deadline-bound cancellation scope for one invocation.
//!
//! A [`DeadlineScope`] owns a child of the request's [`CancellationToken`].
//! It ends when either the parent is cancelled or the timeout elapses; in the
//! latter case the scope cancels its own token so every task holding it sees
//! a single, consistent signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a [`DeadlineScope`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeEnd {
    DeadlineElapsed,
    Cancelled,
}

pub struct DeadlineScope {
    token: CancellationToken,
    deadline: Instant,
    timeout: Duration,
    expired: AtomicBool,
}

impl DeadlineScope {
    /// Derive a scope from `parent` that also expires after `timeout`.
    pub fn new(parent: &CancellationToken, timeout: Duration) -> Self {
        Self {
            token: parent.child_token(),
            deadline: Instant::now() + timeout,
            timeout,
            expired: AtomicBool::new(false),
        }
    }

    /// Token cancelled when the scope ends, for helper tasks.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait until the scope ends.
    ///
    /// Cancellation wins when both conditions are ready at once. Once ended,
    /// further calls return the same [`ScopeEnd`] immediately.
    pub async fn ended(&self) -> ScopeEnd {
        tokio::select! {
            biased;
            () = self.token.cancelled() => {
                if self.expired.load(Ordering::Acquire) {
                    ScopeEnd::DeadlineElapsed
                } else {
                    ScopeEnd::Cancelled
                }
            }
            () = tokio::time::sleep_until(self.deadline) => {
                self.expired.store(true, Ordering::Release);
                self.token.cancel();
                ScopeEnd::DeadlineElapsed
            }
        }
    }
}

impl Drop for DeadlineScope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
