//! Query cancellation token (§5 "Cancellation").
//!
//! Grounded on the teacher's `execution::timeout::QueryTimeout`: an atomic
//! flag checked cooperatively, plus an optional deadline. Simplified to
//! just the token shape the executors need — the `with_timeout` closure
//! helpers aren't used here since the executors check the token directly at
//! their own suspension points (leaf calls and read-group waits, §5
//! "Suspension points").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Cancelled,
    TimedOut,
}

/// A query's cancellation token: one per `execute()` call, cloneable and
/// shareable across worker threads (§5 "A query has one cancellation
/// token").
#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    start: Instant,
    deadline: Option<Duration>,
}

impl CancellationToken {
    pub fn new(deadline: Option<Duration>) -> Self {
        CancellationToken { cancelled: Arc::new(AtomicBool::new(false)), start: Instant::now(), deadline }
    }

    pub fn unbounded() -> Self {
        CancellationToken::new(None)
    }

    /// Cooperative check, called at leaf dispatch and read-group waits.
    pub fn check(&self) -> Result<(), CancelReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Err(CancelReason::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if self.start.elapsed() > deadline {
                self.cancelled.store(true, Ordering::Relaxed);
                return Err(CancelReason::TimedOut);
            }
        }
        Ok(())
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
