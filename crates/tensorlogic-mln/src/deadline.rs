//! Wall-clock deadlines and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::error::{MlnError, Result};

/// Externally supplied termination signal polled inside bounded loops.
pub trait Deadline: Sync {
    /// Whether work should stop now.
    fn has_expired(&self) -> bool;
}

/// A deadline that never expires.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDeadline;

impl Deadline for NoDeadline {
    fn has_expired(&self) -> bool {
        false
    }
}

/// Expires once a fixed instant has passed.
#[derive(Clone, Copy, Debug)]
pub struct WallClockDeadline {
    expires_at: Instant,
}

impl WallClockDeadline {
    /// Expire at `instant`.
    pub fn at(instant: Instant) -> Self {
        Self {
            expires_at: instant,
        }
    }

    /// Expire `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self::at(Instant::now() + budget)
    }

    /// Time left before expiry.
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

impl Deadline for WallClockDeadline {
    fn has_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Shared flag that another thread can raise to cancel work.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create an un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Deadline for CancellationToken {
    fn has_expired(&self) -> bool {
        self.is_cancelled()
    }
}

/// Poll `deadline` on every `interval`-th step, starting with step 0.
pub(crate) fn poll(
    deadline: &dyn Deadline,
    step: u64,
    interval: u64,
    stage: &'static str,
) -> Result<()> {
    if step % interval.max(1) == 0 && deadline.has_expired() {
        warn!(stage, step, "deadline expired");
        return Err(MlnError::Timeout { stage });
    }
    Ok(())
}
