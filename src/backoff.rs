use std::time::Duration;

/// Floor wait observed across the control-plane resources.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(3);

/// Wait schedule between retryable failures.
///
/// The wait for attempt `n` is `first + n * increment`, capped at `ceiling`.
/// A zero increment gives a fixed policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    first: Duration,
    increment: Duration,
    ceiling: Duration,
}

impl Backoff {
    pub fn fixed(step: Duration) -> Self {
        Self {
            first: step,
            increment: Duration::ZERO,
            ceiling: step,
        }
    }

    pub fn incremental(first: Duration, increment: Duration, ceiling: Duration) -> Self {
        Self {
            first,
            increment,
            ceiling: ceiling.max(first),
        }
    }

    /// Wait before the retry that follows the failure of `attempt_index` (zero-based).
    pub fn next_wait(&self, attempt_index: u32) -> Duration {
        let grown = self
            .increment
            .checked_mul(attempt_index)
            .and_then(|extra| self.first.checked_add(extra))
            .unwrap_or(self.ceiling);
        grown.min(self.ceiling)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::fixed(DEFAULT_WAIT)
    }
}
