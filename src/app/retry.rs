//! Reconnect retry policies.
//!
//! The control loop asks the policy how long to wait after each failed
//! attempt.  `None` means give up for this cycle; the default
//! [`FixedBackoff`] never gives up, which yields the "block until
//! connected" behaviour.

/// Decides the wait before the next attempt.
pub trait RetryPolicy {
    /// Delay (ms) after failed attempt number `attempt` (1-based), or
    /// `None` to stop retrying.
    fn next_delay_ms(&mut self, attempt: u32) -> Option<u32>;
}

/// Same wait after every failure, forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff {
    interval_ms: u32,
}

impl FixedBackoff {
    pub const fn new(interval_ms: u32) -> Self {
        Self { interval_ms }
    }
}

impl RetryPolicy for FixedBackoff {
    fn next_delay_ms(&mut self, _attempt: u32) -> Option<u32> {
        Some(self.interval_ms)
    }
}

/// Doubling wait starting at `base_ms`, capped at `cap_ms`, forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    base_ms: u32,
    cap_ms: u32,
}

impl ExponentialBackoff {
    pub const fn new(base_ms: u32, cap_ms: u32) -> Self {
        Self { base_ms, cap_ms }
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn next_delay_ms(&mut self, attempt: u32) -> Option<u32> {
        let shift = attempt.saturating_sub(1).min(31);
        let delay = u64::from(self.base_ms) << shift;
        Some(delay.min(u64::from(self.cap_ms)) as u32)
    }
}

/// Wraps another policy and stops after `max_attempts` failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounded<P> {
    inner: P,
    max_attempts: u32,
}

impl<P: RetryPolicy> Bounded<P> {
    pub const fn new(inner: P, max_attempts: u32) -> Self {
        Self { inner, max_attempts }
    }
}

impl<P: RetryPolicy> RetryPolicy for Bounded<P> {
    fn next_delay_ms(&mut self, attempt: u32) -> Option<u32> {
        if attempt >= self.max_attempts {
            return None;
        }
        self.inner.next_delay_ms(attempt)
    }
}
