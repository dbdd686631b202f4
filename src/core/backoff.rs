//! Exponential reconnect backoff for the live data connection

use std::time::Duration;

use super::constants::{RECONNECT_BASE_DELAY, RECONNECT_MAX_DELAY};

/// Reconnect delay schedule: `min(base * 2^attempt, max)`
///
/// `attempt` counts failed or aborted connection attempts since the last
/// successful open.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    attempt: u32,
    base: Duration,
    max: Duration,
}

impl ReconnectBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            attempt: 0,
            base,
            max,
        }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay for the current attempt, then count the attempt
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Called on a successful open
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        // 2^31 seconds is far beyond any sensible max; cap the shift
        let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(RECONNECT_BASE_DELAY, RECONNECT_MAX_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_failures_then_success() {
        let mut backoff = ReconnectBackoff::default();
        assert_eq!(backoff.next_delay(), Duration::from_millis(1000));
        assert_eq!(backoff.next_delay(), Duration::from_millis(2000));
        assert_eq!(backoff.attempt(), 2);

        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let mut backoff = ReconnectBackoff::default();
        let delays: Vec<u64> = (0..8).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30, 30]);
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let mut backoff = ReconnectBackoff::default();
        backoff.attempt = u32::MAX - 1;
        assert_eq!(backoff.next_delay(), RECONNECT_MAX_DELAY);
        assert_eq!(backoff.next_delay(), RECONNECT_MAX_DELAY);
        assert_eq!(backoff.attempt(), u32::MAX);
    }
}
