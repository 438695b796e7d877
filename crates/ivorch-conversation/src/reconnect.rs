//! STT reconnect policy: exponential backoff with a hard attempt cap
//! (spec.md §4.2 failure semantics; ported from the node client's
//! reconnect policy, minus jitter — this one has a small fixed attempt
//! cap rather than unlimited retries, so determinism matters more than
//! spreading a reconnect storm).

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub factor: f64,
    pub cap: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(base_ms: u64, factor: f64, cap_ms: u64, max_attempts: u32) -> Self {
        Self {
            base: Duration::from_millis(base_ms),
            factor,
            cap: Duration::from_millis(cap_ms),
            max_attempts,
        }
    }

    /// Delay before the given 0-indexed attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.base.as_millis() as f64;
        let delay_ms = base_ms * self.factor.powi(attempt as i32);
        Duration::from_millis(delay_ms.min(self.cap.as_millis() as f64) as u64)
    }

    /// Whether `attempt` (0-indexed, about to be made) exceeds the budget.
    pub fn exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_until_capped() {
        let p = ReconnectPolicy::new(200, 2.0, 5000, 5);
        assert_eq!(p.delay_for_attempt(0), Duration::from_millis(200));
        assert_eq!(p.delay_for_attempt(1), Duration::from_millis(400));
        assert_eq!(p.delay_for_attempt(2), Duration::from_millis(800));
        assert_eq!(p.delay_for_attempt(10), Duration::from_millis(5000));
    }

    #[test]
    fn exhausted_after_max_attempts() {
        let p = ReconnectPolicy::new(200, 2.0, 5000, 5);
        assert!(!p.exhausted(4));
        assert!(p.exhausted(5));
    }
}
