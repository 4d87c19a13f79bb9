//! Rolling count of connectivity failures

use log::warn;

/// Counts failed network operations since the last success.
///
/// Once the count goes past the threshold the device is reset, a reboot
/// being the only recovery the firmware attempts for a broken network stack.
#[derive(Debug, Clone)]
pub struct ConnectionHealth {
    failures: u32,
    threshold: u32,
}

impl ConnectionHealth {
    pub fn new(threshold: u32) -> Self {
        Self {
            failures: 0,
            threshold,
        }
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
    }

    pub fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
        warn!(
            "Connection failure {}/{}",
            self.failures, self.threshold
        );
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn needs_reset(&self) -> bool {
        self.failures > self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_only_past_the_threshold() {
        let mut health = ConnectionHealth::new(5);
        for _ in 0..5 {
            health.record_failure();
        }
        assert!(!health.needs_reset());
        health.record_failure();
        assert!(health.needs_reset());
    }

    #[test]
    fn success_clears_the_count() {
        let mut health = ConnectionHealth::new(2);
        health.record_failure();
        health.record_failure();
        health.record_success();
        health.record_failure();
        assert_eq!(health.failures(), 1);
        assert!(!health.needs_reset());
    }
}
