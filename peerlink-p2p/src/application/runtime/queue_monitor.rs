use std::time::Duration;
use tokio::time::Instant;

/// Rate-limited backpressure warning for the inbound queue
///
/// Fires once the depth exceeds the threshold, then stays quiet for the
/// cooldown. After the cooldown it fires again even if the backlog never
/// cleared.
#[derive(Debug, Clone)]
pub struct QueueMonitor {
    threshold: usize,
    cooldown: Duration,
    last_warning: Option<Instant>,
}

impl QueueMonitor {
    pub fn new(threshold: usize, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
            last_warning: None,
        }
    }

    /// Returns `true` when a warning should be logged for `depth` at `now`
    pub fn observe(&mut self, depth: usize, now: Instant) -> bool {
        if depth <= self.threshold {
            return false;
        }

        match self.last_warning {
            Some(at) if now.saturating_duration_since(at) < self.cooldown => false,
            _ => {
                self.last_warning = Some(now);
                true
            }
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_threshold_is_quiet() {
        let mut monitor = QueueMonitor::new(10, Duration::from_secs(5));
        let now = Instant::now();
        assert!(!monitor.observe(0, now));
        assert!(!monitor.observe(10, now));
    }

    #[test]
    fn test_warning_suppressed_during_cooldown() {
        let mut monitor = QueueMonitor::new(10, Duration::from_secs(5));
        let start = Instant::now();

        assert!(monitor.observe(11, start));
        assert!(!monitor.observe(50, start + Duration::from_secs(1)));
        assert!(!monitor.observe(50, start + Duration::from_millis(4_999)));
    }

    #[test]
    fn test_rearms_after_cooldown_with_persistent_backlog() {
        let mut monitor = QueueMonitor::new(10, Duration::from_secs(5));
        let start = Instant::now();

        assert!(monitor.observe(11, start));
        assert!(monitor.observe(11, start + Duration::from_secs(5)));
        assert!(!monitor.observe(11, start + Duration::from_secs(6)));
        assert!(monitor.observe(11, start + Duration::from_secs(10)));
    }
}
