//! Cancelable deadline used for the delayed heading-id pass.

use std::time::Duration;

use web_time::Instant;

/// A single rescheduleable deadline.
///
/// Scheduling replaces any pending deadline, so a burst of edits only fires
/// once, `delay` after the last one. The owner polls it from its event loop.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)arm the deadline relative to `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Disarm and return true if the deadline has passed.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_after_delay() {
        let start = Instant::now();
        let mut debounce = Debouncer::new(Duration::from_millis(500));
        debounce.schedule(start);
        assert!(!debounce.fire_if_due(start + Duration::from_millis(499)));
        assert!(debounce.fire_if_due(start + Duration::from_millis(500)));
        assert!(!debounce.fire_if_due(start + Duration::from_millis(900)));
    }

    #[test]
    fn test_reschedule_pushes_deadline() {
        let start = Instant::now();
        let mut debounce = Debouncer::new(Duration::from_millis(500));
        debounce.schedule(start);
        debounce.schedule(start + Duration::from_millis(300));
        assert!(!debounce.fire_if_due(start + Duration::from_millis(600)));
        assert!(debounce.fire_if_due(start + Duration::from_millis(800)));
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut debounce = Debouncer::new(Duration::from_millis(10));
        debounce.schedule(start);
        debounce.cancel();
        assert!(!debounce.is_pending());
        assert!(!debounce.fire_if_due(start + Duration::from_secs(1)));
    }
}
