use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Counts FULL_CHAIN responses so startup sync can wait for them
#[derive(Debug, Default)]
pub struct SyncTracker {
    responses: Mutex<usize>,
    arrived: Condvar,
}

impl SyncTracker {
    pub fn new() -> SyncTracker {
        SyncTracker::default()
    }

    pub fn reset(&self) {
        match self.responses.lock() {
            Ok(mut responses) => *responses = 0,
            Err(poisoned) => *poisoned.into_inner() = 0,
        }
    }

    pub fn record_response(&self) {
        let mut responses = match self.responses.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *responses += 1;
        self.arrived.notify_all();
    }

    pub fn responses(&self) -> usize {
        match self.responses.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Wait until `expected` responses arrived or `timeout` passed
    pub fn wait_for(&self, expected: usize, timeout: Duration) -> usize {
        let guard = match self.responses.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let result = self
            .arrived
            .wait_timeout_while(guard, timeout, |responses| *responses < expected);
        match result {
            Ok((guard, _)) => *guard,
            Err(poisoned) => *poisoned.into_inner().0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_wait_returns_early_when_all_arrive() {
        let tracker = Arc::new(SyncTracker::new());
        let remote = Arc::clone(&tracker);
        let handle = thread::spawn(move || {
            remote.record_response();
            remote.record_response();
        });
        assert_eq!(tracker.wait_for(2, Duration::from_secs(5)), 2);
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_times_out_and_reset_clears() {
        let tracker = SyncTracker::new();
        tracker.record_response();
        assert_eq!(tracker.wait_for(3, Duration::from_millis(10)), 1);
        tracker.reset();
        assert_eq!(tracker.responses(), 0);
    }
}
