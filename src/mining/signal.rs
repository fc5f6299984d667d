use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Generation counter the mining loop sleeps on
///
/// Bumped whenever there may be new work: a transaction entered the mempool
/// or the tip moved.
#[derive(Debug, Default)]
pub struct WorkSignal {
    generation: Mutex<u64>,
    changed: Condvar,
}

impl WorkSignal {
    pub fn new() -> WorkSignal {
        WorkSignal::default()
    }

    pub fn notify(&self) {
        let mut generation = match self.generation.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *generation = generation.wrapping_add(1);
        self.changed.notify_all();
    }

    pub fn current(&self) -> u64 {
        match self.generation.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Block until the generation differs from `seen` or `timeout` passes
    pub fn wait_for_change(&self, seen: u64, timeout: Duration) -> u64 {
        let guard = match self.generation.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let result = self
            .changed
            .wait_timeout_while(guard, timeout, |generation| *generation == seen);
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
    fn test_wait_times_out_without_notify() {
        let signal = WorkSignal::new();
        let seen = signal.current();
        assert_eq!(signal.wait_for_change(seen, Duration::from_millis(10)), seen);
    }

    #[test]
    fn test_wait_wakes_on_notify() {
        let signal = Arc::new(WorkSignal::new());
        let seen = signal.current();
        let notifier = Arc::clone(&signal);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            notifier.notify();
        });
        let generation = signal.wait_for_change(seen, Duration::from_secs(5));
        assert_ne!(generation, seen);
        handle.join().unwrap();
    }
}
