//! Synchronization primitives shared by the input and worker threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A thread-safe stop flag polled from the search hot path.
///
/// Wraps `Arc<AtomicBool>` so both threads can hold it without further
/// plumbing.
#[derive(Clone, Debug)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    #[must_use]
    pub fn new() -> Self {
        StopFlag(Arc::new(AtomicBool::new(false)))
    }

    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

impl Default for StopFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// A (mutex, condvar, predicate) event with deadline waits.
///
/// `wait_reset` blocks until the event is signalled or the timeout runs
/// out, then clears the flag: the throttle uses this both to sleep in an
/// interruptible way and to consume a pending signal with a zero timeout.
pub struct Event {
    flag: Mutex<bool>,
    cond: Condvar,
}

impl Event {
    #[must_use]
    pub fn new() -> Event {
        Event {
            flag: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// Signal the event, waking one waiter.
    pub fn set(&self) {
        let mut flag = self.flag.lock();
        *flag = true;
        self.cond.notify_all();
    }

    /// Wait up to `millis` for the event; the flag is cleared on return.
    /// Returns whether the event was actually signalled.
    pub fn wait_reset(&self, millis: i64) -> bool {
        let deadline = Instant::now() + Duration::from_millis(millis.max(0) as u64);
        let mut flag = self.flag.lock();
        while !*flag {
            if self.cond.wait_until(&mut flag, deadline).timed_out() {
                break;
            }
        }
        let was_set = *flag;
        *flag = false;
        was_set
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_stop_flag_lifecycle() {
        let flag = StopFlag::new();
        assert!(!flag.is_set());
        flag.set();
        assert!(flag.is_set());
        flag.reset();
        assert!(!flag.is_set());
    }

    #[test]
    fn test_stop_flag_shared_across_clones() {
        let a = StopFlag::new();
        let b = a.clone();
        a.set();
        assert!(b.is_set());
    }

    #[test]
    fn test_event_timeout_without_signal() {
        let ev = Event::new();
        assert!(!ev.wait_reset(5));
    }

    #[test]
    fn test_event_wakes_waiter_and_resets() {
        let ev = Arc::new(Event::new());
        let ev2 = Arc::clone(&ev);
        let handle = thread::spawn(move || ev2.wait_reset(5000));
        thread::sleep(Duration::from_millis(20));
        ev.set();
        assert!(handle.join().unwrap());
        // the flag was consumed by the waiter
        assert!(!ev.wait_reset(0));
    }

    #[test]
    fn test_event_zero_wait_consumes_pending_signal() {
        let ev = Event::new();
        ev.set();
        assert!(ev.wait_reset(0));
        assert!(!ev.wait_reset(0));
    }
}
