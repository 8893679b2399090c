use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// A source's flow-control window: an integer credit counter bounded by
/// `log_iw_size`, plus the condvar a blocked source thread waits on when
/// credits are exhausted.
///
/// The lock/check/wait sequence in [`acquire_blocking`](Window::acquire_blocking)
/// and the lock/release/notify sequence in [`release_credit`](Window::release_credit)
/// share the same mutex, so the "is a credit free" check and the wait are
/// atomic with respect to the corresponding release: no credit can be
/// released between a source's check and its wait, because both sides
/// hold the lock across the whole operation.
pub struct Window {
    capacity: i64,
    state: Mutex<WindowState>,
    condvar: Condvar,
}

struct WindowState {
    credits: i64,
    exit_requested: bool,
}

impl Window {
    pub fn new(capacity: i64) -> Arc<Self> {
        assert!(capacity >= 0, "log_iw_size must be non-negative");
        Arc::new(Self {
            capacity,
            state: Mutex::new(WindowState { credits: capacity, exit_requested: false }),
            condvar: Condvar::new(),
        })
    }

    pub fn capacity(&self) -> i64 {
        self.capacity
    }

    /// Current available credits. For tests and metrics only; never used to
    /// make an acquire decision (that must go through the locked path).
    pub fn credits(&self) -> i64 {
        self.state.lock().unwrap().credits
    }

    /// Non-blocking acquire: returns `true` and consumes one credit iff one
    /// was available.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.credits > 0 {
            state.credits -= 1;
            true
        } else {
            false
        }
    }

    /// Blocks the calling (source worker) thread until a credit is
    /// available or [`request_exit`](Window::request_exit) is called.
    /// Returns `false` if it woke up due to exit rather than a credit.
    pub fn acquire_blocking(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        loop {
            if state.credits > 0 {
                state.credits -= 1;
                return true;
            }
            if state.exit_requested {
                return false;
            }
            state = self.condvar.wait(state).unwrap();
        }
    }

    /// Returns one credit to the window (never exceeding `capacity`) and
    /// wakes any source thread blocked in [`acquire_blocking`].
    pub fn release_credit(&self) {
        let mut state = self.state.lock().unwrap();
        state.credits = (state.credits + 1).min(self.capacity);
        self.condvar.notify_one();
    }

    /// Cooperative shutdown: sets the exit flag and wakes any waiter so
    /// `run()` can observe it and return.
    pub fn request_exit(&self) {
        let mut state = self.state.lock().unwrap();
        state.exit_requested = true;
        self.condvar.notify_all();
    }

    /// Non-blocking exit check, for a driver idling on "no new data right
    /// now" (tail-at-EOF) rather than on a scarce credit.
    pub fn exit_requested(&self) -> bool {
        self.state.lock().unwrap().exit_requested
    }
}

/// Per-message ack accounting, shared across every clone produced by
/// [`Message::clone_cow`](crate::message::Message::clone_cow) and every
/// fan-out branch a [`Multiplexer`](crate::multiplexer::Multiplexer)
/// creates from one source-posted message.
///
/// `outstanding` starts at zero: a message that never reaches a
/// [`Multiplexer`] edge with `ack_needed` set owes nothing and is simply
/// dropped when its last reference goes away. Every edge that does need
/// acking increments `outstanding` by one and some downstream point —
/// typically a destination driver, or a pipe that decides to drop the
/// message — must call [`ack`](AckRecord::ack) exactly once to balance it.
pub struct AckRecord {
    outstanding: AtomicI64,
    window: Arc<Window>,
}

impl AckRecord {
    pub fn new(window: Arc<Window>) -> Arc<Self> {
        Arc::new(Self { outstanding: AtomicI64::new(0), window })
    }

    pub fn add_ack(&self) {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
    }

    pub fn ack(&self) {
        let prev = self.outstanding.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev >= 1, "ack() called without a matching add_ack()");
        if prev == 1 {
            self.window.release_credit();
        }
    }

    pub fn outstanding(&self) -> i64 {
        self.outstanding.load(Ordering::Acquire)
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_never_exceeds_capacity_or_goes_negative() {
        let window = Window::new(2);
        assert!(window.try_acquire());
        assert!(window.try_acquire());
        assert!(!window.try_acquire());
        assert_eq!(window.credits(), 0);
        window.release_credit();
        window.release_credit();
        window.release_credit(); // extra release must clamp, not overflow
        assert_eq!(window.credits(), 2);
    }

    #[test]
    fn ack_record_releases_credit_only_when_outstanding_hits_zero() {
        let window = Window::new(1);
        assert!(window.try_acquire());
        let ack = AckRecord::new(window.clone());
        ack.add_ack();
        ack.add_ack();
        ack.ack();
        assert_eq!(window.credits(), 0, "one outstanding ack remains");
        ack.ack();
        assert_eq!(window.credits(), 1, "last ack releases the credit");
    }
}
