//! The ThreadedWorker substrate *contract*.
//!
//! This module defines the traits a concrete runtime must satisfy; the OS
//! thread + `Mutex`/`Condvar` implementation lives in `logpipe-runtime-std`.
//! What matters here is the suspension/wakeup ordering; the choice of OS
//! threads vs. async tasks is left to the implementation.

mod status;

pub use status::{classify_status, TransportStatus};

/// The suspend/wake contract a threaded source worker blocks on: a mutex,
/// condition variable and `awoken` flag. Implemented by
/// [`Window`](crate::message::Window) for the common case; exists as a
/// trait so tests can substitute a condition that is always free, or one
/// that can be forced closed deterministically.
pub trait WakeupCondition: Send + Sync {
    /// Blocks until a credit is available or [`request_exit`](WakeupCondition::request_exit)
    /// has been called. Returns `false` in the latter case. The
    /// lock-check-wait sequence is atomic with respect to
    /// [`wakeup`](WakeupCondition::wakeup), so no wakeup can be lost
    /// between the check and the wait — which is why this is one call
    /// rather than a `free_to_send()` check plus a separate `wait()`.
    fn acquire(&self) -> bool;

    /// Called from the main loop when a credit is returned; wakes one
    /// blocked `acquire` call.
    fn wakeup(&self);

    /// Cooperative shutdown: sets the exit flag and wakes every waiter.
    fn request_exit(&self);
}

impl WakeupCondition for crate::message::Window {
    fn acquire(&self) -> bool {
        self.acquire_blocking()
    }

    fn wakeup(&self) {
        self.release_credit();
    }

    fn request_exit(&self) {
        crate::message::Window::request_exit(self);
    }
}

/// What a destination's `flush` call resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Batch delivered; counters updated; messages in the batch are acked.
    Success,
    /// The message was added to the batch but no flush happened yet.
    Queued,
    /// Temporary error; the worker reconnects and retries after
    /// `time_reopen`.
    NotConnected,
    /// Temporary error, distinct from `NotConnected` only in that the
    /// transport itself is reachable; also retried.
    Error,
    /// Permanent failure: the batch is dropped and its messages acked as
    /// failed so their sources are not stuck.
    Drop,
}

/// Which kind of flush the worker is requesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    /// The batch hit `batch_bytes`/`flush_lines` and must be sent now.
    ThresholdReached,
    /// `flush_timeout` elapsed since the last flush regardless of size.
    Timeout,
    /// Requested by shutdown/deinit: drain whatever is buffered.
    Explicit,
}
