//! The source/destination driver contract.
//!
//! Concrete drivers (file tail, file append, and eventually socket/gRPC/
//! object-store sinks) live outside this crate — `logpipe-drivers-file`
//! supplies the reference pair. This module only fixes the shape every
//! driver must expose so the `ThreadedWorker` substrate
//! (`logpipe-runtime-std`) can drive any of them uniformly.

use std::sync::Arc;

use crate::error::{CoreError, InitError};
use crate::message::{Message, Window};
use crate::worker::{FlushMode, FlushOutcome};

/// Where a [`ThreadedSourceDriver`] hands off the messages it produces: a
/// `post(msg)` API its worker thread calls to inject messages into the
/// graph.
pub trait MessageSink: Send + Sync {
    fn post(&self, msg: Message);
}

/// A source driver's lifecycle.
pub trait SourceDriver: Send + Sync {
    fn init(&self) -> Result<(), InitError> {
        Ok(())
    }

    fn deinit(&self) {}
}

/// A source driver whose `run()` blocks on I/O and must therefore live on
/// its own OS thread.
pub trait ThreadedSourceDriver: SourceDriver {
    /// Blocks the calling thread until `window` reports exit requested.
    /// Implementations read from their transport in a loop, construct a
    /// [`Message`] per record, attach an ack record backed by `window` so
    /// acking the message frees its credit, and call `sink.post(msg)` —
    /// blocking first whenever the per-source credit window is exhausted.
    /// `window` is concrete rather than the generic
    /// [`crate::worker::WakeupCondition`] because the driver must hand the
    /// very same window to `AckRecord::new`.
    fn run(&self, sink: &dyn MessageSink, window: &Arc<Window>);
}

/// A destination driver's lifecycle and batching contract.
pub trait DestinationDriver: Send + Sync {
    fn init(&self) -> Result<(), InitError> {
        Ok(())
    }

    fn deinit(&self) {}

    fn connect(&self) -> Result<(), CoreError>;

    fn disconnect(&self) {}

    /// Accumulate one message into the current batch. Returns `Queued`
    /// unless this insert also crossed a size threshold, in which case the
    /// driver may flush inline and return the flush's outcome instead.
    fn insert(&self, msg: Message) -> FlushOutcome;

    /// Force a flush of whatever is currently batched.
    fn flush(&self, mode: FlushMode) -> FlushOutcome;

    /// A hint the dispatcher uses to pin related messages to the same
    /// worker (so per-key ordering is preserved across a pool of
    /// destination workers). `None` means "no preference".
    fn partition_key(&self, msg: &Message) -> Option<String> {
        let _ = msg;
        None
    }
}

/// Marker alias: every `DestinationDriver` in this design already runs on
/// its own worker thread via the `logpipe-runtime-std` substrate, so there
/// is no additional surface a "threaded" variant needs beyond
/// [`DestinationDriver`] itself. Kept as a distinct trait rather than
/// folding into `DestinationDriver` to leave room for a future
/// non-threaded destination without a breaking change.
pub trait ThreadedDestinationDriver: DestinationDriver {}

impl<T: DestinationDriver> ThreadedDestinationDriver for T {}
