//! Shared test doubles for the TCK, generalizing the `SourceMarker`/
//! `RecordingDestination` style stand-ins `logpipe-core`'s own
//! `compiler::tests` module uses internally, so every invariant and
//! scenario case can reuse one small set of fixtures instead of each
//! hand-rolling its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use logpipe_core::compiler::Center;
use logpipe_core::driver::{DestinationDriver, MessageSink, SourceDriver, ThreadedSourceDriver};
use logpipe_core::error::{CoreError, InitError};
use logpipe_core::message::{Message, Window};
use logpipe_core::pipe::{PathOptions, Pipe, PipeId, QueueOutcome};
use logpipe_core::worker::{FlushMode, FlushOutcome};

/// A terminal `Pipe` that records every message it receives, then acks it.
/// Stands in for a real destination wherever a case only needs to observe
/// what reached the end of a path, not exercise driver/worker plumbing.
#[derive(Default)]
pub struct RecordingSink {
    pipe_next: Option<PipeId>,
    received: Mutex<Vec<Message>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.received.lock().unwrap().clone()
    }
}

impl Pipe for RecordingSink {
    fn pipe_next(&self) -> Option<PipeId> {
        self.pipe_next
    }

    fn describe(&self) -> &'static str {
        "recording-sink"
    }

    fn set_pipe_next_mut(&mut self, next: PipeId) {
        self.pipe_next = Some(next);
    }

    fn queue(&self, _center: &Center, msg: Message, path: &PathOptions) -> QueueOutcome {
        self.received.lock().unwrap().push(msg.clone());
        msg.ack(path);
        QueueOutcome::MATCHED
    }

    fn clone_boxed(&self) -> Box<dyn Pipe> {
        Box::new(RecordingSink { pipe_next: self.pipe_next, received: Mutex::new(Vec::new()) })
    }
}

/// A source-side graph node with nothing behind it but a `pipe_next` link,
/// matching the shape of `logpipe-drivers-file`'s real endpoints without
/// depending on that crate for plain graph-wiring tests.
#[derive(Default)]
pub struct BareSource {
    pipe_next: Option<PipeId>,
}

impl BareSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Pipe for BareSource {
    fn pipe_next(&self) -> Option<PipeId> {
        self.pipe_next
    }

    fn describe(&self) -> &'static str {
        "bare-source"
    }

    fn set_pipe_next_mut(&mut self, next: PipeId) {
        self.pipe_next = Some(next);
    }

    fn clone_boxed(&self) -> Box<dyn Pipe> {
        Box::new(BareSource { pipe_next: self.pipe_next })
    }
}

/// A `ThreadedSourceDriver` that posts exactly one message built from
/// `text` as soon as it starts, then idles (polling `window.exit_requested()`)
/// until asked to stop. Used wherever a scenario needs one real source
/// thread acquiring real window credit without the complexity of tailing an
/// actual file.
pub struct OneShotThenIdleSource {
    text: &'static str,
    poll_interval: Duration,
}

impl OneShotThenIdleSource {
    pub fn new(text: &'static str, poll_interval: Duration) -> Self {
        Self { text, poll_interval }
    }
}

impl SourceDriver for OneShotThenIdleSource {
    fn init(&self) -> Result<(), InitError> {
        Ok(())
    }
}

impl ThreadedSourceDriver for OneShotThenIdleSource {
    fn run(&self, sink: &dyn MessageSink, window: &Arc<Window>) {
        if window.acquire_blocking() {
            let ack = logpipe_core::message::AckRecord::new(window.clone());
            sink.post(Message::from_source_input(self.text.as_bytes().to_vec(), None, ack));
        }
        while !window.exit_requested() {
            thread::sleep(self.poll_interval);
        }
    }
}

/// Wraps a `Pipe` in an `Arc` so a test can keep its own handle (to read
/// back what it recorded) after handing a `Box<dyn Pipe>` off to a
/// `Configuration`, which otherwise takes ownership outright.
pub struct SharedPipe<T>(pub Arc<T>);

impl<T: Pipe> Pipe for SharedPipe<T> {
    fn pipe_next(&self) -> Option<PipeId> {
        self.0.pipe_next()
    }

    fn describe(&self) -> &'static str {
        self.0.describe()
    }

    fn queue(&self, center: &Center, msg: Message, path: &PathOptions) -> QueueOutcome {
        self.0.queue(center, msg, path)
    }

    fn clone_boxed(&self) -> Box<dyn Pipe> {
        Box::new(SharedPipe(self.0.clone()))
    }
}

/// A `DestinationDriver` whose `flush` only succeeds once `release` is set,
/// modelling a destination that is reachable (so `insert` always buffers)
/// but cannot currently accept a batch — the back-pressure scenario's
/// "destination stalled" state.
pub struct StallableDestination {
    release: Arc<AtomicBool>,
    received: Mutex<Vec<Message>>,
}

impl StallableDestination {
    pub fn new(release: Arc<AtomicBool>) -> Self {
        Self { release, received: Mutex::new(Vec::new()) }
    }

    pub fn received_count(&self) -> usize {
        self.received.lock().unwrap().len()
    }
}

impl DestinationDriver for StallableDestination {
    fn init(&self) -> Result<(), InitError> {
        Ok(())
    }

    fn connect(&self) -> Result<(), CoreError> {
        Ok(())
    }

    fn insert(&self, msg: Message) -> FlushOutcome {
        self.received.lock().unwrap().push(msg);
        FlushOutcome::Queued
    }

    fn flush(&self, _mode: FlushMode) -> FlushOutcome {
        if self.release.load(Ordering::Acquire) {
            FlushOutcome::Success
        } else {
            FlushOutcome::NotConnected
        }
    }
}
