//! The `Pipe` half of a destination: the graph-side node a `Multiplexer`
//! hop delivers to, which just hands the message into the matching
//! [`DestinationRuntime`]'s bounded inbox. The worker thread and its
//! channel are owned here, by the `Pipe` the `Center`'s arena holds, not
//! by anything reachable through a borrowed pointer.

use logpipe_core::compiler::Center;
use logpipe_core::message::Message;
use logpipe_core::pipe::{PathOptions, Pipe, PipeId, QueueOutcome};

use crate::destination::DestinationRuntime;

pub struct DestinationEndpoint {
    runtime: DestinationRuntime,
    pipe_next: Option<PipeId>,
}

impl DestinationEndpoint {
    pub fn new(runtime: DestinationRuntime) -> Self {
        Self { runtime, pipe_next: None }
    }
}

impl Pipe for DestinationEndpoint {
    fn pipe_next(&self) -> Option<PipeId> {
        self.pipe_next
    }

    fn describe(&self) -> &'static str {
        "destination"
    }

    fn set_pipe_next_mut(&mut self, next: PipeId) {
        self.pipe_next = Some(next);
    }

    fn queue(&self, _center: &Center, msg: Message, path: &PathOptions) -> QueueOutcome {
        self.runtime.insert(msg, *path);
        QueueOutcome::MATCHED
    }

    /// A destination endpoint owns a live worker thread; it has no
    /// sensible independent copy, so this only exists to satisfy the
    /// trait. The compiler never clones a destination's template — only
    /// `ProcessRule` chains are cloned — so this path is unreachable in
    /// practice.
    fn clone_boxed(&self) -> Box<dyn Pipe> {
        unreachable!("a live DestinationEndpoint is never cloned by the compiler")
    }
}
