//! The `Pipe` half of a source: a bare entry point in the compiled graph
//! that the `PipelineCompiler` wires a `pipe_next` onto. All the actual
//! I/O lives on the matching `ThreadedSourceDriver`'s worker thread and
//! reaches this node only indirectly, via `MainLoop::dispatch` handing the
//! message to `Center::queue` at this endpoint's `PipeId`.

use logpipe_core::pipe::{Pipe, PipeId};

/// A file-tail (or other real transport) source's graph node.
#[derive(Default)]
pub struct SourceEndpoint {
    pipe_next: Option<PipeId>,
}

impl SourceEndpoint {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Pipe for SourceEndpoint {
    fn pipe_next(&self) -> Option<PipeId> {
        self.pipe_next
    }

    fn describe(&self) -> &'static str {
        "file-source"
    }

    fn set_pipe_next_mut(&mut self, next: PipeId) {
        self.pipe_next = Some(next);
    }

    fn clone_boxed(&self) -> Box<dyn Pipe> {
        Box::new(SourceEndpoint { pipe_next: self.pipe_next })
    }
}
