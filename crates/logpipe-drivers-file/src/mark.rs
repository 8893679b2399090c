//! The internal mark source: a synthetic source that never itself reads
//! from any transport. `MainLoop` fires it directly off the `mark_freq`
//! timer rather than through a worker thread and `SourceRuntime`, since it
//! never blocks on I/O — it's just `MainLoop` calling `Center::queue` at
//! this node's `PipeId` whenever no other source produced traffic before
//! the deadline.

use logpipe_core::pipe::{Pipe, PipeId};

/// The mark source's graph node. Identical shape to
/// [`crate::endpoint::SourceEndpoint`]; kept as its own type so
/// diagnostics (`describe()`, the pipe name `ConfigError::Init` embeds)
/// read as "mark-source" rather than a generic file source.
#[derive(Default)]
pub struct InternalMarkSource {
    pipe_next: Option<PipeId>,
}

impl InternalMarkSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Pipe for InternalMarkSource {
    fn pipe_next(&self) -> Option<PipeId> {
        self.pipe_next
    }

    fn describe(&self) -> &'static str {
        "mark-source"
    }

    fn set_pipe_next_mut(&mut self, next: PipeId) {
        self.pipe_next = Some(next);
    }

    fn clone_boxed(&self) -> Box<dyn Pipe> {
        Box::new(InternalMarkSource { pipe_next: self.pipe_next })
    }
}
