//! The uniform graph node.
//!
//! Every source, filter, parser, rewriter, destination and multiplexer in
//! the compiled graph is a `Box<dyn Pipe>` stored in the
//! [`Center`](crate::compiler::Center)'s arena and addressed by [`PipeId`]
//! rather than by a borrowed pointer: the `Center` owns every pipe for the
//! life of the configuration, pipes only ever hold node ids.

use std::any::Any;

use crate::compiler::Center;
use crate::error::InitError;
use crate::message::Message;

/// Index of a pipe inside a [`Center`]'s arena. Both a pipe's successor and
/// a multiplexer's hops are represented as `PipeId`s: cheap to copy, cannot
/// dangle (the `Center` owns every pipe for the life of the configuration),
/// and sidestep the reference-cycle concerns a borrowed-pointer graph would
/// raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipeId(pub(crate) u32);

impl PipeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Compile-time flags attached to a pipe. Set once by the
/// [`PipelineCompiler`](crate::compiler::PipelineCompiler) and never
/// mutated afterward; a plain struct of `bool`s reads more clearly at call
/// sites than a hand-rolled bitmask and costs nothing extra at this size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipeFlags {
    /// This pipe chain was served from a [`ProcessRule`](crate::compiler::ProcessRule)'s
    /// original (non-cloned) instances; only the first reference to a rule
    /// gets this.
    pub inlined: bool,
    /// No later sibling in the enclosing [`Multiplexer`](crate::multiplexer::Multiplexer)
    /// should be considered after this one matches, within the current pass.
    pub branch_final: bool,
    /// Only considered by the enclosing multiplexer when no non-fallback
    /// sibling matched.
    pub branch_fallback: bool,
    /// Propagated upward: if any child branch sets this, the parent path's
    /// head must too.
    pub hard_flow_control: bool,
    /// This path mutates the message; a [`Multiplexer`] must `clone_cow`
    /// before dispatching to it unless it is the last hop delivered.
    pub clone_on_write: bool,
    /// The multiplexer's hops are logically independent paths (reserved for
    /// future scheduling use; the reference compiler always sets it off).
    pub mpx_independent_paths: bool,
    /// Use this hop's own `hard_flow_control` as the path's flow-control
    /// flag rather than inheriting the caller's.
    pub mpx_flow_ctrl_barrier: bool,
}

/// Per-edge transient parameters threaded through every `queue` call.
/// Rather than an output parameter for whether the path matched, that is
/// returned from [`Pipe::queue`] via [`QueueOutcome`], avoiding a mutable
/// borrow threaded through trait-object calls.
#[derive(Debug, Clone, Copy)]
pub struct PathOptions {
    pub flow_control: bool,
    pub ack_needed: bool,
}

impl PathOptions {
    pub fn new(flow_control: bool, ack_needed: bool) -> Self {
        Self { flow_control, ack_needed }
    }
}

/// What happened to a message after a `queue` call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueOutcome {
    /// Whether this path matched/accepted the message. A
    /// [`Multiplexer`](crate::multiplexer::Multiplexer) reads this to
    /// decide `BRANCH_FINAL`/`BRANCH_FALLBACK` semantics.
    pub matched: bool,
}

impl QueueOutcome {
    pub const MATCHED: QueueOutcome = QueueOutcome { matched: true };
    pub const NOT_MATCHED: QueueOutcome = QueueOutcome { matched: false };
}

/// Upstream signalling delivered through [`Pipe::notify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyCode {
    Close,
    ReadError,
    FileMoved,
    FileEof,
}

/// The common node interface.
///
/// No reference counting here: every `Pipe` lives in a `Box` owned by the
/// `Center`'s arena, so `Drop` frees it, and nothing outside the `Center`
/// ever holds a strong reference to a pipe directly (only a [`PipeId`]) —
/// there is no separate refcount to manage.
pub trait Pipe: Send + Sync {
    /// Compile-time flags; defaults to all-off.
    fn flags(&self) -> PipeFlags {
        PipeFlags::default()
    }

    /// The next pipe in a linear chain, if any. `None` means "end of
    /// chain" — for a path inside a connection that is the point where
    /// delivery is considered complete.
    fn pipe_next(&self) -> Option<PipeId> {
        None
    }

    /// Bring the pipe up. Idempotent; implementations should treat a
    /// second call as a no-op success. Failure does not free the pipe —
    /// ownership stays with the `Center`. Takes `center` so a pipe that
    /// needs to inspect sibling flags at init time (the `Multiplexer`'s
    /// `fallback_exists` scan) can do so without a separate back-channel.
    fn init(&self, center: &Center) -> Result<(), InitError> {
        let _ = center;
        Ok(())
    }

    /// Tear the pipe down. Idempotent; reverse of `init`. Called
    /// best-effort for every pipe even if an earlier one failed.
    fn deinit(&self, center: &Center) {
        let _ = center;
    }

    /// Take ownership of one reference to `msg` and either forward it
    /// (directly or after `clone_cow`), drop it, or fork it to several
    /// hops. The default implementation forwards unchanged to
    /// [`pipe_next`](Pipe::pipe_next), or reports `matched` if there is no
    /// next pipe (end of chain reached successfully).
    fn queue(&self, center: &Center, msg: Message, path: &PathOptions) -> QueueOutcome {
        forward(center, self.pipe_next(), msg, path)
    }

    /// Optional upstream signalling; defaults to forwarding to
    /// `pipe_next`.
    fn notify(&self, center: &Center, sender: PipeId, code: NotifyCode, user_data: Option<&dyn Any>) {
        if let Some(next) = self.pipe_next() {
            center.notify(next, sender, code, user_data);
        }
    }

    /// Short, human-readable kind name for logging/diagnostics.
    fn describe(&self) -> &'static str {
        "pipe"
    }

    /// Append a hop. Only [`Multiplexer`](crate::multiplexer::Multiplexer)
    /// overrides this; every other pipe kind ignores it. Exists as a
    /// trait method (rather than downcasting) so the
    /// [`PipelineCompiler`](crate::compiler::PipelineCompiler) can perform
    /// lazy/late wiring (a per-source multiplexer created on first
    /// reference, then given more hops as later connections or a
    /// `CATCHALL` scan reference the same source) purely through
    /// `PipeId`s, without needing the concrete type back.
    fn add_hop_mut(&mut self, _hop: PipeId) {}

    /// The hops a [`Multiplexer`](crate::multiplexer::Multiplexer) fans
    /// out to, in registration order; every other pipe kind has none. A
    /// read-only counterpart to `add_hop_mut`, for diagnostics and tests
    /// that need to walk the compiled graph without downcasting.
    fn hops(&self) -> &[PipeId] {
        &[]
    }

    /// Set this pipe's `pipe_next`. Most pipe kinds fix `pipe_next` at
    /// construction and never need this; multiplexers acquire theirs after
    /// the remainder of the connection has been compiled.
    fn set_pipe_next_mut(&mut self, _next: PipeId) {}

    /// Overwrite this pipe's flags wholesale. Called by the
    /// [`PipelineCompiler`](crate::compiler::PipelineCompiler) once a
    /// connection's wiring is fully known and the head of the just-compiled
    /// path needs `BRANCH_FALLBACK`/`BRANCH_FINAL`/`CLONE`/
    /// `HARD_FLOW_CONTROL` set retroactively. No-op default for pipe kinds
    /// that fix their flags at construction and are never a path head.
    fn set_flags_mut(&mut self, _flags: PipeFlags) {}

    /// Produce an independent copy of this pipe, including its own storage
    /// (not sharing anything mutable with the original). Required rather
    /// than defaulted: a [`ProcessRule`](crate::compiler::ProcessRule)
    /// deep-clones its template chain for every use-site after the first,
    /// and there is no sensible generic way to do that through a trait
    /// object without the implementor's help.
    fn clone_boxed(&self) -> Box<dyn Pipe>;
}

/// Forward `msg` to `next`, or treat reaching the end of the chain as a
/// successful match. Shared by every `Pipe` impl whose default behavior is
/// to forward unchanged to its successor.
pub fn forward(center: &Center, next: Option<PipeId>, msg: Message, path: &PathOptions) -> QueueOutcome {
    match next {
        Some(id) => center.queue(id, msg, path),
        None => {
            msg.ack(path);
            QueueOutcome::MATCHED
        }
    }
}

/// Drop `msg` without forwarding, balancing its ack accounting first — a
/// pipe must either forward a message or drop it, never leak its ack.
pub fn drop_message(msg: Message, path: &PathOptions) -> QueueOutcome {
    msg.ack(path);
    QueueOutcome::NOT_MATCHED
}
