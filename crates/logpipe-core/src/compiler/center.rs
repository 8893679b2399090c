//! The compiled, runtime form of a [`Configuration`](crate::compiler::Configuration).

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ConfigError;
use crate::message::Message;
use crate::pipe::{NotifyCode, PathOptions, Pipe, PipeFlags, PipeId, QueueOutcome};

/// The "received"/"queued" counters registered per pipe. The full
/// statistics subsystem (naming, export, aggregation) is a separate
/// concern; this is just enough bookkeeping for the registration
/// discipline below, and for tests to assert on.
#[derive(Default)]
pub struct StatsCounters {
    pub received: AtomicU64,
    pub queued: AtomicU64,
}

#[derive(Default)]
struct StatsRegistry {
    counters: HashMap<PipeId, Arc<StatsCounters>>,
}

/// The compiled graph: a flat arena of every [`Pipe`] the
/// [`PipelineCompiler`](crate::compiler::PipelineCompiler) produced, in
/// insertion order, addressed by [`PipeId`].
///
/// `push`/`set_pipe_next`/`add_hop`/`set_flags` are only ever called while a
/// single compiler holds `&mut Center` during compilation; once compiled,
/// a `Center` is shared (typically behind an `Arc`) and only the `&self`
/// runtime methods (`queue`, `flags`, `notify`) are used, which is why
/// those don't need interior mutability anywhere.
pub struct Center {
    pipes: Vec<Box<dyn Pipe>>,
    stats: Mutex<StatsRegistry>,
}

impl Center {
    pub(crate) fn new() -> Self {
        Self { pipes: Vec::new(), stats: Mutex::new(StatsRegistry::default()) }
    }

    pub(crate) fn push(&mut self, pipe: Box<dyn Pipe>) -> PipeId {
        let id = PipeId(self.pipes.len() as u32);
        self.pipes.push(pipe);
        id
    }

    pub(crate) fn set_pipe_next(&mut self, id: PipeId, next: PipeId) {
        self.pipes[id.index()].set_pipe_next_mut(next);
    }

    pub(crate) fn add_hop(&mut self, mux: PipeId, hop: PipeId) {
        self.pipes[mux.index()].add_hop_mut(hop);
    }

    pub(crate) fn set_flags(&mut self, id: PipeId, flags: PipeFlags) {
        self.pipes[id.index()].set_flags_mut(flags);
    }

    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    pub fn flags(&self, id: PipeId) -> PipeFlags {
        self.pipes[id.index()].flags()
    }

    pub fn pipe(&self, id: PipeId) -> &dyn Pipe {
        &*self.pipes[id.index()]
    }

    /// The hops a multiplexer at `id` fans out to; empty for any other
    /// pipe kind. A read-only diagnostic counterpart to the compiler's
    /// own `add_hop`.
    pub fn hops(&self, id: PipeId) -> &[PipeId] {
        self.pipes[id.index()].hops()
    }

    /// Dispatch one message into pipe `id`. This is the recursive hot path:
    /// every `Pipe::queue`/`forward`/`Multiplexer::queue` implementation
    /// calls back into this to reach the next node.
    pub fn queue(&self, id: PipeId, msg: Message, path: &PathOptions) -> QueueOutcome {
        if let Some(counters) = self.stats.lock().counters.get(&id) {
            counters.received.fetch_add(1, Ordering::Relaxed);
        }
        let outcome = self.pipes[id.index()].queue(self, msg, path);
        if outcome.matched {
            if let Some(counters) = self.stats.lock().counters.get(&id) {
                counters.queued.fetch_add(1, Ordering::Relaxed);
            }
        }
        outcome
    }

    pub fn notify(&self, id: PipeId, sender: PipeId, code: NotifyCode, user_data: Option<&dyn Any>) {
        self.pipes[id.index()].notify(self, sender, code, user_data);
    }

    /// Runs `init()` on every pipe in insertion order. A counter pair is
    /// registered for each pipe while holding `stats_lock` around the
    /// registration itself, rather than racing an unlocked insert against
    /// a concurrent reader of `stats_for`.
    pub fn reinit(&self) -> Result<(), ConfigError> {
        for (idx, pipe) in self.pipes.iter().enumerate() {
            let id = PipeId(idx as u32);
            pipe.init(self).map_err(|source| ConfigError::Init {
                pipe: format!("{}#{}", pipe.describe(), idx),
                source,
            })?;
            let mut stats = self.stats.lock();
            stats.counters.insert(id, Arc::new(StatsCounters::default()));
        }
        Ok(())
    }

    /// Runs `deinit()` on every pipe, best-effort: every pipe is attempted
    /// even if an earlier one already failed elsewhere — there is no
    /// partial-cleanup path.
    pub fn deinit(&self) {
        for (idx, pipe) in self.pipes.iter().enumerate() {
            pipe.deinit(self);
            let mut stats = self.stats.lock();
            stats.counters.remove(&PipeId(idx as u32));
        }
    }

    pub fn stats_for(&self, id: PipeId) -> Option<Arc<StatsCounters>> {
        self.stats.lock().counters.get(&id).cloned()
    }
}
