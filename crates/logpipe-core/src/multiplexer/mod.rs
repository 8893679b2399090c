//! Fan-out node: the single most important routine in the runtime, since
//! it decides how one incoming message turns into delivery across
//! potentially several downstream paths.

use std::sync::OnceLock;

use crate::compiler::Center;
use crate::error::InitError;
use crate::message::Message;
use crate::pipe::{forward, PathOptions, Pipe, PipeFlags, PipeId, QueueOutcome};

/// A `Pipe` that forwards one incoming message to some subset of a
/// `next_hops` list, then forwards once more to its own `pipe_next` — this
/// lets multiplexers chain, which is how nested `InlinePipe` connections
/// and destination groups compose.
pub struct Multiplexer {
    flags: PipeFlags,
    pipe_next: Option<PipeId>,
    next_hops: Vec<PipeId>,
    fallback_exists: OnceLock<bool>,
}

impl Multiplexer {
    pub fn new(flags: PipeFlags) -> Self {
        Self { flags, pipe_next: None, next_hops: Vec::new(), fallback_exists: OnceLock::new() }
    }

    /// Append a hop. Hops are visited in the order added, which is also
    /// the order endpoints appeared in the compiled connection.
    pub fn add_next_hop(&mut self, pipe: PipeId) {
        self.next_hops.push(pipe);
    }

    pub fn set_pipe_next(&mut self, pipe: PipeId) {
        self.pipe_next = Some(pipe);
    }

    pub fn next_hops(&self) -> &[PipeId] {
        &self.next_hops
    }

    pub fn fallback_exists(&self) -> bool {
        *self.fallback_exists.get().unwrap_or(&false)
    }
}

impl Pipe for Multiplexer {
    fn flags(&self) -> PipeFlags {
        self.flags
    }

    fn pipe_next(&self) -> Option<PipeId> {
        self.pipe_next
    }

    fn describe(&self) -> &'static str {
        "multiplexer"
    }

    fn add_hop_mut(&mut self, hop: PipeId) {
        self.add_next_hop(hop);
    }

    fn hops(&self) -> &[PipeId] {
        &self.next_hops
    }

    fn set_pipe_next_mut(&mut self, next: PipeId) {
        self.set_pipe_next(next);
    }

    fn set_flags_mut(&mut self, flags: PipeFlags) {
        self.flags = flags;
    }

    /// A cloned multiplexer starts with a fresh, uncomputed
    /// `fallback_exists` — it has not gone through `init()` yet, so there
    /// is nothing meaningful to copy.
    fn clone_boxed(&self) -> Box<dyn Pipe> {
        Box::new(Multiplexer {
            flags: self.flags,
            pipe_next: self.pipe_next,
            next_hops: self.next_hops.clone(),
            fallback_exists: OnceLock::new(),
        })
    }

    /// Scans `next_hops` and records whether any of them carries
    /// `BRANCH_FALLBACK`. A multiplexer's own `init` never fails; only a
    /// hop's `init` failing aborts compilation.
    fn init(&self, center: &Center) -> Result<(), InitError> {
        let any_fallback = self.next_hops.iter().any(|&hop| center.flags(hop).branch_fallback);
        let _ = self.fallback_exists.set(any_fallback);
        Ok(())
    }

    fn queue(&self, center: &Center, msg: Message, path: &PathOptions) -> QueueOutcome {
        let fallback_exists = self.fallback_exists();
        let mut delivered = false;

        for pass_is_fallback in [false, true] {
            if pass_is_fallback && (!fallback_exists || delivered) {
                break;
            }

            let visiting: Vec<PipeId> = self
                .next_hops
                .iter()
                .copied()
                .filter(|&hop| center.flags(hop).branch_fallback == pass_is_fallback)
                .collect();

            let mut iter = visiting.into_iter().peekable();
            while let Some(hop) = iter.next() {
                let hop_flags = center.flags(hop);
                let is_last_hop_of_pass = iter.peek().is_none();

                let local_flow_control = if hop_flags.mpx_flow_ctrl_barrier {
                    hop_flags.hard_flow_control
                } else {
                    path.flow_control
                };
                let local = PathOptions::new(local_flow_control, true);

                msg.add_ack(&local);

                // Conservative clone-elision: we only know this is
                // unambiguously the very last delivery (safe to hand over
                // our own reference outright) when this pass cannot be
                // followed by another — i.e. it's the fallback pass, or
                // it's the normal pass and no fallback pass can run at
                // all. The ambiguous case (last hop of the normal pass
                // when a fallback pass *might* still run) always forks a
                // copy; that costs one extra clone in a case that could
                // sometimes be avoided, never a correctness difference.
                let pass_is_terminal = pass_is_fallback || !fallback_exists;
                let is_last_overall = is_last_hop_of_pass && pass_is_terminal && self.pipe_next.is_none();

                // `fork_owned`, not `clone_cow`: this loop keeps dispatching
                // its own `msg` to the remaining hops and to `pipe_next`
                // below, so a hop that mutates must get a deep, independent
                // copy rather than a handle that still aliases ours.
                let outcome = if !is_last_overall && hop_flags.clone_on_write {
                    center.queue(hop, msg.fork_owned(&local), &local)
                } else {
                    center.queue(hop, msg.clone(), &local)
                };

                if outcome.matched {
                    delivered = true;
                    if hop_flags.branch_final {
                        break;
                    }
                }
            }
        }

        forward(center, self.pipe_next, msg, path)
    }
}

#[cfg(test)]
mod tests;
