//! The `ProcessRule`/`ProcessPipe` machinery backing filter, parser and
//! rewrite endpoints.
//!
//! The filter expression language and parser/rewriter implementations
//! themselves are configuration-grammar concerns and deliberately not this
//! crate's job; what the core owns is the node shape a concrete filter,
//! parser or rewriter plugs into — flags, chaining, and the
//! clone-before-mutate contract — exposed here as a small closure-based
//! [`ProcessOp`] so the reference driver/CLI crates (or tests) can supply
//! real behavior without the core depending on any particular expression
//! syntax.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::compiler::Center;
use crate::message::Message;
use crate::pipe::{drop_message, forward, PathOptions, Pipe, PipeFlags, PipeId, QueueOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessKind {
    Filter,
    Parser,
    Rewrite,
}

/// What a [`ProcessPipe`] does to a message passing through it.
#[derive(Clone)]
pub enum ProcessOp {
    /// Keep the message iff the predicate returns `true`; otherwise drop
    /// it — a pipe must either forward a message or drop it.
    Filter(Arc<dyn Fn(&Message) -> bool + Send + Sync>),
    /// Mutate the message in place. The pipe always `clone_cow`s first, so
    /// the closure never has to think about sharing.
    Transform(Arc<dyn Fn(&mut Message) + Send + Sync>),
}

/// The concrete `Pipe` kind behind every filter, parser and rewrite
/// endpoint.
pub struct ProcessPipe {
    kind: ProcessKind,
    flags: PipeFlags,
    pipe_next: Option<PipeId>,
    op: ProcessOp,
}

impl ProcessPipe {
    pub fn new(kind: ProcessKind, flags: PipeFlags, op: ProcessOp) -> Self {
        Self { kind, flags, pipe_next: None, op }
    }

    pub fn kind(&self) -> ProcessKind {
        self.kind
    }
}

impl Pipe for ProcessPipe {
    fn flags(&self) -> PipeFlags {
        self.flags
    }

    fn pipe_next(&self) -> Option<PipeId> {
        self.pipe_next
    }

    fn describe(&self) -> &'static str {
        match self.kind {
            ProcessKind::Filter => "filter",
            ProcessKind::Parser => "parser",
            ProcessKind::Rewrite => "rewrite",
        }
    }

    fn set_pipe_next_mut(&mut self, next: PipeId) {
        self.pipe_next = Some(next);
    }

    fn set_flags_mut(&mut self, flags: PipeFlags) {
        self.flags = flags;
    }

    fn queue(&self, center: &Center, msg: Message, path: &PathOptions) -> QueueOutcome {
        match &self.op {
            ProcessOp::Filter(predicate) => {
                if predicate(&msg) {
                    forward(center, self.pipe_next, msg, path)
                } else {
                    drop_message(msg, path)
                }
            }
            ProcessOp::Transform(transform) => {
                let mut msg = msg.clone_cow(path);
                transform(&mut msg);
                forward(center, self.pipe_next, msg, path)
            }
        }
    }

    fn clone_boxed(&self) -> Box<dyn Pipe> {
        Box::new(ProcessPipe {
            kind: self.kind,
            flags: self.flags,
            pipe_next: self.pipe_next,
            op: self.op.clone(),
        })
    }
}

/// A named, reusable pipe chain backing a filter, parser or rewrite block.
///
/// A design where the first reference takes the original pipes and later
/// references deep-clone the chain cannot be rendered literally in safe
/// Rust: a `Box<dyn Pipe>` moved into the first use-site's [`Center`] arena
/// is gone, so a later use-site would have nothing left to clone from.
/// Instead the template chain stays permanently owned by the rule, and a
/// `clone_boxed` copy is produced for *every* use-site, including the
/// first — preserving the only externally observable part of the
/// distinction, the `inlined` flag on the head pipe of the first use
/// (recorded in `DESIGN.md`).
pub struct ProcessRule {
    name: String,
    kind: ProcessKind,
    template: Vec<Box<dyn Pipe>>,
    used: AtomicBool,
}

impl ProcessRule {
    pub fn new(name: impl Into<String>, kind: ProcessKind, template: Vec<Box<dyn Pipe>>) -> Self {
        Self { name: name.into(), kind, template, used: AtomicBool::new(false) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ProcessKind {
        self.kind
    }

    /// Produce one use-site's chain: a fresh clone of every template pipe,
    /// in order, with `inlined` set on the head iff this is the first call.
    pub fn instantiate(&self) -> Vec<Box<dyn Pipe>> {
        let first_use = !self.used.swap(true, Ordering::AcqRel);
        let mut chain: Vec<Box<dyn Pipe>> = self.template.iter().map(|p| p.clone_boxed()).collect();
        if first_use {
            if let Some(head) = chain.first_mut() {
                let mut flags = head.flags();
                flags.inlined = true;
                head.set_flags_mut(flags);
            }
        }
        chain
    }
}
