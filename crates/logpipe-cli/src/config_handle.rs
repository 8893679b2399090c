//! A reload builds a new `Center` and atomically swaps it in: the currently
//! active, compiled [`Center`] lives behind an [`arc_swap::ArcSwap`],
//! readable by any thread without taking a lock.
//!
//! `ConfigHandle` only publishes the graph itself. The worker threads that
//! feed it (`SourceRuntime`/`DestinationRuntime`, owned by `main`'s
//! `MainLoop`) are re-homed by `main` directly after a successful publish —
//! re-running the whole `MainLoop`/`SourceRuntime` fleet under a single
//! control thread is simpler to reason about than threading a second
//! swappable handle through every worker, and that single control thread is
//! the only place `MainLoop::run_once` is ever called from anyway.

use std::sync::Arc;

use arc_swap::ArcSwap;
use logpipe_core::compiler::Center;

pub struct ConfigHandle {
    current: ArcSwap<Center>,
}

impl ConfigHandle {
    pub fn new(center: Arc<Center>) -> Self {
        Self { current: ArcSwap::new(center) }
    }

    pub fn current(&self) -> Arc<Center> {
        self.current.load_full()
    }

    /// Publishes `center` as the active graph, returning the previous one.
    /// The caller is responsible for calling [`Center::deinit`] on it once
    /// the old `MainLoop`/worker fleet has been retired — that retirement
    /// (requesting every source thread to exit, then dropping the old
    /// `Center` so its destination runtimes flush and join) is a property
    /// of the caller's shutdown sequence, not of this handle, so it isn't
    /// done automatically on publish.
    pub fn publish(&self, center: Arc<Center>) -> Arc<Center> {
        self.current.swap(center)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logpipe_core::compiler::{Configuration, GlobalOptions, PipelineCompiler};

    #[test]
    fn publish_returns_the_previously_active_center_and_installs_the_new_one() {
        let first = Arc::new(PipelineCompiler::compile(Configuration::new(GlobalOptions::default())).unwrap().center);
        let handle = ConfigHandle::new(first.clone());
        let first_ptr = Arc::as_ptr(&handle.current());

        let second = Arc::new(PipelineCompiler::compile(Configuration::new(GlobalOptions::default())).unwrap().center);
        let old = handle.publish(second);

        assert_eq!(Arc::as_ptr(&old), first_ptr);
        assert_ne!(Arc::as_ptr(&handle.current()), first_ptr);
        old.deinit();
    }
}
