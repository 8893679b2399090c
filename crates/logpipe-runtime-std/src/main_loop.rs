//! The single-threaded cooperative main loop: hosts all graph traversal,
//! draining per-source queues and firing the mark timer. Scheduling is
//! hybrid — worker threads push I/O off this loop, but every dispatch into
//! the compiled graph happens here, one message at a time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use logpipe_core::compiler::Center;
use logpipe_core::message::Message;
use logpipe_core::pipe::{PathOptions, PipeId};

use crate::source::{SourceRuntime, NO_TRAFFIC_POLL_INTERVAL};

/// Drives the compiled graph: for each pass, every source queue with
/// pending messages is drained and fed into `Center::queue`; a synthetic
/// mark message is injected at `mark_source` whenever `mark_freq` elapses
/// with no intervening traffic.
pub struct MainLoop {
    center: Arc<Center>,
    sources: HashMap<PipeId, SourceRuntime>,
    mark_source: Option<PipeId>,
    mark_freq: Option<Duration>,
    last_message_at: Instant,
    running: bool,
}

impl MainLoop {
    pub fn new(
        center: Arc<Center>,
        sources: HashMap<PipeId, SourceRuntime>,
        mark_source: Option<PipeId>,
        mark_freq: Option<Duration>,
    ) -> Self {
        Self { center, sources, mark_source, mark_freq, last_message_at: Instant::now(), running: true }
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Runs until `stop()` is called from another thread (via a shared
    /// flag the caller sets up) or, in tests, a fixed number of passes.
    pub fn run_once(&mut self) {
        let deadline = self.mark_deadline();

        let mut any_drained = false;
        for (&source_id, runtime) in self.sources.iter() {
            let messages = runtime.queue.drain_until(deadline);
            for msg in messages {
                any_drained = true;
                self.dispatch(source_id, msg);
            }
        }

        if !any_drained {
            if let (Some(mark_source), Some(freq)) = (self.mark_source, self.mark_freq) {
                if self.last_message_at.elapsed() >= freq {
                    self.dispatch(mark_source, Message::new_mark());
                }
            } else {
                std::thread::sleep(NO_TRAFFIC_POLL_INTERVAL.min(Duration::from_millis(50)));
            }
        }
    }

    pub fn run(&mut self) {
        while self.running {
            self.run_once();
        }
    }

    fn dispatch(&mut self, source_id: PipeId, msg: Message) {
        self.last_message_at = Instant::now();
        let path = PathOptions::new(false, msg.ack_record().is_some());
        self.center.queue(source_id, msg, &path);
    }

    fn mark_deadline(&self) -> Option<Instant> {
        self.mark_freq.map(|freq| {
            let elapsed = self.last_message_at.elapsed();
            if elapsed >= freq {
                Instant::now()
            } else {
                self.last_message_at + freq
            }
        })
    }

    pub fn request_all_sources_exit(&mut self) {
        for runtime in self.sources.values_mut() {
            runtime.request_exit();
        }
    }
}
