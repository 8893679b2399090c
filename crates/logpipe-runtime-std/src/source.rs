//! The source half of the threaded worker substrate: each source driver
//! runs on its own thread and hands messages to the single-threaded main
//! loop through a locked queue instead of calling back into it directly.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use logpipe_core::driver::{MessageSink, ThreadedSourceDriver};
use logpipe_core::message::{Message, Window};

/// The per-source handoff point: the worker thread pushes a `Message` onto
/// a locked queue, then notifies the condvar so the main loop's drain
/// wakes up.
pub struct SourceQueue {
    state: Mutex<VecDeque<Message>>,
    condvar: Condvar,
}

impl SourceQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { state: Mutex::new(VecDeque::new()), condvar: Condvar::new() })
    }

    fn push(&self, msg: Message) {
        let mut state = self.state.lock().unwrap();
        state.push_back(msg);
        self.condvar.notify_one();
    }

    /// Drains everything currently queued, blocking until at least one
    /// message is available or `deadline` passes (used by the main loop
    /// to wake up in time for the next scheduled MARK message).
    pub fn drain_until(&self, deadline: Option<Instant>) -> Vec<Message> {
        let mut state = self.state.lock().unwrap();
        loop {
            if !state.is_empty() {
                return state.drain(..).collect();
            }
            match deadline {
                Some(at) => {
                    let now = Instant::now();
                    if now >= at {
                        return Vec::new();
                    }
                    let (guard, timeout) =
                        self.condvar.wait_timeout(state, at - now).unwrap();
                    state = guard;
                    if timeout.timed_out() && state.is_empty() {
                        return Vec::new();
                    }
                }
                None => {
                    state = self.condvar.wait(state).unwrap();
                }
            }
        }
    }
}

struct QueueSink {
    queue: Arc<SourceQueue>,
}

impl MessageSink for QueueSink {
    fn post(&self, msg: Message) {
        self.queue.push(msg);
    }
}

/// One running source driver: its worker thread, the queue it posts into,
/// and the flow-control window that driver's `blocking_post` throttles
/// against.
pub struct SourceRuntime {
    pub queue: Arc<SourceQueue>,
    pub window: Arc<Window>,
    handle: Option<JoinHandle<()>>,
}

impl SourceRuntime {
    /// Spawns `driver.run(...)` on its own OS thread, launched after
    /// configuration load completes.
    pub fn spawn(name: String, driver: Arc<dyn ThreadedSourceDriver>, window: Arc<Window>) -> Self {
        let queue = SourceQueue::new();
        let sink = QueueSink { queue: queue.clone() };
        let thread_window = window.clone();
        let handle = thread::Builder::new()
            .name(format!("logpipe-source-{name}"))
            .spawn(move || {
                if let Err(err) = driver.init() {
                    tracing::error!(source = %name, error = %err, "source driver failed to initialize");
                    return;
                }
                driver.run(&sink, &thread_window);
                driver.deinit();
            })
            .expect("failed to spawn source worker thread");

        Self { queue, window, handle: Some(handle) }
    }

    /// Cooperative shutdown: wake the worker's window so a blocked
    /// `blocking_post` returns, then join its thread.
    pub fn request_exit(&mut self) {
        self.window.request_exit();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SourceRuntime {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.request_exit();
        }
    }
}

/// How long the main loop should wait on a source queue before checking
/// the mark timer again, when there is no pending mark deadline at all.
pub const NO_TRAFFIC_POLL_INTERVAL: Duration = Duration::from_secs(1);
