//! The destination half of the threaded worker substrate: a dedicated
//! thread owns the driver, pulls queued messages off a bounded channel,
//! and batches/flushes/acks them without blocking whatever is dispatching
//! into it beyond the inbox's own back-pressure.

use std::sync::mpsc::{sync_channel, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use logpipe_core::driver::DestinationDriver;
use logpipe_core::message::Message;
use logpipe_core::pipe::PathOptions;
use logpipe_core::worker::{FlushMode, FlushOutcome};

/// One queued unit of work for a destination worker: the message plus the
/// `PathOptions` its ack must be released against.
struct Inbound {
    msg: Message,
    path: PathOptions,
}

/// A running destination driver: its bounded inbox and worker thread.
/// Messages handed to `insert` accumulate into a batch on the worker
/// thread and are flushed either once `flush_lines` inserts have piled up
/// or after a timeout with no new arrivals.
pub struct DestinationRuntime {
    inbox: Option<SyncSender<Inbound>>,
    handle: Option<JoinHandle<()>>,
}

impl DestinationRuntime {
    /// Spawns the worker loop. `queue_depth` bounds the inbox; `flush_lines`
    /// batches that many inserts before
    /// forcing a flush; `time_reopen` is the reconnect backoff applied
    /// after a `NotConnected`/`Error` outcome.
    pub fn spawn(
        name: String,
        driver: Arc<dyn DestinationDriver>,
        queue_depth: usize,
        flush_lines: u32,
        time_reopen: Duration,
    ) -> Self {
        let (inbox, rx) = sync_channel::<Inbound>(queue_depth.max(1));

        let handle = thread::Builder::new()
            .name(format!("logpipe-destination-{name}"))
            .spawn(move || {
                if let Err(err) = driver.init() {
                    tracing::error!(destination = %name, error = %err, "destination driver failed to initialize");
                    return;
                }
                if driver.connect().is_err() {
                    tracing::warn!(destination = %name, "initial connect failed; will retry on first insert");
                }

                let mut batch: Vec<Inbound> = Vec::new();
                loop {
                    match rx.recv_timeout(Duration::from_millis(500)) {
                        Ok(inbound) => {
                            let outcome = driver.insert(inbound.msg.clone());
                            batch.push(inbound);
                            if batch.len() as u32 >= flush_lines.max(1) {
                                let flushed = driver.flush(FlushMode::ThresholdReached);
                                settle(&driver, &name, flushed, &mut batch, time_reopen);
                            } else {
                                settle(&driver, &name, outcome, &mut batch, time_reopen);
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            if !batch.is_empty() {
                                let flushed = driver.flush(FlushMode::Timeout);
                                settle(&driver, &name, flushed, &mut batch, time_reopen);
                            }
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }

                if !batch.is_empty() {
                    let flushed = driver.flush(FlushMode::Explicit);
                    settle(&driver, &name, flushed, &mut batch, time_reopen);
                }
                driver.disconnect();
                driver.deinit();
            })
            .expect("failed to spawn destination worker thread");

        Self { inbox: Some(inbox), handle: Some(handle) }
    }

    /// Enqueues one message for this destination. Blocks if the inbox is
    /// full (back-pressure from the destination onto whatever is
    /// dispatching into it — typically a `Multiplexer`'s `queue` call).
    pub fn insert(&self, msg: Message, path: PathOptions) {
        if let Some(inbox) = &self.inbox {
            let _ = inbox.send(Inbound { msg, path });
        }
    }

    /// Closes the inbox and joins the worker thread. Dropping `inbox`
    /// first is what lets the worker's `recv_timeout` loop observe
    /// `RecvTimeoutError::Disconnected` and return; joining first would
    /// deadlock forever since the channel would still have a live sender.
    pub fn shutdown(&mut self) {
        self.inbox.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DestinationRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Applies one `FlushOutcome` to the current batch, acking and clearing
/// it whenever it resolves either way
/// (`Success` or the permanent `Drop`), and backing off before the next
/// attempt on a transient failure.
fn settle(
    driver: &Arc<dyn DestinationDriver>,
    name: &str,
    outcome: FlushOutcome,
    batch: &mut Vec<Inbound>,
    time_reopen: Duration,
) {
    match outcome {
        FlushOutcome::Queued => {}
        FlushOutcome::Success => {
            for inbound in batch.drain(..) {
                inbound.msg.ack(&inbound.path);
            }
        }
        FlushOutcome::NotConnected | FlushOutcome::Error => {
            tracing::warn!(destination = %name, ?outcome, "transient failure, backing off before retry");
            thread::sleep(time_reopen);
            let _ = driver.connect();
        }
        FlushOutcome::Drop => {
            tracing::error!(destination = %name, "permanent failure, dropping batch and acking so sources are not stuck");
            for inbound in batch.drain(..) {
                inbound.msg.ack(&inbound.path);
            }
        }
    }
}
