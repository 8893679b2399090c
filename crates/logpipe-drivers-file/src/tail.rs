//! A minimal `ThreadedSourceDriver` reading newline-delimited records from
//! a growing file: blocking OS calls wrapped by the runtime substrate,
//! applied here to a file handle instead of a socket.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use logpipe_core::driver::{MessageSink, SourceDriver, ThreadedSourceDriver};
use logpipe_core::error::InitError;
use logpipe_core::message::{AckRecord, Message, Window};

/// Tails `path`, posting one [`Message`] per line. The file is allowed to
/// not exist yet at startup (the driver polls for it), and reads resume
/// from whatever offset [`FileTailSource::resume_from`] was given —
/// callers persist [`FileTailSource::offset`] into a
/// [`logpipe_core::persist::PersistStore`] under this driver's
/// [`persist_key`](FileTailSource::persist_key) across restarts.
pub struct FileTailSource {
    path: PathBuf,
    poll_interval: Duration,
    max_line_bytes: Option<usize>,
    offset: AtomicU64,
}

impl FileTailSource {
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self { path: path.into(), poll_interval, max_line_bytes: None, offset: AtomicU64::new(0) }
    }

    /// Truncates any line longer than `max` bytes rather than growing the
    /// message without bound.
    pub fn with_max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = Some(max);
        self
    }

    /// Resumes tailing from a byte offset recorded in a prior run.
    pub fn resume_from(mut self, offset: u64) -> Self {
        *self.offset.get_mut() = offset;
        self
    }

    /// The stable key this driver's position should be persisted under.
    pub fn persist_key(&self) -> String {
        format!("file:{}", self.path.display())
    }

    /// Current read offset, safe to snapshot for persistence at any time
    /// (updated after every successfully posted line, not before).
    pub fn offset(&self) -> u64 {
        self.offset.load(Ordering::Relaxed)
    }

    fn open_at_offset(path: &Path, offset: u64) -> std::io::Result<BufReader<File>> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;
        Ok(BufReader::new(file))
    }
}

impl SourceDriver for FileTailSource {
    fn init(&self) -> Result<(), InitError> {
        Ok(())
    }
}

impl ThreadedSourceDriver for FileTailSource {
    fn run(&self, sink: &dyn MessageSink, window: &Arc<Window>) {
        let mut reader = None;
        let mut line = Vec::new();

        loop {
            if window.exit_requested() {
                return;
            }

            let r = match reader.as_mut() {
                Some(r) => r,
                None => match Self::open_at_offset(&self.path, self.offset()) {
                    Ok(opened) => reader.insert(opened),
                    Err(_) => {
                        thread::sleep(self.poll_interval);
                        continue;
                    }
                },
            };

            line.clear();
            match r.read_until(b'\n', &mut line) {
                Ok(0) => {
                    thread::sleep(self.poll_interval);
                }
                Ok(n) if !line.ends_with(b"\n") => {
                    // A partial line: the writer is mid-append. Rewind so
                    // the next pass re-reads it complete, rather than
                    // splitting one record across two messages.
                    let _ = r.seek(SeekFrom::Current(-(n as i64)));
                    thread::sleep(self.poll_interval);
                }
                Ok(n) => {
                    let trimmed = trim_newline(&line);
                    if !trimmed.is_empty() {
                        if !window.acquire_blocking() {
                            return;
                        }
                        let bytes = match self.max_line_bytes {
                            Some(max) if trimmed.len() > max => &trimmed[..max],
                            _ => trimmed,
                        };
                        let ack = AckRecord::new(window.clone());
                        sink.post(Message::from_source_input(bytes.to_vec(), None, ack));
                    }
                    self.offset.fetch_add(n as u64, Ordering::Relaxed);
                }
                Err(err) => {
                    tracing::warn!(path = %self.path.display(), error = %err, "file tail read error");
                    reader = None;
                    thread::sleep(self.poll_interval);
                }
            }
        }
    }
}

fn trim_newline(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    if end > 0 && line[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && line[end - 1] == b'\r' {
        end -= 1;
    }
    &line[..end]
}
