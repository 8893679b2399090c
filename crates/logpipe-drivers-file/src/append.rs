//! A minimal `DestinationDriver` batching writes to a file: `insert` only
//! buffers, `flush` is what actually touches the transport (here, the
//! filesystem) and is the only place that can produce
//! `NotConnected`/`Error`/`Drop`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use logpipe_core::driver::DestinationDriver;
use logpipe_core::error::{CoreError, ErrorCategory, InitError};
use logpipe_core::message::Message;
use logpipe_core::worker::{FlushMode, FlushOutcome};

struct State {
    file: Option<File>,
    buffer: Vec<u8>,
}

/// Appends each message's `MESSAGE` field, newline-terminated, to `path`.
/// `connect`/`disconnect` open and close the handle; a transient I/O error
/// on `flush` drops the handle so the next `connect` reopens it (this is
/// what makes `time_reopen` meaningful for a destination whose transport
/// is a local file: log rotation by an external tool, or the containing
/// directory disappearing and coming back).
pub struct FileAppendDestination {
    path: PathBuf,
    state: Mutex<State>,
}

impl FileAppendDestination {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), state: Mutex::new(State { file: None, buffer: Vec::new() }) }
    }
}

impl DestinationDriver for FileAppendDestination {
    fn init(&self) -> Result<(), InitError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(InitError::new(format!(
                    "parent directory {} does not exist",
                    parent.display()
                )));
            }
        }
        Ok(())
    }

    fn connect(&self) -> Result<(), CoreError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| {
                CoreError::new("file_append_open_failed", "failed to open destination file", ErrorCategory::Retryable)
                    .with_cause(err)
            })?;
        self.state.lock().unwrap().file = Some(file);
        Ok(())
    }

    fn disconnect(&self) {
        self.state.lock().unwrap().file = None;
    }

    fn insert(&self, msg: Message) -> FlushOutcome {
        let mut state = self.state.lock().unwrap();
        if let Some(Some(bytes)) = msg.get("MESSAGE").map(|v| v.as_bytes()) {
            state.buffer.extend_from_slice(bytes);
            state.buffer.push(b'\n');
        }
        FlushOutcome::Queued
    }

    fn flush(&self, _mode: FlushMode) -> FlushOutcome {
        let mut state = self.state.lock().unwrap();
        if state.buffer.is_empty() {
            return FlushOutcome::Success;
        }
        let Some(file) = state.file.as_mut() else {
            return FlushOutcome::NotConnected;
        };
        match file.write_all(&state.buffer).and_then(|_| file.flush()) {
            Ok(()) => {
                state.buffer.clear();
                FlushOutcome::Success
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "destination file write failed");
                state.file = None;
                FlushOutcome::Error
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logpipe_core::message::Value;
    use std::fs;

    fn msg_with(text: &str) -> Message {
        let mut msg = Message::new_empty();
        msg.set("MESSAGE", Value::Bytes(text.as_bytes().to_vec()));
        msg
    }

    #[test]
    fn insert_buffers_and_flush_writes_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let dest = FileAppendDestination::new(&path);
        dest.init().unwrap();
        dest.connect().unwrap();

        assert_eq!(dest.insert(msg_with("one")), FlushOutcome::Queued);
        assert_eq!(dest.insert(msg_with("two")), FlushOutcome::Queued);
        assert_eq!(dest.flush(FlushMode::Explicit), FlushOutcome::Success);

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "one\ntwo\n");
    }

    #[test]
    fn flush_with_nothing_buffered_is_a_no_op_success() {
        let dir = tempfile::tempdir().unwrap();
        let dest = FileAppendDestination::new(dir.path().join("empty.log"));
        dest.connect().unwrap();
        assert_eq!(dest.flush(FlushMode::Timeout), FlushOutcome::Success);
    }

    #[test]
    fn flush_before_connect_reports_not_connected() {
        let dir = tempfile::tempdir().unwrap();
        let dest = FileAppendDestination::new(dir.path().join("later.log"));
        dest.insert(msg_with("buffered before connect"));
        assert_eq!(dest.flush(FlushMode::ThresholdReached), FlushOutcome::NotConnected);
    }

    #[test]
    fn init_rejects_a_missing_parent_directory() {
        let dest = FileAppendDestination::new("/nonexistent-dir-xyz/out.log");
        assert!(dest.init().is_err());
    }
}
