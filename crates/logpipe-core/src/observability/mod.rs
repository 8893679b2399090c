//! Structured logging facade.
//!
//! Diagnostics about pipeline compilation, init/deinit transitions,
//! flow-control state changes, transport retries and mark emission go
//! through `tracing` events and spans, never `println!`. On top of that,
//! this module exposes a small [`LogRecord`]/[`LogSeverity`] shape plus an
//! [`InternalLogSink`] so a destination that wants to log *about the
//! pipeline itself* (an internal diagnostics sink, not the operator's own
//! log aggregator) can consume these events without depending on
//! `tracing`'s own subscriber machinery.

use std::sync::OnceLock;

use arc_swap::ArcSwapOption;

/// Severity of an internal diagnostic event. Deliberately a small, closed
/// set rather than mirroring `tracing::Level` one-to-one: callers pick one
/// of these, the facade maps it onto the right `tracing` macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// One internal diagnostic event. Carries a flat field list rather than an
/// arbitrary structured payload — every consumer-facing sink this core
/// ships with (tests, the reference CLI) only ever needs to print or
/// assert on it, not re-serialize it generically.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub severity: LogSeverity,
    pub target: &'static str,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl LogRecord {
    pub fn new(severity: LogSeverity, target: &'static str, message: impl Into<String>) -> Self {
        Self { severity, target, message: message.into(), fields: Vec::new() }
    }

    pub fn with_field(mut self, key: &'static str, value: impl ToString) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }
}

/// A sink for internal diagnostic events, independent of whatever
/// `tracing` subscriber the process has installed.
pub trait InternalLogSink: Send + Sync {
    fn on_log(&self, record: &LogRecord);
}

fn sink_slot() -> &'static ArcSwapOption<dyn InternalLogSink> {
    static SLOT: OnceLock<ArcSwapOption<dyn InternalLogSink>> = OnceLock::new();
    SLOT.get_or_init(|| ArcSwapOption::from(None))
}

/// Installs (or clears, with `None`) the process-wide internal diagnostics
/// sink. Last writer wins; intended to be called once at startup by
/// whichever binary wires up an internal diagnostics destination.
pub fn set_internal_sink(sink: Option<std::sync::Arc<dyn InternalLogSink>>) {
    sink_slot().store(sink);
}

/// Emits `record` through `tracing` at the matching level, and to the
/// installed [`InternalLogSink`] if one is present. Every module in this
/// crate that needs to log routes through this rather than calling
/// `tracing::*!` macros with ad hoc field sets, so the two never drift.
pub fn emit(record: LogRecord) {
    let fields = format_fields(&record.fields);
    match record.severity {
        LogSeverity::Debug => tracing::debug!(target: record.target, message = %record.message, fields = %fields),
        LogSeverity::Info => tracing::info!(target: record.target, message = %record.message, fields = %fields),
        LogSeverity::Warning => tracing::warn!(target: record.target, message = %record.message, fields = %fields),
        LogSeverity::Error => tracing::error!(target: record.target, message = %record.message, fields = %fields),
    }
    if let Some(sink) = sink_slot().load_full() {
        sink.on_log(&record);
    }
}

/// `tracing`'s macros need statically-named fields, so a dynamically-sized
/// field list can't be recorded one key at a time; fold it into a single
/// `key=value ...` string field instead.
fn format_fields(fields: &[(&'static str, String)]) -> String {
    fields.iter().map(|(key, value)| format!("{key}={value}")).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct CollectingSink(Mutex<Vec<LogRecord>>);

    impl InternalLogSink for CollectingSink {
        fn on_log(&self, record: &LogRecord) {
            self.0.lock().unwrap().push(record.clone());
        }
    }

    #[test]
    fn installed_sink_receives_emitted_records() {
        let sink = Arc::new(CollectingSink(Mutex::new(Vec::new())));
        set_internal_sink(Some(sink.clone()));

        emit(LogRecord::new(LogSeverity::Warning, "compiler", "retrying").with_field("attempt", 1));

        let seen = sink.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].message, "retrying");

        set_internal_sink(None);
    }
}
