//! The configuration surface the core consumes.
//!
//! `Configuration` is deliberately not `serde::Deserialize` as a whole: its
//! sources and destinations are live `Box<dyn Pipe>` driver instances, and
//! constructing those from a name is a driver-registry concern owned by
//! whatever binary assembles a `Configuration` (`logpipe-cli`), not by the
//! core. [`GlobalOptions`] — the scalar knobs the core itself reads — is the
//! part that *is* deserialized directly from TOML.

use std::collections::HashMap;
use std::time::Duration;

use crate::compiler::{Connection, ProcessRule};
use crate::pipe::Pipe;

/// Global knobs consumed by the core. `flush_timeout`/`time_reopen` are
/// exposed as `Duration`-backed accessors rather than raw integers so
/// downstream workers never have to remember the unit.
#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(default)]
pub struct GlobalOptions {
    /// Seconds between synthetic MARK messages; zero disables.
    pub mark_freq_secs: u64,
    pub flush_lines: u32,
    pub flush_timeout_ms: u64,
    pub time_reopen_secs: u64,
    pub log_fifo_size: u32,
    pub log_fetch_limit: u32,
    /// Source flow-control window size.
    pub log_iw_size: i64,
    pub log_msg_size: u32,
}

impl Default for GlobalOptions {
    fn default() -> Self {
        Self {
            mark_freq_secs: 0,
            flush_lines: 1,
            flush_timeout_ms: 10_000,
            time_reopen_secs: 10,
            log_fifo_size: 1000,
            log_fetch_limit: 10,
            log_iw_size: 100,
            log_msg_size: 8192,
        }
    }
}

impl GlobalOptions {
    /// Loads the `[options]` table of a TOML configuration document. The
    /// surrounding config grammar (sources/destinations/connections syntax)
    /// is a binary-level concern, not this crate's — see `logpipe-cli`.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        #[derive(serde::Deserialize)]
        struct Document {
            #[serde(default)]
            options: GlobalOptions,
        }
        let document: Document = toml::from_str(text)?;
        Ok(document.options)
    }

    pub fn mark_freq(&self) -> Option<Duration> {
        (self.mark_freq_secs > 0).then(|| Duration::from_secs(self.mark_freq_secs))
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }

    pub fn time_reopen(&self) -> Duration {
        Duration::from_secs(self.time_reopen_secs)
    }
}

/// The owning container of a compile unit. Lifetime envelopes the
/// [`Center`](crate::compiler::Center) the
/// [`PipelineCompiler`](crate::compiler::PipelineCompiler) produces from it.
#[derive(Default)]
pub struct Configuration {
    pub sources: HashMap<String, Box<dyn Pipe>>,
    pub destinations: HashMap<String, Box<dyn Pipe>>,
    pub filters: HashMap<String, ProcessRule>,
    pub parsers: HashMap<String, ProcessRule>,
    pub rewriters: HashMap<String, ProcessRule>,
    pub connections: Vec<Connection>,
    pub options: GlobalOptions,
}

impl Configuration {
    pub fn new(options: GlobalOptions) -> Self {
        Self { options, ..Default::default() }
    }

    pub fn add_source(&mut self, name: impl Into<String>, pipe: Box<dyn Pipe>) -> &mut Self {
        self.sources.insert(name.into(), pipe);
        self
    }

    pub fn add_destination(&mut self, name: impl Into<String>, pipe: Box<dyn Pipe>) -> &mut Self {
        self.destinations.insert(name.into(), pipe);
        self
    }

    pub fn add_filter(&mut self, rule: ProcessRule) -> &mut Self {
        self.filters.insert(rule.name().to_string(), rule);
        self
    }

    pub fn add_parser(&mut self, rule: ProcessRule) -> &mut Self {
        self.parsers.insert(rule.name().to_string(), rule);
        self
    }

    pub fn add_rewriter(&mut self, rule: ProcessRule) -> &mut Self {
        self.rewriters.insert(rule.name().to_string(), rule);
        self
    }

    pub fn add_connection(&mut self, connection: Connection) -> &mut Self {
        self.connections.push(connection);
        self
    }
}
