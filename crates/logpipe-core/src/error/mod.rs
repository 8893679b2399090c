//! Error taxonomy surfaced across the log processing core.
//!
//! The core distinguishes a handful of error families by how a caller must
//! react to them, not by which module raised them:
//!
//! - [`ConfigError`] — a [`PipelineCompiler`](crate::compiler::PipelineCompiler)
//!   failure. Aborts compilation; on reload the previously active
//!   [`Center`](crate::compiler::Center) stays live.
//! - [`InitError`] — a [`Pipe::init`](crate::pipe::Pipe::init) failure.
//! - [`FormatError`] — a message could not be formatted for a destination;
//!   policy (`on_error`) decides whether that drops the message, the whole
//!   batch, or is emitted with defaults.
//! - [`CoreError`] — the stable, classified error type threaded through
//!   worker retry logic (transient transport errors, permanent transport
//!   errors). Every `CoreError` carries an [`ErrorCategory`] used to decide
//!   whether a worker retries, drops a batch, or gives up.
//!
//! Internal invariant violations are not represented here at all: they are
//! programming errors and are handled with `panic!`, not a `Result` — the
//! process exits rather than continue with corrupted state.

use std::borrow::Cow;
use std::fmt;

/// A config-time error: unresolved reference, or a structural misuse such as
/// a source endpoint inside a non-top-level connection or inside a
/// `catch-all` connection.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unresolved reference to {kind} named '{name}'")]
    UnresolvedReference { kind: &'static str, name: String },

    #[error("source endpoints are only permitted at the top level of a connection")]
    SourceNotAtTopLevel,

    #[error("source endpoints are not permitted inside a catch-all connection")]
    SourceInCatchAll,

    #[error("connection has no endpoints")]
    EmptyConnection,

    #[error("rule '{name}' is referenced but was never defined")]
    UndefinedRule { name: String },

    #[error("pipe '{pipe}' failed to initialize: {source}")]
    Init {
        pipe: String,
        #[source]
        source: InitError,
    },
}

/// A [`Pipe::init`](crate::pipe::Pipe::init) failure. Does not free the pipe;
/// ownership stays with the [`Center`](crate::compiler::Center) so the
/// ordinary configuration teardown still runs.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct InitError {
    pub message: Cow<'static, str>,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl InitError {
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self { message: message.into(), cause: None }
    }

    pub fn with_cause(
        mut self,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

/// A message could not be formatted for a destination (missing required
/// field, a type-cast failure). The destination's `on_error` policy decides
/// what happens next; this type only carries *why*.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("field '{name}' is required but missing")]
    MissingField { name: String },

    #[error("field '{name}' could not be cast to the requested type")]
    TypeCast { name: String },
}

/// How a [`CoreError`] should be handled by the worker that observed it.
///
/// Transient transport errors are retried with backoff, permanent ones
/// drop the batch (acking it so the source is not stuck), and
/// non-retryable errors bubble to the operator unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Retry the operation after `time_reopen`; does not bubble out.
    Retryable,
    /// Drop the batch (or message) and ack it so the source is unblocked.
    Permanent,
    /// Surface verbatim to the operator; never retried automatically.
    NonRetryable,
}

/// The stable, classified error type threaded through retry and
/// flow-control decisions. Carries a stable string code (so it can be
/// logged, counted and alerted on without parsing `message`), a category,
/// and an optional boxed cause.
#[derive(Debug)]
pub struct CoreError {
    code: &'static str,
    message: Cow<'static, str>,
    category: ErrorCategory,
    cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl CoreError {
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>, category: ErrorCategory) -> Self {
        Self { code, message: message.into(), category, cause: None }
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn std::error::Error + 'static))
    }
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
