//! Log Processing Core: the pipeline compiler, message flow engine and
//! threaded-worker substrate contract behind a log collection and routing
//! daemon.
//!
//! This crate is contract-first: it defines `Message`, `Pipe`,
//! `Multiplexer`, the `PipelineCompiler`/`Center`, the ack/flow-control
//! primitives, and the `ThreadedSourceDriver`/`ThreadedDestinationDriver`
//! traits a concrete runtime must implement. It does not itself spawn OS
//! threads or touch a filesystem or socket — `logpipe-runtime-std` and
//! `logpipe-drivers-file` do that against this crate's contracts.

pub mod compiler;
pub mod driver;
pub mod error;
pub mod message;
pub mod multiplexer;
pub mod observability;
pub mod persist;
pub mod pipe;
pub mod worker;

pub use compiler::{CompiledPipeline, Configuration, GlobalOptions, PipelineCompiler};
pub use error::{CoreError, ErrorCategory};
pub use message::Message;
pub use pipe::Pipe;
