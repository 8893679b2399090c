//! The pipeline compiler and its runtime output.
//!
//! This is the largest single module in the crate because it is where
//! every other module's contract gets exercised at once: flag propagation,
//! reference resolution, and the lazy/fresh multiplexer wiring rules.

mod center;
mod compile;
mod config;
mod connection;
mod process;

pub use center::{Center, StatsCounters};
pub use compile::{CompiledPipeline, PipelineCompiler};
pub use config::{Configuration, GlobalOptions};
pub use connection::{Connection, ConnectionFlags, PipeItem};
pub use process::{ProcessKind, ProcessOp, ProcessPipe, ProcessRule};

#[cfg(test)]
mod tests;
