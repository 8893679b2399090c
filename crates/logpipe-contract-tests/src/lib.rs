//! Technology compatibility kit: a reusable, data-driven suite of checks
//! that any configuration built from `logpipe-core` plus the reference
//! `logpipe-runtime-std`/`logpipe-drivers-file` drivers is expected to
//! satisfy, independent of any particular binary embedding them.
//!
//! A companion proc-macro crate that turns `TckCase`s into individual
//! `#[test]` functions (so a failure reports as its own named test rather
//! than one line in a combined summary) was left out — `run_suite`'s
//! combined-failure report is simpler to maintain for the size this kit has
//! grown to, and the gap is recorded in `DESIGN.md`.

mod case;
mod harness;
mod invariants;
mod scenarios;

#[cfg(test)]
mod properties;

pub use case::{run_suite, TckCase, TckSuite};
pub use invariants::invariants_suite;
pub use scenarios::scenarios_suite;

/// Every suite this crate ships, in the order a caller would typically want
/// them run: cheap in-process invariants before the slower worker-thread
/// scenarios.
pub fn all_suites() -> Vec<TckSuite> {
    vec![invariants_suite(), scenarios_suite()]
}
