//! The TCK's case/suite registry: a flat, data-driven list of named checks
//! rather than one `#[test]` per behavior, so a binary embedding this crate
//! can enumerate and run "every invariant check" or "every scenario check"
//! as a single reportable unit, with a failure in one case naming exactly
//! which one without aborting the rest.

use std::panic::{self, AssertUnwindSafe};

/// One named check. `test` is a plain `fn()` (not a closure) so cases can
/// be declared as `const` items and collected into a `&'static [TckCase]`
/// without any allocation.
#[derive(Clone, Copy)]
pub struct TckCase {
    pub name: &'static str,
    pub test: fn(),
}

/// A named group of cases sharing a topic (an invariant family, or a
/// scenario family).
#[derive(Clone, Copy)]
pub struct TckSuite {
    pub name: &'static str,
    pub cases: &'static [TckCase],
}

/// Runs every case in `suite`, catching panics so one failing case doesn't
/// stop the rest from reporting, then re-panics with a summary naming every
/// case that failed (suite and case name attached, not just the original
/// panic message) if any did.
pub fn run_suite(suite: &TckSuite) {
    let mut failures = Vec::new();
    for case in suite.cases {
        let result = panic::catch_unwind(AssertUnwindSafe(case.test));
        if let Err(payload) = result {
            let reason = panic_message(&payload);
            failures.push(format!("{}::{} — {reason}", suite.name, case.name));
        }
    }
    if !failures.is_empty() {
        panic!("{} of {} case(s) failed in suite '{}':\n  {}", failures.len(), suite.cases.len(), suite.name, failures.join("\n  "));
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
