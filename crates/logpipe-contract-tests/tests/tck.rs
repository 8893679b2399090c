//! The TCK's own consumer: runs every suite the crate ships as a single
//! integration test per suite, so a failure names the suite and every case
//! within it that failed rather than stopping at the first one.

use logpipe_contract_tests::{invariants_suite, run_suite, scenarios_suite};

#[test]
fn invariants() {
    run_suite(&invariants_suite());
}

#[test]
fn scenarios() {
    run_suite(&scenarios_suite());
}
