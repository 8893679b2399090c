//! Property tests for the fan-out invariants: for any subset of hops with
//! any flag combination, BRANCH_FINAL/BRANCH_FALLBACK/CATCHALL behave
//! consistently. Randomized over hop count and flag assignment rather
//! than enumerated by hand.
//!
//! Built entirely through the public `Configuration`/`PipelineCompiler`
//! surface rather than poking `Center` directly — `Center::push`/`set_flags`
//! are `pub(crate)`, reserved for the compiler itself, so a hop here is a
//! top-level connection (`SourceRef` + a counting `FilterRef` + a shared
//! `DestinationRef`) with `ConnectionFlags::final_`/`fallback` set exactly
//! the way a real configuration would.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;

use logpipe_core::compiler::{
    Configuration, Connection, ConnectionFlags, GlobalOptions, PipeItem, PipelineCompiler, ProcessKind, ProcessOp, ProcessPipe, ProcessRule,
};
use logpipe_core::message::{AckRecord, Message, Window};
use logpipe_core::pipe::{PathOptions, PipeFlags};

use crate::harness::{BareSource, RecordingSink};

/// One hop's shape: `should_match` decides what its filter returns;
/// `branch_final`/`branch_fallback` become that hop's connection flags.
#[derive(Clone, Copy)]
struct HopSpec {
    should_match: bool,
    branch_final: bool,
    branch_fallback: bool,
}

fn counting_filter(name: &str, should_match: bool) -> (ProcessRule, Arc<AtomicUsize>) {
    let counter = Arc::new(AtomicUsize::new(0));
    let counted = counter.clone();
    let predicate = Arc::new(move |_msg: &Message| {
        counted.fetch_add(1, Ordering::Relaxed);
        should_match
    });
    let pipe = ProcessPipe::new(ProcessKind::Filter, PipeFlags::default(), ProcessOp::Filter(predicate));
    (ProcessRule::new(name.to_string(), ProcessKind::Filter, vec![Box::new(pipe)]), counter)
}

fn build_fanout(specs: &[HopSpec]) -> (logpipe_core::compiler::CompiledPipeline, Vec<Arc<AtomicUsize>>) {
    let mut config = Configuration::new(GlobalOptions::default());
    config.add_source("in", Box::new(BareSource::new()));
    config.add_destination("out", Box::new(RecordingSink::new()));

    let mut counters = Vec::new();
    for (idx, spec) in specs.iter().enumerate() {
        let name = format!("hop{idx}");
        let (rule, counter) = counting_filter(&name, spec.should_match);
        counters.push(counter);
        config.add_filter(rule);
        config.add_connection(Connection::new(
            vec![PipeItem::SourceRef("in".into()), PipeItem::FilterRef(name), PipeItem::DestinationRef("out".into())],
            ConnectionFlags { final_: spec.branch_final, fallback: spec.branch_fallback, ..Default::default() },
        ));
    }

    let compiled = PipelineCompiler::compile(config).expect("every generated fan-out here is a valid configuration");
    (compiled, counters)
}

fn dispatch_one(compiled: &logpipe_core::compiler::CompiledPipeline, window: &Arc<Window>) {
    let source_id = compiled.sources["in"];
    let ack = AckRecord::new(window.clone());
    let msg = Message::from_source_input(b"probe".to_vec(), None, ack);
    let path = PathOptions::new(false, msg.ack_record().is_some());
    compiled.center.queue(source_id, msg, &path);
}

proptest! {
    /// Invariant 6 (BRANCH_FINAL): once a FINAL hop matches in a pass, no
    /// later hop in that same pass is visited, regardless of how many more
    /// follow.
    #[test]
    fn branch_final_stops_every_later_sibling_in_the_pass(
        final_index in 0usize..4,
        tail_len in 0usize..4,
    ) {
        let mut specs = Vec::new();
        for _ in 0..final_index {
            specs.push(HopSpec { should_match: true, branch_final: false, branch_fallback: false });
        }
        specs.push(HopSpec { should_match: true, branch_final: true, branch_fallback: false });
        for _ in 0..tail_len {
            specs.push(HopSpec { should_match: true, branch_final: false, branch_fallback: false });
        }

        let (compiled, counters) = build_fanout(&specs);
        let window = Window::new(8);
        dispatch_one(&compiled, &window);

        for (idx, counter) in counters.iter().enumerate() {
            let seen = counter.load(Ordering::Relaxed);
            if idx <= final_index {
                prop_assert_eq!(seen, 1, "hop {idx} at or before the FINAL hop must be visited exactly once");
            } else {
                prop_assert_eq!(seen, 0, "hop {idx} after a matched FINAL hop must never be visited");
            }
        }
    }

    /// Invariant 7 (BRANCH_FALLBACK): fallback hops are only visited when no
    /// non-fallback hop matched, no matter how many fallback hops exist.
    #[test]
    fn fallback_hops_run_only_when_the_normal_pass_found_nothing(
        normal_matches in any::<bool>(),
        fallback_count in 1usize..4,
    ) {
        let mut specs = vec![HopSpec { should_match: normal_matches, branch_final: false, branch_fallback: false }];
        for _ in 0..fallback_count {
            specs.push(HopSpec { should_match: true, branch_final: false, branch_fallback: true });
        }

        let (compiled, counters) = build_fanout(&specs);
        let window = Window::new(8);
        dispatch_one(&compiled, &window);

        prop_assert_eq!(counters[0].load(Ordering::Relaxed), 1);

        let fallback_visited_any = counters[1..].iter().any(|c| c.load(Ordering::Relaxed) > 0);
        prop_assert_eq!(fallback_visited_any, !normal_matches, "fallback hops run iff the normal pass delivered nothing");
    }

    /// Invariant 8 (CATCHALL, dispatch-time guarantee): every hop without a
    /// preceding FINAL match in its pass is visited exactly once, which is
    /// the property every source declared at compile time relies on to
    /// reach a CATCHALL connection's path.
    #[test]
    fn every_hop_without_a_preceding_final_match_is_visited_once(
        hop_count in 1usize..6,
    ) {
        let specs: Vec<HopSpec> = (0..hop_count)
            .map(|_| HopSpec { should_match: false, branch_final: false, branch_fallback: false })
            .collect();
        let (compiled, counters) = build_fanout(&specs);
        let window = Window::new(8);
        dispatch_one(&compiled, &window);

        for counter in &counters {
            prop_assert_eq!(counter.load(Ordering::Relaxed), 1);
        }
    }
}
