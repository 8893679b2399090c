//! End-to-end scenario checks: these exercise the real `logpipe-runtime-std`
//! substrate (worker threads, `MainLoop`) rather than dispatching directly
//! into a `Center`, so they cover the handoff paths `invariants.rs`
//! deliberately stays below.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use logpipe_core::compiler::{Configuration, Connection, ConnectionFlags, GlobalOptions, PipeItem, PipelineCompiler};
use logpipe_core::message::Window;
use logpipe_core::pipe::PathOptions;
use logpipe_drivers_file::{InternalMarkSource, SourceEndpoint};
use logpipe_runtime_std::{DestinationEndpoint, DestinationRuntime, MainLoop, SourceRuntime};

use crate::case::{TckCase, TckSuite};
use crate::harness::{OneShotThenIdleSource, RecordingSink, SharedPipe, StallableDestination};

/// Scenario 4 (back-pressure): window capacity 2, destination stalled.
/// Three one-shot sources share one window; the third cannot acquire
/// credit until the stalled destination is released and the first two
/// messages settle.
fn flow_control_blocks_the_third_send_until_the_destination_drains() {
    let mut config = Configuration::new(GlobalOptions { flush_lines: 1, ..Default::default() });
    for name in ["a", "b", "c"] {
        config.add_source(name, Box::new(SourceEndpoint::default()));
    }

    let release = Arc::new(AtomicBool::new(false));
    let destination = Arc::new(StallableDestination::new(release.clone()));
    let runtime = DestinationRuntime::spawn("stallable".into(), destination.clone(), 16, 1, Duration::from_millis(20));
    config.add_destination("out", Box::new(DestinationEndpoint::new(runtime)));

    for name in ["a", "b", "c"] {
        config.add_connection(Connection::new(
            vec![PipeItem::SourceRef(name.into()), PipeItem::DestinationRef("out".into())],
            ConnectionFlags::default(),
        ));
    }

    let compiled = PipelineCompiler::compile(config).unwrap();
    let window = Window::new(2);

    let mut runtimes = Vec::new();
    for (name, text) in [("a", "first"), ("b", "second"), ("c", "third")] {
        let driver = Arc::new(OneShotThenIdleSource::new(text, Duration::from_millis(5)));
        let rt = SourceRuntime::spawn(name.into(), driver, window.clone());
        runtimes.push((compiled.sources[name], rt));
    }

    // Drive dispatch directly off each source's queue with a bounded wait,
    // the same handoff `MainLoop::dispatch` performs, without needing a
    // `MainLoop` (whose multi-source `run_once` blocks indefinitely on
    // whichever source hasn't produced yet — unsuitable here since "c" is
    // expected to stay silent until credit frees up).
    let pump = |deadline: Instant| {
        while Instant::now() < deadline {
            for (source_id, rt) in &runtimes {
                for msg in rt.queue.drain_until(Some(Instant::now() + Duration::from_millis(10))) {
                    let path = PathOptions::new(false, msg.ack_record().is_some());
                    compiled.center.queue(*source_id, msg, &path);
                }
            }
        }
    };

    pump(Instant::now() + Duration::from_millis(300));
    assert_eq!(destination.received_count(), 2, "only the first two messages should have reached the stalled destination's insert()");
    assert_eq!(window.credits(), 0, "both spent credits are still outstanding; the destination has not acked anything yet");

    release.store(true, Ordering::Release);
    pump(Instant::now() + Duration::from_millis(500));

    assert_eq!(destination.received_count(), 3, "once unblocked, the third source's message must eventually arrive too");
    assert_eq!(window.credits(), 2, "all three messages have now settled; the window is back to full capacity");

    window.request_exit();
    for (_, mut rt) in runtimes {
        rt.request_exit();
    }
}

/// Scenario 6 (mark emission): with no real traffic, a MARK message is
/// emitted roughly once per `mark_freq`; one burst of real traffic resets
/// the timer rather than the MARK firing immediately afterward.
fn mark_source_fires_periodically_and_resets_on_real_traffic() {
    let mark_freq = Duration::from_millis(60);
    let mut config = Configuration::new(GlobalOptions::default());
    config.add_source("mark", Box::new(InternalMarkSource::new()));
    config.add_source("real", Box::new(SourceEndpoint::default()));
    let sink = Arc::new(RecordingSink::new());
    config.add_destination("out", Box::new(SharedPipe(sink.clone())));
    config.add_connection(Connection::new(
        vec![PipeItem::SourceRef("mark".into()), PipeItem::DestinationRef("out".into())],
        ConnectionFlags::default(),
    ));
    config.add_connection(Connection::new(
        vec![PipeItem::SourceRef("real".into()), PipeItem::DestinationRef("out".into())],
        ConnectionFlags::default(),
    ));

    let compiled = PipelineCompiler::compile(config).unwrap();
    let center = Arc::new(compiled.center);
    let mark_source = compiled.sources["mark"];
    let real_source = compiled.sources["real"];

    let window = Window::new(4);
    let real_driver = Arc::new(OneShotThenIdleSource::new("hello", Duration::from_millis(5)));
    let mut sources = HashMap::new();
    sources.insert(real_source, SourceRuntime::spawn("real".into(), real_driver, window.clone()));

    let mut main_loop = MainLoop::new(center, sources, Some(mark_source), Some(mark_freq));

    // `real` posts its one message almost immediately; the mark deadline
    // `mark_freq` is always `Some` here, so `run_once`'s internal
    // `drain_until` is always bounded — safe to call from this thread in a
    // tight loop.
    let run_for = Duration::from_millis(260);
    let start = Instant::now();
    while start.elapsed() < run_for {
        main_loop.run_once();
    }

    let seen = sink.count();
    assert!(
        seen >= 2,
        "over {run_for:?} with one real message and a {mark_freq:?} mark period, at least a couple of MARKs should have fired, saw {seen}"
    );

    main_loop.request_all_sources_exit();
    window.request_exit();
}

pub fn scenarios_suite() -> TckSuite {
    TckSuite {
        name: "scenarios",
        cases: &[
            TckCase {
                name: "flow_control_blocks_the_third_send_until_the_destination_drains",
                test: flow_control_blocks_the_third_send_until_the_destination_drains,
            },
            TckCase {
                name: "mark_source_fires_periodically_and_resets_on_real_traffic",
                test: mark_source_fires_periodically_and_resets_on_real_traffic,
            },
        ],
    }
}
