//! Invariant checks that hold for any compiled pipeline, independent of any
//! particular driver. Fan-out/fallback/final behavior is covered by
//! `proptest` in `properties.rs` instead, since those are naturally
//! property-shaped rather than single-example-shaped.

use logpipe_core::compiler::{Center, CompiledPipeline, Configuration, Connection, ConnectionFlags, GlobalOptions, PipeItem, PipelineCompiler, ProcessKind, ProcessOp, ProcessPipe, ProcessRule};
use logpipe_core::message::{AckRecord, Message, Value, Window};
use logpipe_core::pipe::{PathOptions, Pipe, PipeFlags};

use crate::case::{TckCase, TckSuite};
use crate::harness::{BareSource, RecordingSink};

fn simple_pipeline() -> CompiledPipeline {
    let mut config = Configuration::new(GlobalOptions::default());
    config.add_source("in", Box::new(BareSource::new()));
    config.add_destination("out", Box::new(RecordingSink::new()));
    config.add_connection(Connection::new(
        vec![PipeItem::SourceRef("in".into()), PipeItem::DestinationRef("out".into())],
        ConnectionFlags::default(),
    ));
    PipelineCompiler::compile(config).expect("a trivial source-to-destination connection always compiles")
}

fn dispatch_one(center: &Center, source_id: logpipe_core::pipe::PipeId, window: &std::sync::Arc<Window>, text: &str) {
    let ack = AckRecord::new(window.clone());
    let msg = Message::from_source_input(text.as_bytes().to_vec(), None, ack);
    let path = PathOptions::new(false, msg.ack_record().is_some());
    center.queue(source_id, msg, &path);
}

/// Invariant 1-ish: every message a source successfully dispatches is acked
/// exactly once along its only path, and that ack returns exactly the
/// credit the source spent acquiring it — the window comes back to full
/// capacity once every in-flight message has settled.
fn ack_balance_returns_every_spent_credit() {
    let compiled = simple_pipeline();
    let source_id = compiled.sources["in"];
    let window = Window::new(4);

    for _ in 0..4 {
        assert!(window.try_acquire(), "capacity is 4; the first 4 acquires must all succeed");
    }
    assert_eq!(window.credits(), 0);

    for i in 0..4 {
        dispatch_one(&compiled.center, source_id, &window, &format!("line {i}"));
    }

    assert_eq!(window.credits(), 4, "every dispatched message's ack chain must fully balance and return its credit");
}

/// Invariant 5-ish: the window never goes negative and never exceeds its
/// configured capacity, no matter how many more acks arrive than sends —
/// exercised at the `Center`/`AckRecord` level rather than `Window`'s own
/// unit tests, to catch a regression in how the compiled graph drives acks.
fn window_credit_never_exceeds_capacity_via_the_compiled_graph() {
    let compiled = simple_pipeline();
    let source_id = compiled.sources["in"];
    let window = Window::new(2);
    assert!(window.try_acquire());

    dispatch_one(&compiled.center, source_id, &window, "only message");
    assert_eq!(window.credits(), 2, "credit must not exceed capacity even though only one credit was ever spent");
}

/// Invariant 4 (clone-on-write safety): a message handed to a mutating
/// pipe (a rewriter) always arrives with refcount 1, and mutating it never
/// disturbs a sibling copy retained elsewhere.
fn clone_on_write_protects_shared_message_state() {
    let path = PathOptions::new(false, false);

    let mut original = Message::new_empty();
    original.set("MESSAGE", Value::Bytes(b"before".to_vec()));
    let shared = original.clone();
    assert_eq!(original.refcount(), 2);

    let mut exclusive = shared.clone_cow(&path);
    assert_eq!(exclusive.refcount(), 1, "clone_cow must hand back a handle with no other live reference");
    exclusive.set("MESSAGE", Value::Bytes(b"after".to_vec()));

    assert_eq!(original.get("MESSAGE").unwrap().as_bytes(), Some(b"before".as_slice()));
    assert_eq!(exclusive.get("MESSAGE").unwrap().as_bytes(), Some(b"after".as_slice()));

    let solo = Message::new_empty();
    assert_eq!(solo.refcount(), 1);
    let mut moved = solo.clone_cow(&path);
    assert_eq!(moved.refcount(), 1, "the exclusive shortcut must not leave a second handle behind");
    moved.set("MESSAGE", Value::Bytes(b"fine".to_vec()));
}

/// A rewriter placed on a straight-line path (the common, non-fanned-out
/// case) must be able to mutate every message it sees without panicking —
/// this is exactly the path the clone_cow/fork_owned split exists to keep
/// safe.
fn rewriter_on_a_plain_path_can_mutate_every_message() {
    let mut config = Configuration::new(GlobalOptions::default());
    config.add_source("in", Box::new(BareSource::new()));
    config.add_destination("out", Box::new(RecordingSink::new()));
    config.add_rewriter(ProcessRule::new(
        "uppercase",
        ProcessKind::Rewrite,
        vec![Box::new(ProcessPipe::new(
            ProcessKind::Rewrite,
            PipeFlags::default(),
            ProcessOp::Transform(std::sync::Arc::new(|msg: &mut Message| {
                if let Some(Value::Bytes(bytes)) = msg.get("MESSAGE").cloned() {
                    msg.set("MESSAGE", Value::Bytes(bytes.to_ascii_uppercase()));
                }
            })),
        ))],
    ));
    config.add_connection(Connection::new(
        vec![
            PipeItem::SourceRef("in".into()),
            PipeItem::RewriteRef("uppercase".into()),
            PipeItem::DestinationRef("out".into()),
        ],
        ConnectionFlags::default(),
    ));
    let compiled = PipelineCompiler::compile(config).unwrap();
    let source_id = compiled.sources["in"];
    let window = Window::new(4);

    for i in 0..3 {
        dispatch_one(&compiled.center, source_id, &window, &format!("line {i}"));
    }
    assert_eq!(window.credits(), 4, "all 3 dispatched messages must still balance their acks after being rewritten");
}

/// Invariant 9: `hard_flow_control` set on a nested `InlinePipe` connection
/// propagates up to the path that embeds it.
fn flow_control_propagates_out_of_an_inline_pipe() {
    let mut config = Configuration::new(GlobalOptions::default());
    config.add_source("in", Box::new(BareSource::new()));
    config.add_destination("out", Box::new(RecordingSink::new()));

    let inner = Connection::new(
        vec![PipeItem::DestinationRef("out".into())],
        ConnectionFlags { flow_control: true, ..Default::default() },
    );
    config.add_connection(Connection::new(
        vec![PipeItem::SourceRef("in".into()), PipeItem::InlinePipe(Box::new(inner))],
        ConnectionFlags::default(),
    ));

    let compiled = PipelineCompiler::compile(config).unwrap();
    let source_id = compiled.sources["in"];
    let source_mux = compiled.center.pipe(source_id).pipe_next().expect("source must have been wired to its fan-out multiplexer");
    let hops = compiled.center.hops(source_mux);
    assert_eq!(hops.len(), 1, "the source's only connection has a single top-level item, the InlinePipe");
    assert!(
        compiled.center.flags(hops[0]).hard_flow_control,
        "the InlinePipe's wrapping multiplexer must inherit hard_flow_control from its nested flow-control connection"
    );
}

pub fn invariants_suite() -> TckSuite {
    TckSuite {
        name: "invariants",
        cases: &[
            TckCase { name: "ack_balance_returns_every_spent_credit", test: ack_balance_returns_every_spent_credit },
            TckCase {
                name: "window_credit_never_exceeds_capacity_via_the_compiled_graph",
                test: window_credit_never_exceeds_capacity_via_the_compiled_graph,
            },
            TckCase { name: "clone_on_write_protects_shared_message_state", test: clone_on_write_protects_shared_message_state },
            TckCase { name: "rewriter_on_a_plain_path_can_mutate_every_message", test: rewriter_on_a_plain_path_can_mutate_every_message },
            TckCase { name: "flow_control_propagates_out_of_an_inline_pipe", test: flow_control_propagates_out_of_an_inline_pipe },
        ],
    }
}
