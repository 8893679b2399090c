//! Compiler integration tests covering concrete end-to-end routing
//! scenarios. These exercise `PipelineCompiler::compile` against minimal
//! in-process source/destination stand-ins; the fuller TCK against real
//! file drivers lives in `logpipe-contract-tests`.

use std::sync::{Arc, Mutex};

use super::*;
use crate::message::{Message, Value};
use crate::pipe::{PathOptions, Pipe, PipeFlags, PipeId, QueueOutcome};

/// A bare endpoint marker standing in for a source driver's `Pipe` half:
/// the real driver crate supplies something with actual I/O, but the
/// compiler only ever needs `pipe_next` storage and a name for diagnostics.
#[derive(Default)]
struct SourceMarker {
    pipe_next: Option<PipeId>,
}

impl Pipe for SourceMarker {
    fn pipe_next(&self) -> Option<PipeId> {
        self.pipe_next
    }

    fn describe(&self) -> &'static str {
        "test-source"
    }

    fn set_pipe_next_mut(&mut self, next: PipeId) {
        self.pipe_next = Some(next);
    }

    fn clone_boxed(&self) -> Box<dyn Pipe> {
        Box::new(SourceMarker { pipe_next: self.pipe_next })
    }
}

/// A destination stand-in that records every message it receives.
struct RecordingDestination {
    received: Arc<Mutex<Vec<Message>>>,
}

impl RecordingDestination {
    fn new() -> (Box<dyn Pipe>, Arc<Mutex<Vec<Message>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        (Box::new(RecordingDestination { received: received.clone() }), received)
    }
}

impl Pipe for RecordingDestination {
    fn describe(&self) -> &'static str {
        "test-destination"
    }

    fn queue(&self, _center: &Center, msg: Message, path: &PathOptions) -> QueueOutcome {
        self.received.lock().unwrap().push(msg.clone());
        msg.ack(path);
        QueueOutcome::MATCHED
    }

    fn clone_boxed(&self) -> Box<dyn Pipe> {
        Box::new(RecordingDestination { received: self.received.clone() })
    }
}

fn host_filter(expected: &'static str) -> ProcessRule {
    ProcessRule::new(
        format!("host-is-{expected}"),
        ProcessKind::Filter,
        vec![Box::new(ProcessPipe::new(
            ProcessKind::Filter,
            PipeFlags::default(),
            ProcessOp::Filter(Arc::new(move |msg| {
                matches!(msg.get("HOST"), Some(Value::String(s)) if s == expected)
            })),
        ))],
    )
}

fn msg_with_host(host: &str) -> Message {
    let mut msg = Message::new_empty();
    msg.set("HOST", Value::String(host.to_string()));
    msg
}

#[test]
fn filter_final_blocks_the_sibling_branch() {
    let (dest_a, dest_a_seen) = RecordingDestination::new();
    let (dest_b, dest_b_seen) = RecordingDestination::new();

    let mut config = Configuration::new(GlobalOptions::default());
    config
        .add_source("src", Box::new(SourceMarker::default()))
        .add_destination("destA", dest_a)
        .add_destination("destB", dest_b)
        .add_filter(host_filter("a"))
        .add_connection(Connection::new(
            vec![
                PipeItem::SourceRef("src".into()),
                PipeItem::FilterRef("host-is-a".into()),
                PipeItem::DestinationRef("destA".into()),
            ],
            ConnectionFlags { final_: true, ..Default::default() },
        ))
        .add_connection(Connection::new(
            vec![PipeItem::SourceRef("src".into()), PipeItem::DestinationRef("destB".into())],
            ConnectionFlags::default(),
        ));

    let compiled = PipelineCompiler::compile(config).unwrap();
    let source_id = compiled.sources["src"];
    let path = PathOptions::new(false, false);

    compiled.center.queue(source_id, msg_with_host("a"), &path);
    assert_eq!(dest_a_seen.lock().unwrap().len(), 1, "matching message reaches destA");
    assert_eq!(dest_b_seen.lock().unwrap().len(), 0, "FINAL on destA's branch blocks destB");

    compiled.center.queue(source_id, msg_with_host("z"), &path);
    assert_eq!(dest_a_seen.lock().unwrap().len(), 1, "non-matching message does not reach destA");
    assert_eq!(dest_b_seen.lock().unwrap().len(), 1, "non-matching message falls through to destB");
}

#[test]
fn fallback_branch_only_fires_when_nothing_else_matched() {
    let (dest_a, dest_a_seen) = RecordingDestination::new();
    let (dest_b, dest_b_seen) = RecordingDestination::new();
    let (dest_fallback, dest_fallback_seen) = RecordingDestination::new();

    let mut config = Configuration::new(GlobalOptions::default());
    config
        .add_source("src", Box::new(SourceMarker::default()))
        .add_destination("destA", dest_a)
        .add_destination("destB", dest_b)
        .add_destination("destFallback", dest_fallback)
        .add_filter(host_filter("a"))
        .add_filter(host_filter("b"))
        .add_connection(Connection::new(
            vec![
                PipeItem::SourceRef("src".into()),
                PipeItem::FilterRef("host-is-a".into()),
                PipeItem::DestinationRef("destA".into()),
            ],
            ConnectionFlags::default(),
        ))
        .add_connection(Connection::new(
            vec![
                PipeItem::SourceRef("src".into()),
                PipeItem::FilterRef("host-is-b".into()),
                PipeItem::DestinationRef("destB".into()),
            ],
            ConnectionFlags::default(),
        ))
        .add_connection(Connection::new(
            vec![PipeItem::SourceRef("src".into()), PipeItem::DestinationRef("destFallback".into())],
            ConnectionFlags { fallback: true, ..Default::default() },
        ));

    let compiled = PipelineCompiler::compile(config).unwrap();
    let source_id = compiled.sources["src"];
    let path = PathOptions::new(false, false);

    compiled.center.queue(source_id, msg_with_host("c"), &path);
    assert_eq!(dest_a_seen.lock().unwrap().len(), 0);
    assert_eq!(dest_b_seen.lock().unwrap().len(), 0);
    assert_eq!(dest_fallback_seen.lock().unwrap().len(), 1, "no non-fallback hop matched HOST=c");

    compiled.center.queue(source_id, msg_with_host("a"), &path);
    assert_eq!(dest_a_seen.lock().unwrap().len(), 1);
    assert_eq!(dest_fallback_seen.lock().unwrap().len(), 1, "destA matching suppresses fallback");
}

#[test]
fn catchall_connection_receives_from_every_declared_source() {
    let (dest_all, dest_all_seen) = RecordingDestination::new();

    let mut config = Configuration::new(GlobalOptions::default());
    config
        .add_source("s1", Box::new(SourceMarker::default()))
        .add_source("s2", Box::new(SourceMarker::default()))
        .add_destination("destAll", dest_all)
        .add_connection(Connection::new(
            vec![PipeItem::DestinationRef("destAll".into())],
            ConnectionFlags { catchall: true, ..Default::default() },
        ));

    let compiled = PipelineCompiler::compile(config).unwrap();
    let path = PathOptions::new(false, false);

    compiled.center.queue(compiled.sources["s1"], msg_with_host("a"), &path);
    compiled.center.queue(compiled.sources["s2"], msg_with_host("a"), &path);

    assert_eq!(dest_all_seen.lock().unwrap().len(), 2, "both sources reach the catchall destination");
}

#[test]
fn source_ref_rejected_inside_catchall_connection() {
    let mut config = Configuration::new(GlobalOptions::default());
    let (dest, _seen) = RecordingDestination::new();
    config
        .add_source("src", Box::new(SourceMarker::default()))
        .add_destination("dest", dest)
        .add_connection(Connection::new(
            vec![PipeItem::SourceRef("src".into()), PipeItem::DestinationRef("dest".into())],
            ConnectionFlags { catchall: true, ..Default::default() },
        ));

    let err = PipelineCompiler::compile(config).unwrap_err();
    assert!(matches!(err, ConfigError::SourceInCatchAll));
}

#[test]
fn rewrite_clone_isolates_sibling_branches() {
    let (dest_a, dest_a_seen) = RecordingDestination::new();
    let (dest_b, dest_b_seen) = RecordingDestination::new();

    let rewrite = ProcessRule::new(
        "uppercase-host",
        ProcessKind::Rewrite,
        vec![Box::new(ProcessPipe::new(
            ProcessKind::Rewrite,
            PipeFlags::default(),
            ProcessOp::Transform(Arc::new(|msg| {
                if let Some(Value::String(host)) = msg.get("HOST").cloned() {
                    msg.set("HOST", Value::String(host.to_uppercase()));
                }
            })),
        ))],
    );

    let mut config = Configuration::new(GlobalOptions::default());
    config
        .add_source("src", Box::new(SourceMarker::default()))
        .add_destination("destA", dest_a)
        .add_destination("destB", dest_b)
        .add_rewriter(rewrite)
        .add_connection(Connection::new(
            vec![
                PipeItem::SourceRef("src".into()),
                PipeItem::RewriteRef("uppercase-host".into()),
                PipeItem::DestinationRef("destA".into()),
            ],
            ConnectionFlags::default(),
        ))
        .add_connection(Connection::new(
            vec![PipeItem::SourceRef("src".into()), PipeItem::DestinationRef("destB".into())],
            ConnectionFlags::default(),
        ));

    let compiled = PipelineCompiler::compile(config).unwrap();
    let path = PathOptions::new(false, false);
    compiled.center.queue(compiled.sources["src"], msg_with_host("a"), &path);

    let a = dest_a_seen.lock().unwrap();
    let b = dest_b_seen.lock().unwrap();
    assert_eq!(a[0].get("HOST"), Some(&Value::String("A".into())), "destA sees the rewritten value");
    assert_eq!(b[0].get("HOST"), Some(&Value::String("a".into())), "destB sees the original, untouched");
}
