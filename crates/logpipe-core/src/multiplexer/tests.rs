use super::*;
use crate::message::Value;
use std::sync::atomic::Ordering;
use std::sync::Mutex as StdMutex;

/// A terminal pipe that records every message it receives and always
/// matches. Used as a multiplexer hop without needing the full compiler.
struct Sink {
    flags: PipeFlags,
    received: StdMutex<Vec<String>>,
}

impl Sink {
    fn new(flags: PipeFlags) -> Self {
        Self { flags, received: StdMutex::new(Vec::new()) }
    }
}

impl Pipe for Sink {
    fn flags(&self) -> PipeFlags {
        self.flags
    }

    fn describe(&self) -> &'static str {
        "test-sink"
    }

    fn queue(&self, _center: &Center, msg: Message, path: &PathOptions) -> QueueOutcome {
        if let Some(Value::String(tag)) = msg.get("tag") {
            self.received.lock().unwrap().push(tag.clone());
        }
        msg.ack(path);
        QueueOutcome::MATCHED
    }

    fn clone_boxed(&self) -> Box<dyn Pipe> {
        Box::new(Sink::new(self.flags))
    }
}

/// A hop that never matches, used to exercise the fallback pass.
struct Miss;

impl Pipe for Miss {
    fn queue(&self, _center: &Center, msg: Message, path: &PathOptions) -> QueueOutcome {
        msg.ack(path);
        QueueOutcome::NOT_MATCHED
    }

    fn clone_boxed(&self) -> Box<dyn Pipe> {
        Box::new(Miss)
    }
}

fn tagged(tag: &str) -> Message {
    let mut msg = Message::new_empty();
    msg.set("tag", Value::String(tag.into()));
    msg
}

fn path() -> PathOptions {
    PathOptions::new(false, false)
}

#[test]
fn delivers_to_every_hop_in_the_normal_pass() {
    let mut center = Center::new();
    let a = center.push(Box::new(Sink::new(PipeFlags::default())));
    let b = center.push(Box::new(Sink::new(PipeFlags::default())));
    let mux = Multiplexer::new(PipeFlags::default());
    let mux_id = center.push(Box::new(mux));
    center.add_hop(mux_id, a);
    center.add_hop(mux_id, b);
    center.reinit().unwrap();

    center.queue(mux_id, tagged("hello"), &path());

    assert_eq!(center.stats_for(a).unwrap().received.load(Ordering::Relaxed), 1);
    assert_eq!(center.stats_for(b).unwrap().received.load(Ordering::Relaxed), 1);
}

#[test]
fn branch_final_stops_later_siblings_in_the_same_pass() {
    let mut center = Center::new();
    let stop_here = PipeFlags { branch_final: true, ..Default::default() };
    let first = center.push(Box::new(Sink::new(stop_here)));
    let second = center.push(Box::new(Sink::new(PipeFlags::default())));
    let mux_id = center.push(Box::new(Multiplexer::new(PipeFlags::default())));
    center.add_hop(mux_id, first);
    center.add_hop(mux_id, second);
    center.reinit().unwrap();

    center.queue(mux_id, tagged("x"), &path());

    assert_eq!(center.stats_for(first).unwrap().received.load(Ordering::Relaxed), 1);
    assert_eq!(center.stats_for(second).unwrap().received.load(Ordering::Relaxed), 0);
}

#[test]
fn fallback_hop_only_runs_when_the_normal_pass_delivered_nothing() {
    let mut center = Center::new();
    let fallback_flags = PipeFlags { branch_fallback: true, ..Default::default() };
    let normal = center.push(Box::new(Miss));
    let fallback = center.push(Box::new(Sink::new(fallback_flags)));
    let mux_id = center.push(Box::new(Multiplexer::new(PipeFlags::default())));
    center.add_hop(mux_id, normal);
    center.add_hop(mux_id, fallback);
    center.reinit().unwrap();

    let outcome = center.queue(mux_id, tagged("only-fallback"), &path());
    assert!(outcome.matched);
}

#[test]
fn fallback_pass_is_skipped_once_the_normal_pass_delivered() {
    let mut center = Center::new();
    let fallback_flags = PipeFlags { branch_fallback: true, ..Default::default() };
    let normal = center.push(Box::new(Sink::new(PipeFlags::default())));
    let fallback = center.push(Box::new(Sink::new(fallback_flags)));
    let mux_id = center.push(Box::new(Multiplexer::new(PipeFlags::default())));
    center.add_hop(mux_id, normal);
    center.add_hop(mux_id, fallback);
    center.reinit().unwrap();

    center.queue(mux_id, tagged("hits-normal"), &path());

    let fallback_stats = center.stats_for(fallback).unwrap();
    assert_eq!(fallback_stats.received.load(Ordering::Relaxed), 0);
}

#[test]
fn init_records_whether_any_hop_is_a_fallback() {
    let mut center = Center::new();
    let fallback_flags = PipeFlags { branch_fallback: true, ..Default::default() };
    let hop = center.push(Box::new(Sink::new(fallback_flags)));

    let mut mux = Multiplexer::new(PipeFlags::default());
    mux.add_next_hop(hop);
    Pipe::init(&mux, &center).unwrap();
    assert!(mux.fallback_exists());

    let mut no_fallback_center = Center::new();
    let plain_hop = no_fallback_center.push(Box::new(Sink::new(PipeFlags::default())));
    let mut mux2 = Multiplexer::new(PipeFlags::default());
    mux2.add_next_hop(plain_hop);
    Pipe::init(&mux2, &no_fallback_center).unwrap();
    assert!(!mux2.fallback_exists());
}

#[test]
fn hops_are_visited_in_registration_order() {
    let mut mux = Multiplexer::new(PipeFlags::default());
    mux.add_next_hop(PipeId(3));
    mux.add_next_hop(PipeId(1));
    mux.add_next_hop(PipeId(2));

    assert_eq!(mux.next_hops(), &[PipeId(3), PipeId(1), PipeId(2)]);
}

#[test]
fn clone_boxed_produces_an_independent_hop_list() {
    let original = {
        let mut m = Multiplexer::new(PipeFlags::default());
        m.add_next_hop(PipeId(0));
        m
    };
    let cloned = original.clone_boxed();
    assert_eq!(cloned.describe(), "multiplexer");
}
