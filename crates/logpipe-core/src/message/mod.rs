//! The log event type.
//!
//! A [`Message`] is an `Arc`-backed handle: cloning it is a single atomic
//! increment, since that happens on every hop a message takes through the
//! graph, and [`Message::clone_cow`] implements the clone-on-write
//! contract by checking [`Arc::strong_count`] instead of a hand-rolled
//! refcount field — exclusive iff refcount == 1.

mod ack;
mod value;

pub use ack::{AckRecord, Window};
pub use value::Value;

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;

use crate::pipe::PathOptions;

/// Facility/severity pair, carried unchanged from ingestion to delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FacilitySeverity {
    pub facility: u8,
    pub severity: u8,
}

/// Bitmask of tags attached to a message (matched filters, driver-assigned
/// markers, and so on). Plain `u64` rather than a richer type: the core
/// never interprets individual bits, only ORs/tests them, so a newtype
/// would add no safety.
pub type TagMask = u64;

#[derive(Debug, Clone, Default)]
struct MessageInner {
    values: BTreeMap<String, Value>,
    tags: TagMask,
    facility_severity: FacilitySeverity,
    send_time: Option<SystemTime>,
    recv_time: Option<SystemTime>,
    msg_time: Option<SystemTime>,
    source_addr: Option<SocketAddr>,
    dest_addr: Option<SocketAddr>,
    #[allow(clippy::type_complexity)]
    ack: Option<Arc<AckRecord>>,
}

/// An immutable-by-default log record with copy-on-write mutation.
/// Cloning is a cheap `Arc` bump; mutation requires exclusive ownership,
/// obtained via [`clone_cow`](Message::clone_cow).
#[derive(Debug, Clone)]
pub struct Message(Arc<MessageInner>);

impl Message {
    /// A message with no values, no ack chain, no tags. Mostly useful in
    /// tests; real sources should use [`Message::from_source_input`] or
    /// [`Message::new_mark`].
    pub fn new_empty() -> Self {
        Message(Arc::new(MessageInner::default()))
    }

    /// A synthetic MARK message, tagged so downstream filters can
    /// recognize and special-case it if they choose.
    pub fn new_mark() -> Self {
        let mut inner = MessageInner {
            recv_time: Some(SystemTime::now()),
            msg_time: Some(SystemTime::now()),
            ..Default::default()
        };
        inner.values.insert("MESSAGE".into(), Value::String("-- MARK --".into()));
        Message(Arc::new(inner))
    }

    /// A message constructed by a source driver from raw input bytes plus
    /// whatever metadata it already knows (peer address, receive time). The
    /// ack chain is attached here so every message produced by a given
    /// source shares that source's [`Window`].
    pub fn from_source_input(
        raw: impl Into<Vec<u8>>,
        source_addr: Option<SocketAddr>,
        ack: Arc<AckRecord>,
    ) -> Self {
        let now = SystemTime::now();
        let mut inner = MessageInner {
            recv_time: Some(now),
            msg_time: Some(now),
            source_addr,
            ack: Some(ack),
            ..Default::default()
        };
        inner
            .values
            .insert("MESSAGE".into(), Value::Bytes(raw.into()));
        Message(Arc::new(inner))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.values.get(name)
    }

    /// Set a field. Panics if called on a shared message — callers must
    /// route mutation through [`clone_cow`](Message::clone_cow) first.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let inner = Arc::get_mut(&mut self.0)
            .expect("Message::set called on a shared message; call clone_cow first");
        inner.values.insert(name.into(), value);
    }

    pub fn tags(&self) -> TagMask {
        self.0.tags
    }

    pub fn set_tag(&mut self, bit: TagMask) {
        let inner = Arc::get_mut(&mut self.0)
            .expect("Message::set_tag called on a shared message; call clone_cow first");
        inner.tags |= bit;
    }

    pub fn facility_severity(&self) -> FacilitySeverity {
        self.0.facility_severity
    }

    pub fn source_addr(&self) -> Option<SocketAddr> {
        self.0.source_addr
    }

    pub fn dest_addr(&self) -> Option<SocketAddr> {
        self.0.dest_addr
    }

    pub fn set_dest_addr(&mut self, addr: SocketAddr) {
        let inner = Arc::get_mut(&mut self.0)
            .expect("Message::set_dest_addr called on a shared message; call clone_cow first");
        inner.dest_addr = Some(addr);
    }

    /// The number of live references to this message's backing storage.
    /// `1` means exclusive: the caller may mutate in place.
    pub fn refcount(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Clone-on-write hand-off: consumes the caller's own handle and
    /// returns one the caller may mutate in place. If nothing else shares
    /// this message's storage, this is a plain move — no allocation, and
    /// the result genuinely has refcount 1, since the caller's own
    /// reference went into it rather than sitting alongside it. Otherwise
    /// the backing storage is deep-cloned. Either way the result shares the
    /// same ack record as the original — cloning a message never changes
    /// which source window it owes credit to.
    ///
    /// Takes `self` by value rather than `&self` deliberately: a version
    /// that only borrowed `self` could never actually return an exclusive
    /// handle, since the caller's own reference would still be alive
    /// alongside it. Call sites that need to keep dispatching their own
    /// copy after handing a branch its own independent one want
    /// [`fork_owned`](Message::fork_owned) instead.
    pub fn clone_cow(self, _path: &PathOptions) -> Message {
        if Arc::strong_count(&self.0) == 1 {
            self
        } else {
            Message(Arc::new((*self.0).clone()))
        }
    }

    /// Always deep-clones the backing storage, regardless of refcount,
    /// leaving `self` untouched and still usable. Used by a
    /// [`Multiplexer`](crate::multiplexer::Multiplexer) to hand one
    /// fan-out branch its own mutable copy while it keeps dispatching the
    /// original to the remaining hops — unlike [`clone_cow`](Message::clone_cow),
    /// the caller here is not giving its reference up, so there is no
    /// exclusive case to shortcut.
    pub fn fork_owned(&self, _path: &PathOptions) -> Message {
        Message(Arc::new((*self.0).clone()))
    }

    /// Register one more outstanding ack against this message's ack
    /// record. Pairs with exactly one later [`ack`](Message::ack) call
    /// along whatever path this reference travels, keeping the ack count
    /// balanced.
    pub fn add_ack(&self, path: &PathOptions) {
        if !path.ack_needed {
            return;
        }
        if let Some(ack) = &self.0.ack {
            ack.add_ack();
        }
    }

    /// Release one outstanding ack. When the record's outstanding count
    /// reaches zero, the owning source's window credit is released.
    pub fn ack(&self, path: &PathOptions) {
        if !path.ack_needed {
            return;
        }
        if let Some(ack) = &self.0.ack {
            ack.ack();
        }
    }

    pub fn ack_record(&self) -> Option<&Arc<AckRecord>> {
        self.0.ack.as_ref()
    }
}
