// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Shared helpers for integration tests.

// Integration test helpers are `pub` so each `tests/*.rs` file can import them
// via `mod common`, but clippy flags them as unreachable outside the crate.
#![allow(unreachable_pub, dead_code)]

use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::rc::Rc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use vak_client::{Clock, RngEntropy, ServerDescriptor, Transport};
use vak_proto::testing::TestAuthority;
use vak_proto::wire::{ENVELOPE_MAGIC, WordSlice, unframe};
use vak_proto::{Nonce, tag};

pub const SEC: u64 = 1_000_000;

/// Start of every scripted session.
pub const T0: u64 = TestAuthority::DEFAULT_MIDPOINT_US;

/// A clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug)]
pub struct FakeClock(Rc<Cell<u64>>);

impl FakeClock {
    pub fn new(start_us: u64) -> Self {
        FakeClock(Rc::new(Cell::new(start_us)))
    }

    pub fn advance(&self, us: u64) {
        self.0.set(self.0.get() + us);
    }
}

impl Clock for FakeClock {
    fn now_microseconds(&self) -> u64 {
        self.0.get()
    }
}

/// Produces the datagrams an authority sends back for a query nonce, given
/// the time the query was sent.
pub type Responder = Box<dyn FnMut(&Nonce, u64) -> Vec<Vec<u8>>>;

struct Script {
    latency_us: u64,
    respond: Responder,
}

/// In-memory transport. Each empty `recv` advances the shared clock by one
/// poll interval; a reply advances it by the host's latency.
pub struct ScriptedTransport {
    clock: FakeClock,
    poll_us: u64,
    scripts: HashMap<String, Script>,
    pending: VecDeque<Vec<u8>>,
    latency_us: u64,
    /// Hosts queries were sent to, in order.
    pub sent: Vec<String>,
}

impl ScriptedTransport {
    pub fn new(clock: FakeClock, poll_us: u64) -> Self {
        ScriptedTransport {
            clock,
            poll_us,
            scripts: HashMap::new(),
            pending: VecDeque::new(),
            latency_us: 0,
            sent: Vec::new(),
        }
    }

    /// Answer queries to `host` with `respond`. Hosts with no script are
    /// unreachable.
    pub fn script(
        mut self,
        host: &str,
        latency_us: u64,
        respond: impl FnMut(&Nonce, u64) -> Vec<Vec<u8>> + 'static,
    ) -> Self {
        self.scripts.insert(
            host.to_string(),
            Script {
                latency_us,
                respond: Box::new(respond),
            },
        );
        self
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, host: &str, _port: u16, packet: &[u8]) -> io::Result<()> {
        self.sent.push(host.to_string());
        self.pending.clear();
        let Some(script) = self.scripts.get_mut(host) else {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("{host} unreachable"),
            ));
        };
        let nonce = nonce_from_query(packet);
        self.pending
            .extend((script.respond)(&nonce, self.clock.now_microseconds()));
        self.latency_us = script.latency_us;
        Ok(())
    }

    fn recv(&mut self, max_len: usize) -> io::Result<Option<Vec<u8>>> {
        match self.pending.pop_front() {
            Some(mut reply) => {
                self.clock.advance(self.latency_us);
                self.latency_us = 0;
                reply.truncate(max_len);
                Ok(Some(reply))
            }
            None => {
                self.clock.advance(self.poll_us);
                Ok(None)
            }
        }
    }
}

/// Recover the full nonce from a query packet. IETF queries carry only the
/// first 32 bytes; the rest is zero, which is all verification looks at.
pub fn nonce_from_query(packet: &[u8]) -> Nonce {
    let message = if packet.starts_with(&ENVELOPE_MAGIC) {
        unframe(packet).unwrap()
    } else {
        packet
    };
    let nonc = WordSlice::new(message)
        .unwrap()
        .get_tag(tag::NONC)
        .unwrap();
    let mut bytes = [0u8; 64];
    bytes[..nonc.as_bytes().len()].copy_from_slice(nonc.as_bytes());
    Nonce::from_bytes(bytes)
}

/// Responder for an authority whose clock is `offset_us` ahead of ours.
pub fn honest(mut authority: TestAuthority, offset_us: u64, variant: u32) -> Responder {
    Box::new(move |nonce: &Nonce, now_us: u64| {
        authority.midpoint_us = now_us + offset_us;
        vec![authority.respond(nonce, variant)]
    })
}

/// Responder for an authority that never answers.
pub fn silent() -> Responder {
    Box::new(|_: &Nonce, _: u64| Vec::new())
}

pub fn descriptor(host: &str, authority: &TestAuthority, variant: u32) -> ServerDescriptor {
    ServerDescriptor::new(host, 2002, variant, authority.public_key())
}

pub fn entropy(seed: u64) -> RngEntropy<StdRng> {
    RngEntropy(StdRng::seed_from_u64(seed))
}
