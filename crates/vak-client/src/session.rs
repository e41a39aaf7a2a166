// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Sans-I/O session that queries authorities one at a time until enough of
//! them agree.
//!
//! The session owns the authority list, the thresholds and the consensus
//! engine, but never touches a socket or a clock. A driver (see
//! [`run`](crate::runner::run)) feeds it the current time, the datagrams that
//! arrive and the passage of time:
//!
//! ```text
//! Idle ──start_query──▶ QuerySent ──handle_datagram (valid)──▶ Idle | Done
//!                          │  ▲
//!                          │  └── handle_datagram (invalid): stays
//!                          └──── handle_tick (deadline) / abandon ──▶ Idle
//! Idle ──start_query, no authorities left──▶ Done (exhausted)
//! ```
//!
//! Each verified response contributes the *clock correction* it implies,
//! `[midpoint - local - uncertainty, midpoint - local + uncertainty]`, where
//! `local` is the midpoint of the round trip on our clock and the uncertainty
//! is half the round trip plus the authority's radius. Working in corrections
//! rather than absolute times lets responses received at different moments
//! be compared directly.

use std::io;

use tracing::{debug, info, warn};
use vak_proto::{Nonce, RoughtimeError, VerifiedTime, build_query, verify_response};

use crate::config::{ServerDescriptor, Thresholds};
use crate::entropy::Entropy;
use crate::error::{ClientError, ConfigError};
use crate::overlap::{Overlap, OverlapAlgorithm};

/// A query ready to be sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingQuery {
    /// Label of the authority being asked.
    pub authority: String,
    /// Destination host.
    pub host: String,
    /// Destination port.
    pub port: u16,
    /// Encoded query packet.
    pub packet: Vec<u8>,
}

/// A verified response that did not (yet) settle the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcceptedResponse {
    /// Label of the authority that answered.
    pub authority: String,
    /// Time the authority vouched for.
    pub time: VerifiedTime,
    /// Round trip in microseconds.
    pub rtt_us: u64,
    /// Implied clock correction, in microseconds.
    pub adjustment_us: i64,
    /// Half-width of the correction interval, in microseconds.
    pub uncertainty_us: u64,
    /// Best consensus so far.
    pub best: Overlap,
}

/// The consensus a session settled on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Lower bound of the agreed clock correction, in microseconds.
    pub lo_us: i64,
    /// Upper bound of the agreed clock correction, in microseconds.
    pub hi_us: i64,
    /// Number of responses whose intervals contain `[lo_us, hi_us]`.
    pub support: usize,
    /// Verified responses received.
    pub responses: usize,
    /// Queries sent.
    pub queries: usize,
}

impl SyncOutcome {
    /// Correction to add to the local clock: the middle of the agreement.
    pub fn adjustment_us(&self) -> i64 {
        i64::midpoint(self.lo_us, self.hi_us)
    }

    /// Half the width of the agreement.
    pub fn uncertainty_us(&self) -> u64 {
        self.hi_us.abs_diff(self.lo_us) / 2
    }
}

/// What [`Session::handle_datagram`] made of a datagram.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatagramOutcome {
    /// Verified and recorded; the session moves on to the next authority.
    Accepted(AcceptedResponse),
    /// Verified, and consensus now meets every threshold. The session is done.
    Synchronized(SyncOutcome),
    /// Failed verification; the query stays in flight.
    Rejected(RoughtimeError),
    /// No query in flight.
    Ignored,
}

/// What [`Session::handle_tick`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The in-flight query still has time.
    Waiting,
    /// The in-flight query ran out of time and was given up.
    TimedOut {
        /// Label of the silent authority.
        authority: String,
        /// The last verification failure for this query, if any packet arrived.
        last_error: Option<RoughtimeError>,
    },
    /// Nothing in flight.
    Idle,
}

/// How one authority fared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthorityOutcome {
    /// Never asked.
    Skipped,
    /// Answered with a verified response.
    Accepted {
        /// Implied clock correction, in microseconds.
        adjustment_us: i64,
        /// Half-width of the correction interval, in microseconds.
        uncertainty_us: u64,
        /// Round trip in microseconds.
        rtt_us: u64,
    },
    /// No verified response before the deadline.
    TimedOut {
        /// Packets that arrived but failed verification.
        invalid_responses: usize,
    },
    /// The transport could not deliver the query.
    TransportFailed {
        /// The transport's error message.
        detail: String,
    },
}

/// One line of a [`SessionReport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorityReport {
    /// Authority label.
    pub authority: String,
    /// What happened.
    pub outcome: AuthorityOutcome,
}

/// Everything a session did, for display or diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionReport {
    /// One entry per authority, in query order.
    pub authorities: Vec<AuthorityReport>,
    /// Queries sent.
    pub queries: usize,
    /// Verified responses.
    pub responses: usize,
    /// Packets that failed verification.
    pub invalid: usize,
    /// Authorities that timed out.
    pub timeouts: usize,
    /// Authorities the transport could not reach.
    pub transport_failures: usize,
    /// Best consensus seen.
    pub best: Option<Overlap>,
}

#[derive(Debug)]
struct InFlight {
    index: usize,
    nonce: Nonce,
    sent_us: u64,
    invalid: usize,
    last_error: Option<RoughtimeError>,
}

#[derive(Debug)]
enum State {
    Idle,
    QuerySent(InFlight),
    Done,
}

/// Multi-authority query session.
#[derive(Debug)]
pub struct Session {
    authorities: Vec<ServerDescriptor>,
    thresholds: Thresholds,
    next: usize,
    state: State,
    consensus: OverlapAlgorithm,
    outcomes: Vec<AuthorityOutcome>,
    queries: usize,
    invalid: usize,
    timeouts: usize,
    transport_failures: usize,
    best_support: usize,
    result: Option<SyncOutcome>,
}

impl Session {
    /// A session that will ask `authorities` in the given order.
    ///
    /// Shuffle the list first (see
    /// [`shuffle_authorities`](crate::entropy::shuffle_authorities)) unless a
    /// fixed order is wanted.
    pub fn new(
        authorities: Vec<ServerDescriptor>,
        thresholds: Thresholds,
    ) -> Result<Self, ConfigError> {
        if authorities.is_empty() {
            return Err(ConfigError::NoAuthorities);
        }
        thresholds.validate()?;
        let outcomes = vec![AuthorityOutcome::Skipped; authorities.len()];
        Ok(Session {
            authorities,
            thresholds,
            next: 0,
            state: State::Idle,
            consensus: OverlapAlgorithm::new(),
            outcomes,
            queries: 0,
            invalid: 0,
            timeouts: 0,
            transport_failures: 0,
            best_support: 0,
            result: None,
        })
    }

    /// The thresholds this session was created with.
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Authorities not yet asked.
    pub fn remaining(&self) -> usize {
        self.authorities.len() - self.next
    }

    /// `true` once the session has synchronized or run out of authorities.
    pub fn is_done(&self) -> bool {
        matches!(self.state, State::Done)
    }

    /// The consensus, once synchronized.
    pub fn outcome(&self) -> Option<&SyncOutcome> {
        self.result.as_ref()
    }

    /// `true` while a query awaits its response.
    pub fn in_flight(&self) -> bool {
        matches!(self.state, State::QuerySent(_))
    }

    /// First instant at which [`handle_tick`](Self::handle_tick) gives up on
    /// the in-flight query.
    pub fn deadline_us(&self) -> Option<u64> {
        match &self.state {
            State::QuerySent(f) => Some(
                f.sent_us
                    .saturating_add(self.thresholds.timeout_us())
                    .saturating_add(1),
            ),
            _ => None,
        }
    }

    fn exhausted(&self) -> ClientError {
        ClientError::Exhausted {
            responses: self.consensus.len(),
            best_support: self.best_support,
        }
    }

    /// Prepare a query to the next authority.
    ///
    /// A query still in flight is given up as timed out. Once every
    /// authority has been asked, or the session is done, this returns
    /// [`ClientError::Exhausted`].
    pub fn start_query<E: Entropy + ?Sized>(
        &mut self,
        now_us: u64,
        entropy: &mut E,
    ) -> Result<OutgoingQuery, ClientError> {
        if self.is_done() {
            return Err(self.exhausted());
        }
        if let State::QuerySent(flight) = std::mem::replace(&mut self.state, State::Idle) {
            self.record_timeout(flight);
        }
        if self.next >= self.authorities.len() {
            self.state = State::Done;
            let err = self.exhausted();
            warn!(
                responses = self.consensus.len(),
                best_support = self.best_support,
                "roughtime: authorities exhausted without consensus"
            );
            return Err(err);
        }

        let mut bytes = [0u8; 64];
        entropy.fill_random(&mut bytes)?;
        let nonce = Nonce::from_bytes(bytes);

        let index = self.next;
        self.next += 1;
        let server = &self.authorities[index];
        let packet = build_query(&nonce, server.variant);
        let query = OutgoingQuery {
            authority: server.label(),
            host: server.host.clone(),
            port: server.port,
            packet,
        };
        debug!(authority = %query.authority, variant = server.variant, "roughtime: query");

        self.queries += 1;
        self.state = State::QuerySent(InFlight {
            index,
            nonce,
            sent_us: now_us,
            invalid: 0,
            last_error: None,
        });
        Ok(query)
    }

    /// Feed a datagram received at `now_us`.
    pub fn handle_datagram(&mut self, bytes: &[u8], now_us: u64) -> DatagramOutcome {
        let State::QuerySent(flight) = &mut self.state else {
            return DatagramOutcome::Ignored;
        };
        let server = &self.authorities[flight.index];

        let time = match verify_response(&flight.nonce, bytes, &server.public_key, server.variant)
        {
            Ok(time) => time,
            Err(e) => {
                debug!(authority = %server.label(), error = %e, "roughtime: rejected response");
                flight.invalid += 1;
                flight.last_error = Some(e.clone());
                self.invalid += 1;
                return DatagramOutcome::Rejected(e);
            }
        };

        let rtt_us = now_us.saturating_sub(flight.sent_us);
        let local_us = flight.sent_us.saturating_add(rtt_us / 2);
        let adjustment_us = to_i64(time.midpoint_us).saturating_sub(to_i64(local_us));
        let uncertainty_us = (rtt_us / 2).saturating_add(u64::from(time.radius_us));
        let half = to_i64(uncertainty_us);
        self.consensus.push_interval(
            adjustment_us.saturating_sub(half),
            adjustment_us.saturating_add(half),
        );

        let authority = server.label();
        let index = flight.index;
        self.state = State::Idle;
        self.outcomes[index] = AuthorityOutcome::Accepted {
            adjustment_us,
            uncertainty_us,
            rtt_us,
        };

        let Some(best) = self.consensus.find_best_overlap() else {
            // Unreachable: an interval was just added.
            return DatagramOutcome::Ignored;
        };
        self.best_support = self.best_support.max(best.support);
        debug!(
            authority = %authority,
            rtt_us,
            adjustment_us,
            uncertainty_us,
            support = best.support,
            "roughtime: response accepted"
        );

        let responses = self.consensus.len();
        if best.support >= self.thresholds.min_overlaps
            && 2 * best.support > responses
            && best.width() <= self.thresholds.max_uncertainty_us()
        {
            let outcome = SyncOutcome {
                lo_us: best.lo,
                hi_us: best.hi,
                support: best.support,
                responses,
                queries: self.queries,
            };
            info!(
                adjustment_us = outcome.adjustment_us(),
                uncertainty_us = outcome.uncertainty_us(),
                support = outcome.support,
                responses,
                "roughtime: synchronized"
            );
            self.result = Some(outcome);
            self.state = State::Done;
            return DatagramOutcome::Synchronized(outcome);
        }

        DatagramOutcome::Accepted(AcceptedResponse {
            authority,
            time,
            rtt_us,
            adjustment_us,
            uncertainty_us,
            best,
        })
    }

    /// Let the session notice that time has passed.
    pub fn handle_tick(&mut self, now_us: u64) -> TickOutcome {
        let State::QuerySent(flight) = &self.state else {
            return TickOutcome::Idle;
        };
        if now_us.saturating_sub(flight.sent_us) <= self.thresholds.timeout_us() {
            return TickOutcome::Waiting;
        }
        let State::QuerySent(flight) = std::mem::replace(&mut self.state, State::Idle) else {
            return TickOutcome::Idle;
        };
        let authority = self.authorities[flight.index].label();
        let last_error = flight.last_error.clone();
        self.record_timeout(flight);
        TickOutcome::TimedOut {
            authority,
            last_error,
        }
    }

    fn record_timeout(&mut self, flight: InFlight) {
        debug!(
            authority = %self.authorities[flight.index].label(),
            invalid = flight.invalid,
            "roughtime: timed out"
        );
        self.timeouts += 1;
        self.outcomes[flight.index] = AuthorityOutcome::TimedOut {
            invalid_responses: flight.invalid,
        };
    }

    /// Give up on the in-flight query because the transport failed.
    pub fn abandon(&mut self, error: &io::Error) {
        let State::QuerySent(flight) = std::mem::replace(&mut self.state, State::Idle) else {
            return;
        };
        let authority = self.authorities[flight.index].label();
        warn!(authority = %authority, error = %error, "roughtime: transport failure");
        self.transport_failures += 1;
        self.outcomes[flight.index] = AuthorityOutcome::TransportFailed {
            detail: error.to_string(),
        };
    }

    /// Snapshot of what the session has done so far.
    pub fn report(&self) -> SessionReport {
        SessionReport {
            authorities: self
                .authorities
                .iter()
                .zip(&self.outcomes)
                .map(|(server, outcome)| AuthorityReport {
                    authority: server.label(),
                    outcome: outcome.clone(),
                })
                .collect(),
            queries: self.queries,
            responses: self.consensus.len(),
            invalid: self.invalid,
            timeouts: self.timeouts,
            transport_failures: self.transport_failures,
            best: self.consensus.find_best_overlap(),
        }
    }
}

fn to_i64(us: u64) -> i64 {
    i64::try_from(us).unwrap_or(i64::MAX)
}
