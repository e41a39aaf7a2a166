// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Blocking drivers.
//!
//! # Examples
//!
//! ```no_run
//! use vak_client::{
//!     OsEntropy, Session, SystemClock, Thresholds, UdpTransport, run, shuffle_authorities,
//!     well_known_authorities,
//! };
//!
//! # fn main() -> Result<(), vak_client::ClientError> {
//! let mut authorities = well_known_authorities();
//! shuffle_authorities(&mut authorities, &mut OsEntropy)?;
//!
//! let thresholds = Thresholds::default().with_min_overlaps(2);
//! let mut session = Session::new(authorities, thresholds)?;
//! let mut transport = UdpTransport::new(thresholds.poll_interval);
//!
//! let sync = run(&mut session, &mut transport, &SystemClock, &mut OsEntropy)?;
//! println!("adjust by {}us ±{}us", sync.adjustment_us(), sync.uncertainty_us());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tracing::debug;
use vak_proto::{Nonce, VerifiedTime, build_query, verify_response};

use crate::clock::Clock;
use crate::config::ServerDescriptor;
use crate::entropy::Entropy;
use crate::error::{ClientError, TimeoutError};
use crate::session::{DatagramOutcome, Session, SyncOutcome, TickOutcome};
use crate::transport::{MAX_DATAGRAM, Transport};

/// Drive `session` to completion over `transport`.
///
/// Returns the consensus once thresholds are met, or
/// [`ClientError::Exhausted`] after every authority has been tried. Transport
/// errors only cost the authority they happened on.
pub fn run<T, C, E>(
    session: &mut Session,
    transport: &mut T,
    clock: &C,
    entropy: &mut E,
) -> Result<SyncOutcome, ClientError>
where
    T: Transport + ?Sized,
    C: Clock + ?Sized,
    E: Entropy + ?Sized,
{
    loop {
        if let Some(outcome) = session.outcome() {
            return Ok(*outcome);
        }
        let query = session.start_query(clock.now_microseconds(), entropy)?;
        if let Err(e) = transport.send(&query.host, query.port, &query.packet) {
            session.abandon(&e);
            continue;
        }

        while session.in_flight() {
            match transport.recv(MAX_DATAGRAM) {
                Ok(Some(bytes)) => {
                    if let DatagramOutcome::Synchronized(outcome) =
                        session.handle_datagram(&bytes, clock.now_microseconds())
                    {
                        return Ok(outcome);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    session.abandon(&e);
                    break;
                }
            }
            if let TickOutcome::TimedOut { authority, .. } =
                session.handle_tick(clock.now_microseconds())
            {
                debug!(authority = %authority, "roughtime: moving on");
            }
        }
    }
}

/// Ask a single authority for the time, without consensus.
///
/// Packets that fail verification are skipped while time remains. If the
/// deadline passes after at least one bad packet, the last verification
/// error is returned instead of a timeout.
pub fn query_authority<T, C, E>(
    server: &ServerDescriptor,
    transport: &mut T,
    clock: &C,
    entropy: &mut E,
    timeout: Duration,
) -> Result<VerifiedTime, ClientError>
where
    T: Transport + ?Sized,
    C: Clock + ?Sized,
    E: Entropy + ?Sized,
{
    let mut bytes = [0u8; 64];
    entropy.fill_random(&mut bytes)?;
    let nonce = Nonce::from_bytes(bytes);
    let packet = build_query(&nonce, server.variant);

    let timeout_us = u64::try_from(timeout.as_micros()).unwrap_or(u64::MAX);
    let sent_us = clock.now_microseconds();
    transport.send(&server.host, server.port, &packet)?;

    let mut last_error = None;
    loop {
        if let Some(reply) = transport.recv(MAX_DATAGRAM)? {
            match verify_response(&nonce, &reply, &server.public_key, server.variant) {
                Ok(time) => return Ok(time),
                Err(e) => {
                    debug!(authority = %server.label(), error = %e, "roughtime: rejected response");
                    last_error = Some(e);
                }
            }
        }
        let waited_us = clock.now_microseconds().saturating_sub(sent_us);
        if waited_us > timeout_us {
            return Err(match last_error {
                Some(e) => ClientError::Verification(e),
                None => ClientError::Timeout(TimeoutError {
                    authority: server.address(),
                    waited_us,
                }),
            });
        }
    }
}
