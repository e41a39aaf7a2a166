// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Tokio driver.
//!
//! Drives the same [`Session`] as [`run`](crate::runner::run), but waits on a
//! tokio `UdpSocket` with `tokio::time::timeout` instead of polling.
//!
//! ```no_run
//! # async fn example() -> Result<(), vak_client::ClientError> {
//! use vak_client::{OsEntropy, Session, SystemClock, Thresholds, async_run};
//!
//! let mut session = Session::new(
//!     vak_client::well_known_authorities(),
//!     Thresholds::default().with_min_overlaps(2),
//! )?;
//! let sync = async_run(&mut session, &SystemClock, &mut OsEntropy).await?;
//! println!("adjust by {}us", sync.adjustment_us());
//! # Ok(())
//! # }
//! ```

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::debug;

use crate::clock::Clock;
use crate::entropy::Entropy;
use crate::error::ClientError;
use crate::session::{DatagramOutcome, OutgoingQuery, Session, SyncOutcome};
use crate::transport::{MAX_DATAGRAM, bind_addr_for};

/// Drive `session` to completion over UDP, one authority at a time.
///
/// `clock` must follow real time: the wait for each authority is computed
/// from [`Session::deadline_us`] and the clock's reading.
pub async fn async_run<C, E>(
    session: &mut Session,
    clock: &C,
    entropy: &mut E,
) -> Result<SyncOutcome, ClientError>
where
    C: Clock + ?Sized,
    E: Entropy + ?Sized,
{
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        if let Some(outcome) = session.outcome() {
            return Ok(*outcome);
        }
        let query = session.start_query(clock.now_microseconds(), entropy)?;
        let (sock, peer) = match send_query(&query).await {
            Ok(sent) => sent,
            Err(e) => {
                session.abandon(&e);
                continue;
            }
        };

        while let Some(deadline) = session.deadline_us() {
            let wait = Duration::from_micros(deadline.saturating_sub(clock.now_microseconds()));
            match tokio::time::timeout(wait, sock.recv_from(&mut buf)).await {
                Ok(Ok((len, src))) if src == peer => {
                    debug!("roughtime: recv {} bytes from {:?}", len, src);
                    if let DatagramOutcome::Synchronized(outcome) =
                        session.handle_datagram(&buf[..len], clock.now_microseconds())
                    {
                        return Ok(outcome);
                    }
                }
                Ok(Ok((len, src))) => {
                    debug!("roughtime: dropped {} bytes from unexpected {:?}", len, src);
                }
                Ok(Err(e)) => {
                    session.abandon(&e);
                    break;
                }
                Err(_elapsed) => {}
            }
            session.handle_tick(clock.now_microseconds());
        }
    }
}

async fn send_query(query: &OutgoingQuery) -> io::Result<(UdpSocket, SocketAddr)> {
    let target = tokio::net::lookup_host((query.host.as_str(), query.port))
        .await?
        .next()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "address resolved to no socket addresses",
            )
        })?;
    let sock = UdpSocket::bind(bind_addr_for(&target)).await?;
    let sz = sock.send_to(&query.packet, target).await?;
    debug!("roughtime: sent {} bytes to {:?}", sz, target);
    Ok((sock, target))
}
