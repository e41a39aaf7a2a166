// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

/*!
Roughtime client that asks several authorities and only trusts their agreement.

A single Roughtime authority proves that *it* said a particular time, but a
wrong or compromised authority can still say the wrong one. A [`Session`]
queries authorities one at a time, verifies every response with
[`vak_proto`], and turns each into the clock correction it implies. Once
enough of those corrections overlap in a tight enough interval, the overlap
is the answer.

# Example

```rust,no_run
use vak_client::{
    OsEntropy, Session, SystemClock, Thresholds, UdpTransport, run, shuffle_authorities,
    well_known_authorities,
};

fn main() -> Result<(), vak_client::ClientError> {
    let mut authorities = well_known_authorities();
    shuffle_authorities(&mut authorities, &mut OsEntropy)?;

    let thresholds = Thresholds::default().with_min_overlaps(2);
    let mut session = Session::new(authorities, thresholds)?;
    let mut transport = UdpTransport::new(thresholds.poll_interval);
    let sync = run(&mut session, &mut transport, &SystemClock, &mut OsEntropy)?;

    println!("Offset: {}us ±{}us", sync.adjustment_us(), sync.uncertainty_us());
    Ok(())
}
```

# Feature Flags

| Feature | Default | Description |
|---------|---------|-------------|
| `tokio` | no | [`async_run`], driving a session over a tokio `UdpSocket`. |
| `clock` | no | [`SystemClock::set_offset`](clock::Clock::set_offset) steps the system clock (`libc`). |
| `ecosystem` | no | Load authorities from a Roughtime ecosystem JSON file (`serde_json`). |
*/

#![warn(missing_docs)]

pub use vak_proto::{Nonce, VerifiedTime};

/// Error types for sessions and drivers.
pub mod error;

/// Interval overlap consensus.
pub mod overlap;

/// Authority descriptors, thresholds, and the ecosystem file loader.
pub mod config;

/// Nonce randomness and authority shuffling.
pub mod entropy;

/// Wall clock reads and clock stepping.
pub mod clock;

/// Datagram transport trait and the blocking UDP implementation.
pub mod transport;

/// The multi-authority session state machine.
pub mod session;

/// Blocking session driver and single-authority query.
pub mod runner;

/// Session driver on the tokio runtime.
#[cfg(feature = "tokio")]
pub mod async_runner;

pub use clock::{Clock, ClockError, SystemClock};
pub use config::{ServerDescriptor, Thresholds, well_known_authorities};
pub use entropy::{Entropy, OsEntropy, RngEntropy, shuffle_authorities};
pub use error::ClientError;
pub use overlap::{Overlap, OverlapAlgorithm};
pub use runner::{query_authority, run};
pub use session::{DatagramOutcome, Session, SessionReport, SyncOutcome, TickOutcome};
pub use transport::{Transport, UdpTransport};

#[cfg(feature = "tokio")]
pub use async_runner::async_run;
