// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Roughtime wire format, query construction, and response verification.
//!
//! This crate is the protocol half of the `vak` client. It knows how to build
//! a query for an authority, and how to decide whether the authority's reply
//! is a genuine, fresh answer to that query. It performs no I/O.
//!
//! Two incompatible protocol generations are supported, selected by the
//! authority's *variant* (the Roughtime draft number it speaks):
//!
//! - **Legacy** (variant 0–4): Google Roughtime, 64-byte nonces, SHA-512
//!   Merkle trees, no packet envelope.
//! - **IETF** (variant 5 and later): `ROUGHTIM` envelope, 32-byte nonces,
//!   32-byte Merkle nodes and MJD-encoded timestamps.
//!
//! # Usage
//!
//! ```no_run
//! use vak_proto::{Nonce, build_query, verify_response};
//!
//! let nonce = Nonce::from_bytes([0x5a; 64]);
//! let packet = build_query(&nonce, 7);
//!
//! // Send `packet` to the authority, receive `reply`.
//! # let reply: Vec<u8> = Vec::new();
//! # let authority_key = [0u8; 32];
//!
//! let time = verify_response(&nonce, &reply, &authority_key, 7).unwrap();
//! println!("{}us ±{}us", time.midpoint_us, time.radius_us);
//! ```
//!
//! # Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `std` | yes | `std::error::Error` and `io::Error` conversions. Without it the crate is `no_std` + `alloc`. |
//! | `test-util` | no | [`testing::TestAuthority`], which mints signed responses for tests and fuzzing. |

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Error taxonomy for codec and verification failures.
pub mod error;

/// Variant-indexed protocol generation constants.
pub mod profile;

/// Query packet construction.
pub mod query;

/// Tag constants, nonces, and verified time values.
pub mod types;

/// Response verification pipeline: signatures, Merkle proof, bounds.
pub mod verify;

/// Word-aligned tagged message codec and packet envelope.
pub mod wire;

/// Signing authority for tests. Not for production use.
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use error::{RoughtimeError, SignatureStage};
pub use profile::{HashFunction, Profile};
pub use query::{QUERY_MESSAGE_LEN, build_query};
pub use types::{Nonce, VerifiedTime, tag};
pub use verify::{mjd_to_unix_micros, verify_response};
pub use wire::{WordSlice, encode_message, frame, unframe};
