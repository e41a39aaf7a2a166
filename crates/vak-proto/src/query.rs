// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Query packet construction.
//!
//! Queries are padded to a fixed size so that a response is never larger than
//! the request that triggered it, which keeps authorities from being useful
//! as amplifiers.

use alloc::vec;
use alloc::vec::Vec;

use crate::profile::Profile;
use crate::types::{Nonce, tag};
use crate::wire;

/// Size of the tagged message in every query, excluding any envelope.
pub const QUERY_MESSAGE_LEN: usize = 1024;

/// Value of the `VER` tag sent in IETF queries (draft 8 wire version).
pub const PROTOCOL_VERSION: u32 = 0x0800_0003;

/// Build the query packet for `nonce` in the format of `variant`.
///
/// Legacy variants get a bare 1024-byte message carrying the full 64-byte
/// nonce. IETF variants get a `VER` tag, a 32-byte nonce and the `ROUGHTIM`
/// envelope, for 1036 bytes on the wire.
pub fn build_query(nonce: &Nonce, variant: u32) -> Vec<u8> {
    let profile = Profile::for_variant(variant);
    let nonce = nonce.for_profile(&profile);
    let version = PROTOCOL_VERSION.to_le_bytes();

    let mut entries: Vec<([u8; 4], &[u8])> = Vec::with_capacity(3);
    if profile.framed {
        entries.push((tag::VER, &version[..]));
    }
    entries.push((tag::NONC, nonce));

    // Count, offsets and tags take two words per entry, PAD included.
    let header_len = 8 * (entries.len() + 1);
    let used: usize = entries.iter().map(|(_, value)| value.len()).sum();
    let padding = vec![0u8; QUERY_MESSAGE_LEN - header_len - used];
    entries.push((tag::PAD, &padding[..]));

    // Entries are sorted and word-sized by construction.
    let message = match wire::encode_message(&entries) {
        Ok(message) => message,
        Err(_) => unreachable!("query entries are fixed and well formed"),
    };

    if profile.framed {
        wire::frame(&message)
    } else {
        message
    }
}
