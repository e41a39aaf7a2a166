// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Roughtime tag constants, nonces, and verified time values.

use crate::profile::Profile;

/// Well-known Roughtime tag constants.
///
/// Tags are 4-byte ASCII values compared as little-endian `u32` for sort order.
pub mod tag {
    /// Certificate: contains nested DELE and SIG.
    pub const CERT: [u8; 4] = *b"CERT";
    /// Delegation: contains MINT, MAXT, PUBK.
    pub const DELE: [u8; 4] = *b"DELE";
    /// Index of our leaf in the Merkle tree.
    pub const INDX: [u8; 4] = *b"INDX";
    /// Maximum delegation time.
    pub const MAXT: [u8; 4] = *b"MAXT";
    /// Midpoint timestamp.
    pub const MIDP: [u8; 4] = *b"MIDP";
    /// Minimum delegation time.
    pub const MINT: [u8; 4] = *b"MINT";
    /// Client nonce.
    pub const NONC: [u8; 4] = *b"NONC";
    /// Padding that fills a query up to its fixed size.
    pub const PAD: [u8; 4] = *b"PAD\xff";
    /// Merkle sibling path.
    pub const PATH: [u8; 4] = *b"PATH";
    /// Delegated Ed25519 public key (32 bytes).
    pub const PUBK: [u8; 4] = *b"PUBK";
    /// Radius of uncertainty (microseconds).
    pub const RADI: [u8; 4] = *b"RADI";
    /// Merkle tree root.
    pub const ROOT: [u8; 4] = *b"ROOT";
    /// Ed25519 signature (64 bytes).
    pub const SIG: [u8; 4] = *b"SIG\0";
    /// Signed response: contains MIDP, RADI, ROOT.
    pub const SREP: [u8; 4] = *b"SREP";
    /// Protocol version.
    pub const VER: [u8; 4] = *b"VER\0";

    /// The tag as the little-endian `u32` used for ordering and on the wire.
    pub const fn as_u32(tag: [u8; 4]) -> u32 {
        u32::from_le_bytes(tag)
    }
}

/// Size of the nonce buffer. Legacy variants use all of it, IETF variants
/// use the first 32 bytes.
pub const NONCE_LEN: usize = 64;

/// A query nonce.
///
/// Nonces must come from a cryptographically secure source; a predictable
/// nonce lets an attacker replay a response computed in advance.
#[derive(Clone, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_LEN]);

impl Nonce {
    /// Wrap 64 bytes of randomness.
    pub const fn from_bytes(bytes: [u8; NONCE_LEN]) -> Self {
        Nonce(bytes)
    }

    /// All 64 bytes.
    pub fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }

    /// The prefix that goes on the wire for `profile`.
    pub fn for_profile(&self, profile: &Profile) -> &[u8] {
        &self.0[..profile.nonce_len]
    }
}

impl core::fmt::Debug for Nonce {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Nonce(")?;
        for b in &self.0[..8] {
            write!(f, "{b:02x}")?;
        }
        write!(f, "..)")
    }
}

/// Time reported by an authority whose response passed verification.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VerifiedTime {
    /// Midpoint in microseconds since the Unix epoch.
    pub midpoint_us: u64,
    /// Radius of uncertainty in microseconds.
    pub radius_us: u32,
}

impl VerifiedTime {
    /// Midpoint as seconds since Unix epoch (truncated).
    pub fn midpoint_seconds(&self) -> u64 {
        self.midpoint_us / 1_000_000
    }

    /// Radius as seconds (rounded up).
    pub fn radius_seconds(&self) -> u32 {
        self.radius_us.div_ceil(1_000_000)
    }

    /// `[midpoint - radius, midpoint + radius]`, saturating at the ends of `u64`.
    pub fn interval_us(&self) -> (u64, u64) {
        let r = u64::from(self.radius_us);
        (
            self.midpoint_us.saturating_sub(r),
            self.midpoint_us.saturating_add(r),
        )
    }
}
