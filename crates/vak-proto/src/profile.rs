// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Protocol generation constants, indexed by variant.
//!
//! Everything that differs between Roughtime generations lives in one
//! [`Profile`] table so the codec and verifier never branch on raw variant
//! numbers:
//!
//! | variants | envelope | nonce | node | hash | delegation context |
//! |----------|----------|-------|------|------|--------------------|
//! | 0–4      | no       | 64    | 64   | SHA-512 | `...signature--\0` |
//! | 5–6      | yes      | 32    | 32   | SHA-512, first 32 bytes | `...signature--\0` |
//! | 7+       | yes      | 32    | 32   | SHA-512/256 | `...signature\0` |

use ring::digest;

/// First variant that uses the `ROUGHTIM` envelope and MJD timestamps.
pub const FIRST_IETF_VARIANT: u32 = 5;

/// First variant that uses SHA-512/256 and the shortened delegation context.
pub const FIRST_SHA512_256_VARIANT: u32 = 7;

/// Context prepended to the delegation before the long-term key signs it
/// (Google Roughtime and early IETF drafts).
pub const LEGACY_DELEGATION_CONTEXT: &[u8] = b"RoughTime v1 delegation signature--\0";

/// Context prepended to the delegation in later IETF drafts.
pub const DELEGATION_CONTEXT: &[u8] = b"RoughTime v1 delegation signature\0";

/// Context prepended to `SREP` before the delegated key signs it.
pub const RESPONSE_CONTEXT: &[u8] = b"RoughTime v1 response signature\0";

/// Domain separator hashed before a Merkle leaf.
pub const LEAF_PREFIX: &[u8] = &[0x00];

/// Domain separator hashed before two Merkle children.
pub const NODE_PREFIX: &[u8] = &[0x01];

/// Hash used for Merkle leaves and nodes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HashFunction {
    /// Full SHA-512; the output is truncated to the node size.
    Sha512,
    /// SHA-512/256 (distinct initial values, 32-byte output).
    Sha512_256,
}

impl HashFunction {
    fn algorithm(self) -> &'static digest::Algorithm {
        match self {
            HashFunction::Sha512 => &digest::SHA512,
            HashFunction::Sha512_256 => &digest::SHA512_256,
        }
    }

    /// Hash the concatenation of `parts`.
    pub fn hash(self, parts: &[&[u8]]) -> digest::Digest {
        let mut ctx = digest::Context::new(self.algorithm());
        for part in parts {
            ctx.update(part);
        }
        ctx.finish()
    }
}

/// Generation-specific constants for one protocol variant.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Profile {
    /// The variant this profile was selected for.
    pub variant: u32,
    /// Whether packets carry the `ROUGHTIM` envelope and `VER` tag.
    pub framed: bool,
    /// Nonce bytes placed in `NONC` and hashed into the Merkle leaf.
    pub nonce_len: usize,
    /// Size of a Merkle node (and of `ROOT`).
    pub node_len: usize,
    /// Merkle hash.
    pub hash: HashFunction,
    /// Context for the delegation signature.
    pub delegation_context: &'static [u8],
    /// Whether `MIDP` is MJD-encoded (days << 40 | microseconds of day).
    pub mjd_timestamps: bool,
}

impl Profile {
    /// Look up the profile for `variant`.
    pub const fn for_variant(variant: u32) -> Profile {
        if variant < FIRST_IETF_VARIANT {
            Profile {
                variant,
                framed: false,
                nonce_len: 64,
                node_len: 64,
                hash: HashFunction::Sha512,
                delegation_context: LEGACY_DELEGATION_CONTEXT,
                mjd_timestamps: false,
            }
        } else if variant < FIRST_SHA512_256_VARIANT {
            Profile {
                variant,
                framed: true,
                nonce_len: 32,
                node_len: 32,
                hash: HashFunction::Sha512,
                delegation_context: LEGACY_DELEGATION_CONTEXT,
                mjd_timestamps: true,
            }
        } else {
            Profile {
                variant,
                framed: true,
                nonce_len: 32,
                node_len: 32,
                hash: HashFunction::Sha512_256,
                delegation_context: DELEGATION_CONTEXT,
                mjd_timestamps: true,
            }
        }
    }

    /// Hash the concatenation of `parts` and write the first `node_len`
    /// bytes of the digest into `out`.
    pub(crate) fn hash_into(&self, parts: &[&[u8]], out: &mut [u8; 64]) {
        let digest = self.hash.hash(parts);
        out[..self.node_len].copy_from_slice(&digest.as_ref()[..self.node_len]);
    }
}
