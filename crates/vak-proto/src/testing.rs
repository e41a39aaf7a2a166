// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! A minimal Roughtime authority for tests, benchmarks and fuzzing.
//!
//! [`TestAuthority`] signs real Ed25519 delegations and responses with keys
//! derived from a fixed seed, so responses verify exactly like those from a
//! live server. It never reads a clock: the reported time is whatever the
//! test configures.

use alloc::vec;
use alloc::vec::Vec;

use ring::signature::{Ed25519KeyPair, KeyPair};

use crate::profile::{LEAF_PREFIX, NODE_PREFIX, Profile, RESPONSE_CONTEXT};
use crate::types::{Nonce, tag};
use crate::verify::MJD_UNIX_EPOCH;
use crate::wire::{encode_message, frame};

const MICROS_PER_DAY: u64 = 86_400_000_000;

/// Encode `unix_us` the way `variant` puts timestamps on the wire.
pub fn encode_timestamp(unix_us: u64, variant: u32) -> u64 {
    if Profile::for_variant(variant).mjd_timestamps {
        let days = unix_us / MICROS_PER_DAY + MJD_UNIX_EPOCH;
        (days << 40) | (unix_us % MICROS_PER_DAY)
    } else {
        unix_us
    }
}

/// A signing authority with a long-term key and one delegated online key.
pub struct TestAuthority {
    long_term: Ed25519KeyPair,
    online: Ed25519KeyPair,
    /// Midpoint reported in responses, in Unix microseconds.
    pub midpoint_us: u64,
    /// Radius reported in responses.
    pub radius_us: u32,
    /// Delegation validity window `(MINT, MAXT)` in Unix microseconds.
    pub window_us: (u64, u64),
    /// Number of leaves in the Merkle tree (a power of two).
    pub batch_size: usize,
    /// Leaf that carries the client's nonce.
    pub leaf_index: usize,
}

impl TestAuthority {
    /// 2024-01-01T00:00:00.5Z.
    pub const DEFAULT_MIDPOINT_US: u64 = 1_704_067_200_500_000;

    /// Create an authority whose keys derive from `seed`.
    pub fn new(seed: [u8; 32]) -> Self {
        let mut online_seed = seed;
        for b in &mut online_seed {
            *b ^= 0xFF;
        }
        let long_term =
            Ed25519KeyPair::from_seed_unchecked(&seed).expect("32-byte seed is always valid");
        let online = Ed25519KeyPair::from_seed_unchecked(&online_seed)
            .expect("32-byte seed is always valid");
        let midpoint_us = Self::DEFAULT_MIDPOINT_US;
        TestAuthority {
            long_term,
            online,
            midpoint_us,
            radius_us: 1_000_000,
            window_us: (midpoint_us - 86_400_000_000, midpoint_us + 86_400_000_000),
            batch_size: 1,
            leaf_index: 0,
        }
    }

    /// Report `midpoint_us` from now on.
    pub fn with_midpoint(mut self, midpoint_us: u64) -> Self {
        self.midpoint_us = midpoint_us;
        self
    }

    /// Report `radius_us` from now on.
    pub fn with_radius(mut self, radius_us: u32) -> Self {
        self.radius_us = radius_us;
        self
    }

    /// Sign delegations valid for `(min_us, max_us)`.
    pub fn with_window(mut self, min_us: u64, max_us: u64) -> Self {
        self.window_us = (min_us, max_us);
        self
    }

    /// Answer in a batch of `batch_size` leaves, our nonce at `leaf_index`.
    pub fn with_batch(mut self, batch_size: usize, leaf_index: usize) -> Self {
        assert!(batch_size.is_power_of_two(), "batch size must be a power of two");
        assert!(leaf_index < batch_size, "leaf index outside batch");
        self.batch_size = batch_size;
        self.leaf_index = leaf_index;
        self
    }

    /// The long-term public key clients pin.
    pub fn public_key(&self) -> [u8; 32] {
        let mut key = [0u8; 32];
        key.copy_from_slice(self.long_term.public_key().as_ref());
        key
    }

    /// Mint a signed response to `nonce` in the format of `variant`.
    pub fn respond(&self, nonce: &Nonce, variant: u32) -> Vec<u8> {
        let profile = Profile::for_variant(variant);
        let (root, path) = self.merkle_proof(&profile, nonce);

        let midp = encode_timestamp(self.midpoint_us, variant).to_le_bytes();
        let radi = self.radius_us.to_le_bytes();
        let srep = encode_sorted(&mut [
            (tag::RADI, &radi[..]),
            (tag::MIDP, &midp[..]),
            (tag::ROOT, &root[..]),
        ]);

        let mint = encode_timestamp(self.window_us.0, variant).to_le_bytes();
        let maxt = encode_timestamp(self.window_us.1, variant).to_le_bytes();
        let pubk: &[u8] = self.online.public_key().as_ref();
        let dele = encode_sorted(&mut [
            (tag::PUBK, pubk),
            (tag::MINT, &mint[..]),
            (tag::MAXT, &maxt[..]),
        ]);

        let dele_sig = self
            .long_term
            .sign(&[profile.delegation_context, &dele[..]].concat());
        let cert = encode_sorted(&mut [(tag::SIG, dele_sig.as_ref()), (tag::DELE, &dele[..])]);

        let srep_sig = self.online.sign(&[RESPONSE_CONTEXT, &srep[..]].concat());
        let indx = (self.leaf_index as u32).to_le_bytes();
        let message = encode_sorted(&mut [
            (tag::SIG, srep_sig.as_ref()),
            (tag::PATH, &path[..]),
            (tag::SREP, &srep[..]),
            (tag::CERT, &cert[..]),
            (tag::INDX, &indx[..]),
        ]);

        if profile.framed {
            frame(&message)
        } else {
            message
        }
    }

    /// Root and sibling path for our leaf. Other leaves hold nonces derived
    /// from their position.
    fn merkle_proof(&self, profile: &Profile, nonce: &Nonce) -> (Vec<u8>, Vec<u8>) {
        let node_len = profile.node_len;
        let mut level: Vec<Vec<u8>> = (0..self.batch_size)
            .map(|i| {
                let filler;
                let leaf_nonce = if i == self.leaf_index {
                    nonce.for_profile(profile)
                } else {
                    filler = Nonce::from_bytes([i as u8; 64]);
                    filler.for_profile(profile)
                };
                let mut out = [0u8; 64];
                profile.hash_into(&[LEAF_PREFIX, leaf_nonce], &mut out);
                out[..node_len].to_vec()
            })
            .collect();

        let mut path = Vec::new();
        let mut index = self.leaf_index;
        while level.len() > 1 {
            path.extend_from_slice(&level[index ^ 1]);
            level = level
                .chunks_exact(2)
                .map(|pair| {
                    let mut out = [0u8; 64];
                    profile.hash_into(&[NODE_PREFIX, &pair[0][..], &pair[1][..]], &mut out);
                    out[..node_len].to_vec()
                })
                .collect();
            index >>= 1;
        }
        let root = level.pop().unwrap_or_else(|| vec![0; node_len]);
        (root, path)
    }
}

fn encode_sorted(entries: &mut [([u8; 4], &[u8])]) -> Vec<u8> {
    entries.sort_by_key(|(t, _)| tag::as_u32(*t));
    encode_message(entries).expect("authority messages are well formed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::verify_response;

    #[test]
    fn test_encode_timestamp_mjd() {
        let packed = encode_timestamp(TestAuthority::DEFAULT_MIDPOINT_US, 7);
        assert_eq!(packed >> 40, 60_310);
        assert_eq!(packed & 0xff_ffff_ffff, 500_000);
        assert_eq!(encode_timestamp(42, 0), 42);
    }

    #[test]
    fn test_batched_responses_verify_at_every_leaf() {
        let nonce = Nonce::from_bytes([0x3C; 64]);
        for variant in [0, 7] {
            for leaf in 0..8 {
                let authority = TestAuthority::new([1; 32]).with_batch(8, leaf);
                let response = authority.respond(&nonce, variant);
                assert!(
                    verify_response(&nonce, &response, &authority.public_key(), variant).is_ok(),
                    "variant {variant} leaf {leaf}"
                );
            }
        }
    }
}
