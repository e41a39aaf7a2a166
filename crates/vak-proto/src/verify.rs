// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Roughtime response verification.
//!
//! A response is trusted only if every gate passes, in order:
//!
//! 1. the envelope (IETF variants) is intact,
//! 2. all required tags are present with the right sizes,
//! 3. the authority's long-term key signed the delegation,
//! 4. the delegated key signed the response,
//! 5. the Merkle path binds the response to the nonce we sent,
//! 6. the midpoint lies strictly inside the delegation window.
//!
//! There is no partial trust: the first failing gate decides the error.

use ring::signature::{ED25519, UnparsedPublicKey};

use crate::error::{RoughtimeError, SignatureStage};
use crate::profile::{LEAF_PREFIX, NODE_PREFIX, Profile, RESPONSE_CONTEXT};
use crate::types::{Nonce, VerifiedTime, tag};
use crate::wire::{WordSlice, unframe};

/// Modified Julian Day of 1970-01-01.
pub const MJD_UNIX_EPOCH: u64 = 40_587;

const MICROS_PER_DAY: u64 = 86_400_000_000;

/// Deepest Merkle tree an authority may batch responses into.
const MAX_PATH_DEPTH: usize = 32;

/// Upper bound on the signed response size.
const MAX_SREP_LEN: usize = 1024;

/// Convert an MJD-packed timestamp (day number in the upper 24 bits,
/// microseconds of the day in the lower 40) to microseconds since the Unix
/// epoch.
///
/// Leap seconds are not modeled. Timestamps before 1970 are rejected.
pub fn mjd_to_unix_micros(packed: u64) -> Result<u64, RoughtimeError> {
    let days = packed >> 40;
    let micros = packed & 0xff_ffff_ffff;
    let days = days
        .checked_sub(MJD_UNIX_EPOCH)
        .ok_or(RoughtimeError::malformed("timestamp before Unix epoch"))?;
    days.checked_mul(MICROS_PER_DAY)
        .and_then(|us| us.checked_add(micros))
        .ok_or(RoughtimeError::malformed("timestamp out of range"))
}

/// The pieces of a response needed by the verification gates.
struct Parts<'a> {
    srep: WordSlice<'a>,
    sig: WordSlice<'a>,
    cert_sig: WordSlice<'a>,
    dele: WordSlice<'a>,
    pubk: WordSlice<'a>,
    indx: WordSlice<'a>,
    path: WordSlice<'a>,
}

impl<'a> Parts<'a> {
    fn decompose(message: &'a [u8]) -> Result<Self, RoughtimeError> {
        let parent = WordSlice::new(message)?;
        parent.check_tag_order()?;
        let srep = parent.get_tag(tag::SREP)?;
        if srep.size() as usize > MAX_SREP_LEN {
            return Err(RoughtimeError::WrongSize {
                tag: tag::SREP,
                expected: MAX_SREP_LEN,
                actual: srep.size() as usize,
            });
        }
        srep.check_tag_order()?;
        let sig = parent.get_sized(tag::SIG, 64)?;
        let cert = parent.get_tag(tag::CERT)?;
        cert.check_tag_order()?;
        let cert_sig = cert.get_sized(tag::SIG, 64)?;
        let dele = cert.get_tag(tag::DELE)?;
        dele.check_tag_order()?;
        let pubk = dele.get_sized(tag::PUBK, 32)?;
        let indx = parent.get_sized(tag::INDX, 4)?;
        let path = parent.get_tag(tag::PATH)?;
        Ok(Parts {
            srep,
            sig,
            cert_sig,
            dele,
            pubk,
            indx,
            path,
        })
    }
}

fn verify_signature(
    public_key: &[u8],
    context: &[u8],
    message: &[u8],
    signature: &[u8],
    stage: SignatureStage,
) -> Result<(), RoughtimeError> {
    let mut signed = alloc::vec::Vec::with_capacity(context.len() + message.len());
    signed.extend_from_slice(context);
    signed.extend_from_slice(message);
    UnparsedPublicKey::new(&ED25519, public_key)
        .verify(&signed, signature)
        .map_err(|_| RoughtimeError::SignatureInvalid { stage })
}

/// Recompute the Merkle root from the leaf for `nonce` and compare it with
/// the `ROOT` in `srep`.
fn verify_merkle(
    profile: &Profile,
    nonce: &Nonce,
    srep: &WordSlice<'_>,
    indx: &WordSlice<'_>,
    path: &WordSlice<'_>,
) -> Result<(), RoughtimeError> {
    let node_len = profile.node_len;
    let root = srep.get_sized(tag::ROOT, node_len)?;

    let path = path.as_bytes();
    if path.len() % node_len != 0 {
        return Err(RoughtimeError::WrongSize {
            tag: tag::PATH,
            expected: path.len() - path.len() % node_len,
            actual: path.len(),
        });
    }
    if path.len() / node_len > MAX_PATH_DEPTH {
        return Err(RoughtimeError::malformed("Merkle path deeper than 32 levels"));
    }

    let mut index = indx.read_u32(0)?;
    let mut hash = [0u8; 64];
    profile.hash_into(&[LEAF_PREFIX, nonce.for_profile(profile)], &mut hash);

    for sibling in path.chunks_exact(node_len) {
        let current = hash;
        let current = &current[..node_len];
        let (left, right) = if index & 1 == 1 {
            (sibling, current)
        } else {
            (current, sibling)
        };
        profile.hash_into(&[NODE_PREFIX, left, right], &mut hash);
        index >>= 1;
    }

    if hash[..node_len] == *root.as_bytes() {
        Ok(())
    } else {
        Err(RoughtimeError::TreeMismatch)
    }
}

/// Verify `response` against the `nonce` we sent and the authority's
/// long-term `public_key`, using the wire format of `variant`.
///
/// On success the midpoint is in microseconds since the Unix epoch for every
/// variant.
pub fn verify_response(
    nonce: &Nonce,
    response: &[u8],
    public_key: &[u8; 32],
    variant: u32,
) -> Result<VerifiedTime, RoughtimeError> {
    let profile = Profile::for_variant(variant);
    let message = if profile.framed {
        unframe(response)?
    } else {
        response
    };

    let parts = Parts::decompose(message)?;

    verify_signature(
        public_key,
        profile.delegation_context,
        parts.dele.as_bytes(),
        parts.cert_sig.as_bytes(),
        SignatureStage::Delegation,
    )?;
    verify_signature(
        parts.pubk.as_bytes(),
        RESPONSE_CONTEXT,
        parts.srep.as_bytes(),
        parts.sig.as_bytes(),
        SignatureStage::Response,
    )?;

    verify_merkle(&profile, nonce, &parts.srep, &parts.indx, &parts.path)?;

    let midpoint = parts.srep.get_sized(tag::MIDP, 8)?.read_u64(0)?;
    let radius_us = parts.srep.get_sized(tag::RADI, 4)?.read_u32(0)?;
    let min = parts.dele.get_sized(tag::MINT, 8)?.read_u64(0)?;
    let max = parts.dele.get_sized(tag::MAXT, 8)?.read_u64(0)?;
    if !(min < midpoint && midpoint < max) {
        return Err(RoughtimeError::BoundsViolation { midpoint, min, max });
    }

    let midpoint_us = if profile.mjd_timestamps {
        mjd_to_unix_micros(midpoint)?
    } else {
        midpoint
    };

    Ok(VerifiedTime {
        midpoint_us,
        radius_us,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestAuthority;

    fn nonce() -> Nonce {
        Nonce::from_bytes([0xA5; 64])
    }

    #[test]
    fn test_mjd_epoch() {
        assert_eq!(mjd_to_unix_micros(MJD_UNIX_EPOCH << 40).unwrap(), 0);
        assert_eq!(
            mjd_to_unix_micros(((MJD_UNIX_EPOCH + 1) << 40) | 5).unwrap(),
            86_400_000_005
        );
    }

    #[test]
    fn test_mjd_known_date() {
        // 2024-01-01 is MJD 60310, 1_704_067_200 s after the epoch.
        let packed = (60_310u64 << 40) | 1_500_000;
        assert_eq!(
            mjd_to_unix_micros(packed).unwrap(),
            1_704_067_200_000_000 + 1_500_000
        );
    }

    #[test]
    fn test_mjd_before_epoch_rejected() {
        assert!(matches!(
            mjd_to_unix_micros(40_000u64 << 40),
            Err(RoughtimeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_accepts_legacy_and_ietf() {
        let authority = TestAuthority::new([7; 32]);
        for variant in [0, 4, 5, 6, 7, 11] {
            let response = authority.respond(&nonce(), variant);
            let time = verify_response(&nonce(), &response, &authority.public_key(), variant)
                .unwrap_or_else(|e| panic!("variant {variant}: {e}"));
            assert_eq!(time.midpoint_us, authority.midpoint_us);
            assert_eq!(time.radius_us, authority.radius_us);
        }
    }

    #[test]
    fn test_wrong_nonce_is_tree_mismatch() {
        let authority = TestAuthority::new([7; 32]);
        let response = authority.respond(&nonce(), 7);
        let other = Nonce::from_bytes([0x11; 64]);
        assert_eq!(
            verify_response(&other, &response, &authority.public_key(), 7),
            Err(RoughtimeError::TreeMismatch)
        );
    }

    #[test]
    fn test_wrong_authority_key() {
        let authority = TestAuthority::new([7; 32]);
        let response = authority.respond(&nonce(), 7);
        let stranger = TestAuthority::new([8; 32]);
        assert_eq!(
            verify_response(&nonce(), &response, &stranger.public_key(), 7),
            Err(RoughtimeError::SignatureInvalid {
                stage: SignatureStage::Delegation
            })
        );
    }

    #[test]
    fn test_variant_mismatch_fails() {
        let authority = TestAuthority::new([7; 32]);
        let response = authority.respond(&nonce(), 4);
        assert!(verify_response(&nonce(), &response, &authority.public_key(), 7).is_err());
    }
}
