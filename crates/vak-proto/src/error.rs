// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Error types for Roughtime message parsing and verification.
//!
//! [`RoughtimeError`] is `no_std`-compatible via `core::fmt::Display`, with
//! [`std::error::Error`] and `From<RoughtimeError> for std::io::Error` behind
//! `#[cfg(feature = "std")]`.

use core::fmt;

/// Which Ed25519 signature failed to verify.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignatureStage {
    /// The authority's long-term key over the delegation (`CERT.SIG` over `DELE`).
    Delegation,
    /// The delegated key over the signed response (`SIG` over `SREP`).
    Response,
}

/// Errors that can occur while decoding or verifying a Roughtime message.
///
/// Every variant is a hard failure for the packet in question. None of them
/// says anything about the authority's *next* packet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RoughtimeError {
    /// Structural wire-format violation: truncated, misaligned, bad magic,
    /// or offsets inconsistent with the buffer.
    Malformed {
        /// Short description of what was wrong.
        reason: &'static str,
    },
    /// The message is well formed but a required tag is absent.
    TagNotFound {
        /// The 4-byte tag that was expected.
        tag: [u8; 4],
    },
    /// A field is present but has the wrong length.
    WrongSize {
        /// The 4-byte tag of the field.
        tag: [u8; 4],
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },
    /// An Ed25519 signature did not verify.
    SignatureInvalid {
        /// Which signature failed.
        stage: SignatureStage,
    },
    /// The Merkle root recomputed from the sent nonce does not match `ROOT`.
    TreeMismatch,
    /// The reported midpoint lies outside the delegation's validity window.
    BoundsViolation {
        /// Reported midpoint (wire encoding).
        midpoint: u64,
        /// Delegation `MINT`.
        min: u64,
        /// Delegation `MAXT`.
        max: u64,
    },
}

impl RoughtimeError {
    pub(crate) const fn malformed(reason: &'static str) -> Self {
        RoughtimeError::Malformed { reason }
    }
}

fn tag_str(tag: &[u8; 4]) -> &str {
    let printable = tag.iter().take_while(|b| b.is_ascii_graphic()).count();
    core::str::from_utf8(&tag[..printable]).unwrap_or("????")
}

impl fmt::Display for RoughtimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoughtimeError::Malformed { reason } => write!(f, "malformed message: {reason}"),
            RoughtimeError::TagNotFound { tag } => {
                write!(f, "missing required tag: {}", tag_str(tag))
            }
            RoughtimeError::WrongSize {
                tag,
                expected,
                actual,
            } => write!(
                f,
                "tag {} has invalid length: expected {}, got {}",
                tag_str(tag),
                expected,
                actual
            ),
            RoughtimeError::SignatureInvalid { stage } => match stage {
                SignatureStage::Delegation => write!(f, "delegation signature invalid"),
                SignatureStage::Response => write!(f, "response signature invalid"),
            },
            RoughtimeError::TreeMismatch => {
                write!(f, "Merkle root mismatch: response not bound to our nonce")
            }
            RoughtimeError::BoundsViolation { midpoint, min, max } => write!(
                f,
                "midpoint {midpoint} outside delegation window ({min}, {max})"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl From<RoughtimeError> for std::io::Error {
    fn from(err: RoughtimeError) -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::InvalidData, err)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RoughtimeError {}
