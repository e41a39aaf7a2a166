// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Error types for the Roughtime client.
//!
//! Drivers return [`ClientError`]. It converts into `io::Error` so callers
//! that only speak `io::Result` can still recover the original error by
//! downcasting:
//!
//! ```
//! use std::io;
//! use vak_client::error::ClientError;
//!
//! let err = ClientError::Exhausted { responses: 3, best_support: 1 };
//! let io_err: io::Error = err.into();
//! let inner = io_err
//!     .get_ref()
//!     .and_then(|inner| inner.downcast_ref::<ClientError>());
//! assert!(matches!(inner, Some(ClientError::Exhausted { responses: 3, .. })));
//! ```

pub use vak_proto::error::{RoughtimeError, SignatureStage};

use std::fmt;
use std::io;

/// Errors that can end a client operation.
#[derive(Debug)]
pub enum ClientError {
    /// A response failed verification and no better one arrived in time.
    Verification(RoughtimeError),
    /// No response arrived before the deadline.
    Timeout(TimeoutError),
    /// Every authority was tried without reaching consensus.
    Exhausted {
        /// Responses that passed verification.
        responses: usize,
        /// Largest number of mutually overlapping responses seen.
        best_support: usize,
    },
    /// Invalid configuration (no authorities, bad key, bad thresholds).
    Config(ConfigError),
    /// The entropy source failed to produce a nonce.
    Entropy(EntropyError),
    /// Underlying I/O error.
    Io(io::Error),
}

/// Timeouts waiting on an authority.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeoutError {
    /// `host:port` of the silent authority.
    pub authority: String,
    /// How long we waited, in microseconds.
    pub waited_us: u64,
}

/// Configuration errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The authority list is empty.
    NoAuthorities,
    /// A public key is not 32 bytes of valid base64.
    InvalidPublicKey {
        /// What was wrong with it.
        detail: String,
    },
    /// An address is not `host:port`.
    InvalidAddress {
        /// The offending address.
        address: String,
    },
    /// A threshold is out of range.
    InvalidThreshold {
        /// Which threshold and why.
        detail: String,
    },
    /// An ecosystem file could not be parsed.
    Ecosystem {
        /// Parser message.
        detail: String,
    },
}

/// The operating system's random source failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntropyError {
    /// OS error text.
    pub detail: String,
}

// ── Display implementations ─────────────────────────────────────────

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Verification(e) => write!(f, "Roughtime verification failed: {e}"),
            ClientError::Timeout(e) => write!(f, "Roughtime timeout: {e}"),
            ClientError::Exhausted {
                responses,
                best_support,
            } => write!(
                f,
                "no consensus after all authorities: {responses} valid responses, \
                 at most {best_support} overlapping"
            ),
            ClientError::Config(e) => write!(f, "Roughtime config error: {e}"),
            ClientError::Entropy(e) => write!(f, "{e}"),
            ClientError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} did not answer within {} ms",
            self.authority,
            self.waited_us / 1000
        )
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoAuthorities => write!(f, "at least one authority is required"),
            ConfigError::InvalidPublicKey { detail } => write!(f, "invalid public key: {detail}"),
            ConfigError::InvalidAddress { address } => {
                write!(f, "address is not host:port: {address}")
            }
            ConfigError::InvalidThreshold { detail } => write!(f, "invalid threshold: {detail}"),
            ConfigError::Ecosystem { detail } => write!(f, "invalid ecosystem file: {detail}"),
        }
    }
}

impl fmt::Display for EntropyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entropy source failed: {}", self.detail)
    }
}

// ── Error trait implementations ─────────────────────────────────────

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Verification(e) => Some(e),
            ClientError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for TimeoutError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for EntropyError {}

// ── From conversions ────────────────────────────────────────────────

impl From<ClientError> for io::Error {
    fn from(err: ClientError) -> io::Error {
        let kind = match &err {
            ClientError::Verification(_) => io::ErrorKind::InvalidData,
            ClientError::Timeout(_) => io::ErrorKind::TimedOut,
            ClientError::Exhausted { .. } => io::ErrorKind::NotFound,
            ClientError::Config(_) => io::ErrorKind::InvalidInput,
            ClientError::Entropy(_) => io::ErrorKind::Other,
            ClientError::Io(e) => e.kind(),
        };
        // Preserve the original io::Error directly for the Io variant.
        if let ClientError::Io(e) = err {
            return e;
        }
        io::Error::new(kind, err)
    }
}

impl From<io::Error> for ClientError {
    fn from(err: io::Error) -> ClientError {
        ClientError::Io(err)
    }
}

impl From<RoughtimeError> for ClientError {
    fn from(err: RoughtimeError) -> ClientError {
        ClientError::Verification(err)
    }
}

impl From<ConfigError> for ClientError {
    fn from(err: ConfigError) -> ClientError {
        ClientError::Config(err)
    }
}

impl From<EntropyError> for ClientError {
    fn from(err: EntropyError) -> ClientError {
        ClientError::Entropy(err)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
