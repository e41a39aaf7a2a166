// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Authority descriptors and session thresholds.
//!
//! Authorities are pinned by their long-term Ed25519 key, usually published
//! as base64:
//!
//! ```
//! use vak_client::config::ServerDescriptor;
//!
//! let server = ServerDescriptor::from_base64_key(
//!     "roughtime.se",
//!     2002,
//!     7,
//!     "S3AzfZJ5CjSdkJ21ZJGbxqdYP/SoE8fXKY0+aicsehI=",
//! )
//! .unwrap();
//! assert_eq!(server.public_key[0], 0x4b);
//! ```

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::ConfigError;

/// One Roughtime authority.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerDescriptor {
    /// Human-readable name, if known.
    pub name: Option<String>,
    /// Host name or IP address.
    pub host: String,
    /// UDP port.
    pub port: u16,
    /// Protocol variant (draft number) the authority speaks.
    pub variant: u32,
    /// Long-term Ed25519 public key.
    pub public_key: [u8; 32],
}

impl ServerDescriptor {
    /// Describe an authority.
    pub fn new(host: impl Into<String>, port: u16, variant: u32, public_key: [u8; 32]) -> Self {
        ServerDescriptor {
            name: None,
            host: host.into(),
            port,
            variant,
            public_key,
        }
    }

    /// Describe an authority whose key is given in base64.
    pub fn from_base64_key(
        host: impl Into<String>,
        port: u16,
        variant: u32,
        public_key: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(host, port, variant, decode_public_key(public_key)?))
    }

    /// Attach a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// `host:port`, bracketing IPv6 literals.
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// The name if set, otherwise the address.
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.address())
    }
}

/// Decode a base64-encoded Ed25519 public key (32 bytes).
///
/// # Examples
///
/// ```
/// let pk = vak_client::config::decode_public_key(
///     "0GD7c3yP8xEc4Zl2zeuN2SlLvDVVocjsPSL8/Rl/7zg="
/// ).unwrap();
/// assert_eq!(pk.len(), 32);
/// ```
pub fn decode_public_key(base64_key: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = STANDARD
        .decode(base64_key.trim())
        .map_err(|e| ConfigError::InvalidPublicKey {
            detail: format!("invalid base64: {e}"),
        })?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| ConfigError::InvalidPublicKey {
        detail: format!("public key must be 32 bytes, got {}", bytes.len()),
    })
}

/// When a session may declare success, and how long it waits per authority.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Thresholds {
    /// Minimum number of mutually overlapping responses.
    pub min_overlaps: usize,
    /// Widest acceptable consensus interval.
    pub max_uncertainty: Duration,
    /// How long to wait for one authority before moving on.
    pub timeout: Duration,
    /// Upper bound on a single blocking receive.
    pub poll_interval: Duration,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            min_overlaps: 10,
            max_uncertainty: Duration::from_secs(2),
            timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl Thresholds {
    /// Require `n` overlapping responses.
    pub fn with_min_overlaps(mut self, n: usize) -> Self {
        self.min_overlaps = n;
        self
    }

    /// Accept consensus intervals up to `width` wide.
    pub fn with_max_uncertainty(mut self, width: Duration) -> Self {
        self.max_uncertainty = width;
        self
    }

    /// Wait up to `timeout` for each authority.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Block at most `interval` per receive.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Reject values no session can work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_overlaps == 0 {
            return Err(ConfigError::InvalidThreshold {
                detail: "min_overlaps must be at least 1".into(),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidThreshold {
                detail: "timeout must be non-zero".into(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidThreshold {
                detail: "poll_interval must be non-zero".into(),
            });
        }
        Ok(())
    }

    pub(crate) fn timeout_us(&self) -> u64 {
        duration_us(self.timeout)
    }

    pub(crate) fn max_uncertainty_us(&self) -> u64 {
        duration_us(self.max_uncertainty)
    }
}

fn duration_us(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

/// Public authorities speaking the current IETF profile.
///
/// Callers should shuffle the list (see
/// [`shuffle_authorities`](crate::entropy::shuffle_authorities)) so that
/// the same authority is not always asked first.
pub fn well_known_authorities() -> Vec<ServerDescriptor> {
    const ROUGHTIME_SE: [u8; 32] = [
        0x4b, 0x70, 0x33, 0x7d, 0x92, 0x79, 0x0a, 0x34, 0x9d, 0x90, 0x9d, 0xb5, 0x64, 0x91, 0x9b,
        0xc6, 0xa7, 0x58, 0x3f, 0xf4, 0xa8, 0x13, 0xc7, 0xd7, 0x29, 0x8d, 0x3e, 0x6a, 0x27, 0x2c,
        0x7a, 0x12,
    ];
    const STH1_NETNOD: [u8; 32] = [
        0xf6, 0x5d, 0x49, 0x37, 0x81, 0xda, 0x90, 0x69, 0xc6, 0xe3, 0x8c, 0xb2, 0xab, 0x23, 0x4d,
        0x09, 0xbd, 0x07, 0x37, 0x45, 0xdf, 0xb3, 0x2b, 0x01, 0x6e, 0x79, 0x7f, 0x91, 0xb6, 0x68,
        0x64, 0x37,
    ];
    const STH2_NETNOD: [u8; 32] = [
        0x4f, 0xfc, 0x71, 0x5f, 0x81, 0x11, 0x50, 0x10, 0x0e, 0xa6, 0xde, 0xb8, 0x67, 0xca, 0x61,
        0x59, 0xa9, 0x8a, 0xb0, 0x04, 0x99, 0xc4, 0x9d, 0x15, 0x5a, 0xe8, 0x8f, 0x9b, 0x71, 0x92,
        0xff, 0xc8,
    ];
    vec![
        ServerDescriptor::new("192.36.143.134", 2002, 7, ROUGHTIME_SE).with_name("roughtime.se"),
        ServerDescriptor::new("194.58.207.198", 2002, 7, STH1_NETNOD)
            .with_name("sth1.roughtime.netnod.se"),
        ServerDescriptor::new("194.58.207.199", 2002, 7, STH2_NETNOD)
            .with_name("sth2.roughtime.netnod.se"),
    ]
}

/// Loading of Cloudflare-style `ecosystem.json` authority lists.
#[cfg(feature = "ecosystem")]
pub mod ecosystem {
    use serde::Deserialize;

    use super::{ServerDescriptor, decode_public_key};
    use crate::error::ConfigError;

    /// Variant assumed for `"Google-Roughtime"` entries.
    pub const GOOGLE_VARIANT: u32 = 0;

    /// Variant assumed for `"IETF-Roughtime"` entries.
    pub const IETF_VARIANT: u32 = 7;

    #[derive(Deserialize)]
    struct Ecosystem {
        servers: Vec<Server>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Server {
        name: String,
        #[serde(default)]
        version: Option<String>,
        public_key_type: String,
        public_key: String,
        addresses: Vec<Address>,
    }

    #[derive(Deserialize)]
    struct Address {
        protocol: String,
        address: String,
    }

    /// Parse an ecosystem document into one descriptor per UDP address.
    pub fn parse(json: &str) -> Result<Vec<ServerDescriptor>, ConfigError> {
        let doc: Ecosystem = serde_json::from_str(json).map_err(|e| ConfigError::Ecosystem {
            detail: e.to_string(),
        })?;

        let mut out = Vec::new();
        for server in doc.servers {
            if !server.public_key_type.eq_ignore_ascii_case("ed25519") {
                return Err(ConfigError::Ecosystem {
                    detail: format!(
                        "{}: unsupported key type {}",
                        server.name, server.public_key_type
                    ),
                });
            }
            let variant = match server.version.as_deref() {
                None | Some("IETF-Roughtime") => IETF_VARIANT,
                Some("Google-Roughtime") => GOOGLE_VARIANT,
                Some(other) => {
                    return Err(ConfigError::Ecosystem {
                        detail: format!("{}: unknown version {other}", server.name),
                    });
                }
            };
            let key = decode_public_key(&server.public_key)?;
            for addr in server.addresses.iter().filter(|a| a.protocol == "udp") {
                let (host, port) = split_host_port(&addr.address)?;
                out.push(ServerDescriptor::new(host, port, variant, key).with_name(&server.name));
            }
        }
        if out.is_empty() {
            return Err(ConfigError::NoAuthorities);
        }
        Ok(out)
    }

    fn split_host_port(address: &str) -> Result<(String, u16), ConfigError> {
        let invalid = || ConfigError::InvalidAddress {
            address: address.to_string(),
        };
        let (host, port) = address.rsplit_once(':').ok_or_else(invalid)?;
        let port = port.parse::<u16>().map_err(|_| invalid())?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(invalid());
        }
        Ok((host.to_string(), port))
    }

}
