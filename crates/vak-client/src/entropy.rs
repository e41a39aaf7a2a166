// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Randomness for nonces and authority ordering.
//!
//! Nonces must be unpredictable: a response computed for a guessable nonce
//! can be prepared ahead of time and replayed later. [`OsEntropy`] draws from
//! the operating system CSPRNG and is the only source production code
//! should use.

use rand::rngs::OsRng;
use rand::{RngCore, TryRngCore};

use crate::error::EntropyError;

/// A source of random bytes.
pub trait Entropy {
    /// Fill `buf` entirely with random bytes.
    fn fill_random(&mut self, buf: &mut [u8]) -> Result<(), EntropyError>;
}

/// The operating system's cryptographically secure generator.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsEntropy;

impl Entropy for OsEntropy {
    fn fill_random(&mut self, buf: &mut [u8]) -> Result<(), EntropyError> {
        OsRng.try_fill_bytes(buf).map_err(|e| EntropyError {
            detail: e.to_string(),
        })
    }
}

/// Adapter for any infallible `rand` generator.
///
/// Meant for tests that need reproducible nonces, e.g.
/// `RngEntropy(StdRng::seed_from_u64(1))`.
#[derive(Clone, Debug)]
pub struct RngEntropy<R>(pub R);

impl<R: RngCore> Entropy for RngEntropy<R> {
    fn fill_random(&mut self, buf: &mut [u8]) -> Result<(), EntropyError> {
        self.0.fill_bytes(buf);
        Ok(())
    }
}

impl<E: Entropy + ?Sized> Entropy for &mut E {
    fn fill_random(&mut self, buf: &mut [u8]) -> Result<(), EntropyError> {
        (**self).fill_random(buf)
    }
}

/// Uniform value in `0..bound` by rejection sampling.
fn random_below<E: Entropy + ?Sized>(entropy: &mut E, bound: u64) -> Result<u64, EntropyError> {
    debug_assert!(bound > 0);
    // Largest multiple of `bound` that fits, so every residue is equally likely.
    let zone = u64::MAX - (u64::MAX % bound);
    loop {
        let mut bytes = [0u8; 8];
        entropy.fill_random(&mut bytes)?;
        let v = u64::from_le_bytes(bytes);
        if v < zone {
            return Ok(v % bound);
        }
    }
}

/// Shuffle `list` in place (Fisher–Yates).
///
/// Querying authorities in a random order keeps one slow or hostile
/// authority from always being asked first.
///
/// `rand::seq::SliceRandom::shuffle` takes an infallible `Rng`; this one
/// returns the error when [`Entropy::fill_random`] fails.
pub fn shuffle_authorities<T, E: Entropy + ?Sized>(
    list: &mut [T],
    entropy: &mut E,
) -> Result<(), EntropyError> {
    for i in (1..list.len()).rev() {
        let j = random_below(entropy, i as u64 + 1)? as usize;
        list.swap(i, j);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct Failing;

    impl Entropy for Failing {
        fn fill_random(&mut self, _buf: &mut [u8]) -> Result<(), EntropyError> {
            Err(EntropyError {
                detail: "unavailable".into(),
            })
        }
    }

    #[test]
    fn test_os_entropy_fills() {
        let mut a = [0u8; 64];
        let mut b = [0u8; 64];
        OsEntropy.fill_random(&mut a).unwrap();
        OsEntropy.fill_random(&mut b).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut entropy = RngEntropy(StdRng::seed_from_u64(9));
        let mut list: Vec<u32> = (0..50).collect();
        shuffle_authorities(&mut list, &mut entropy).unwrap();
        let mut sorted = list.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
        assert_ne!(list, sorted);
    }

    #[test]
    fn test_shuffle_reaches_every_position() {
        let mut entropy = RngEntropy(StdRng::seed_from_u64(1));
        let mut seen_first = [false; 4];
        for _ in 0..200 {
            let mut list = [0usize, 1, 2, 3];
            shuffle_authorities(&mut list, &mut entropy).unwrap();
            seen_first[list[0]] = true;
        }
        assert!(seen_first.iter().all(|&s| s));
    }

    #[test]
    fn test_shuffle_trivial_lists() {
        let mut empty: [u8; 0] = [];
        shuffle_authorities(&mut empty, &mut Failing).unwrap();
        let mut one = [7];
        shuffle_authorities(&mut one, &mut Failing).unwrap();
        assert_eq!(one, [7]);
    }

    #[test]
    fn test_shuffle_propagates_failure() {
        let mut list = [1, 2, 3];
        assert!(shuffle_authorities(&mut list, &mut Failing).is_err());
    }
}
