// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Local clock access for round-trip timing and applying corrections.
//!
//! The session only ever reads the clock. Applying the consensus correction
//! is left to the caller through [`Clock::set_offset`], which steps the
//! clock by a signed number of microseconds.
//!
//! # Privileges
//!
//! Stepping the system clock requires root (or `CAP_SYS_TIME` on Linux).
//!
//! # Platform Support
//!
//! With the `clock` feature, [`SystemClock`] steps the clock on Unix using
//! `gettimeofday(2)` and `settimeofday(2)`. Everywhere else, and without the
//! feature, [`Clock::set_offset`] returns [`ClockError::Unsupported`].

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Error type for clock adjustment operations.
#[derive(Debug)]
pub enum ClockError {
    /// The operation requires elevated privileges.
    PermissionDenied,
    /// Platform-specific error with an OS error code.
    OsError(i32),
    /// Clock adjustment is not supported by this clock or platform.
    Unsupported,
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockError::PermissionDenied => write!(f, "permission denied (requires root)"),
            ClockError::OsError(code) => write!(f, "OS error: {code}"),
            ClockError::Unsupported => write!(f, "clock adjustment not supported"),
        }
    }
}

impl std::error::Error for ClockError {}

/// A wall clock in microseconds since the Unix epoch.
pub trait Clock {
    /// Current time.
    fn now_microseconds(&self) -> u64;

    /// Step the clock by `offset_us`.
    fn set_offset(&mut self, offset_us: i64) -> Result<(), ClockError> {
        let _ = offset_us;
        Err(ClockError::Unsupported)
    }
}

impl<C: Clock + ?Sized> Clock for &mut C {
    fn now_microseconds(&self) -> u64 {
        (**self).now_microseconds()
    }

    fn set_offset(&mut self, offset_us: i64) -> Result<(), ClockError> {
        (**self).set_offset(offset_us)
    }
}

/// The operating system's real-time clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_microseconds(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }

    fn set_offset(&mut self, offset_us: i64) -> Result<(), ClockError> {
        platform::step(offset_us)
    }
}

#[cfg(all(unix, feature = "clock"))]
#[allow(unsafe_code)]
mod platform {
    use super::ClockError;

    fn os_error_from_errno() -> ClockError {
        let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(-1);
        if errno == libc::EPERM {
            ClockError::PermissionDenied
        } else {
            ClockError::OsError(errno)
        }
    }

    pub(super) fn step(offset_us: i64) -> Result<(), ClockError> {
        let mut tv: libc::timeval = unsafe { std::mem::zeroed() };
        let ret = unsafe { libc::gettimeofday(&mut tv, std::ptr::null_mut()) };
        if ret < 0 {
            return Err(os_error_from_errno());
        }

        #[allow(clippy::unnecessary_cast)] // tv_sec/tv_usec types differ across platforms
        let total_us = (tv.tv_sec as i64)
            .saturating_mul(1_000_000)
            .saturating_add(tv.tv_usec as i64)
            .saturating_add(offset_us);
        tv.tv_sec = total_us.div_euclid(1_000_000) as _;
        tv.tv_usec = total_us.rem_euclid(1_000_000) as _;

        let ret = unsafe { libc::settimeofday(&tv, std::ptr::null()) };
        if ret < 0 {
            return Err(os_error_from_errno());
        }
        Ok(())
    }
}

#[cfg(not(all(unix, feature = "clock")))]
mod platform {
    use super::ClockError;

    pub(super) fn step(_offset_us: i64) -> Result<(), ClockError> {
        Err(ClockError::Unsupported)
    }
}
