//! # Temporal Types — UTC Timestamps and the Shared Clock
//!
//! `Timestamp` is UTC-only and truncated to seconds, so incident dates and
//! window deadlines compare exactly and canonicalize deterministically.
//!
//! Every component reads time through a [`Clock`]. The engine is handed one
//! clock at construction and never calls `Utc::now()` on its own, which
//! keeps window boundaries reproducible under a [`ManualClock`].

use std::sync::Arc;

use chrono::{DateTime, Duration, Months, Timelike, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::PcovError;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// From a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse an RFC 3339 string. Only the `Z` suffix is accepted.
    pub fn parse(s: &str) -> Result<Self, PcovError> {
        if !s.ends_with('Z') {
            return Err(PcovError::Validation(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| {
            PcovError::Validation(format!("invalid RFC 3339 timestamp {s:?}: {e}"))
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// From Unix epoch seconds.
    pub fn from_epoch_secs(secs: i64) -> Result<Self, PcovError> {
        let dt = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| PcovError::Validation(format!("invalid Unix timestamp: {secs}")))?;
        Ok(Self(dt))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Unix epoch seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// `self + secs`, failing instead of wrapping past the representable range.
    pub fn plus_secs(&self, secs: u64) -> Result<Self, PcovError> {
        let delta = i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| PcovError::Overflow(format!("{secs}s is not a valid duration")))?;
        self.0
            .checked_add_signed(delta)
            .map(Self)
            .ok_or_else(|| PcovError::Overflow(format!("{self} + {secs}s")))
    }

    /// `self + months` calendar months. A day past the end of the target
    /// month is clamped to its last day.
    pub fn plus_months(&self, months: u32) -> Result<Self, PcovError> {
        self.0
            .checked_add_months(Months::new(months))
            .map(Self)
            .ok_or_else(|| PcovError::Overflow(format!("{self} + {months} months")))
    }

    /// ISO 8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

// ─── Clocks ──────────────────────────────────────────────────────────

/// Source of "now" shared by every component of the engine.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// The current time.
    fn now(&self) -> Timestamp;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to.
///
/// Monotonic by construction: [`ManualClock::advance`] takes an unsigned
/// `std::time::Duration`, and [`ManualClock::set`] refuses to go backwards.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    /// A clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: std::time::Duration) -> Result<Timestamp, PcovError> {
        let mut now = self.now.lock();
        let next = now.plus_secs(by.as_secs())?;
        *now = next;
        Ok(next)
    }

    /// Move the clock forward by whole days.
    pub fn advance_days(&self, days: u64) -> Result<Timestamp, PcovError> {
        let secs = days
            .checked_mul(86_400)
            .ok_or_else(|| PcovError::Overflow(format!("{days} days")))?;
        self.advance(std::time::Duration::from_secs(secs))
    }

    /// Jump to `to`, which must not be earlier than the current time.
    pub fn set(&self, to: Timestamp) -> Result<(), PcovError> {
        let mut now = self.now.lock();
        if to < *now {
            return Err(PcovError::Validation(format!(
                "clock cannot move backwards from {} to {to}",
                *now
            )));
        }
        *now = to;
        Ok(())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}
