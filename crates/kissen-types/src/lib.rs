//! # kissen-types: Core types for `Kissen`
//!
//! This crate contains shared types used across the `Kissen` crates:
//! - Temporal types ([`Timestamp`], [`TemporalWindow`])
//! - The JSON data codec and short id generation ([`data`])
//! - The injectable event bus ([`event`])

use std::{
    fmt::{Debug, Display},
    ops::{Add, Sub},
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

pub mod data;
pub mod event;

pub use data::{DataError, from_json, generate_id, to_json};
pub use event::{Event, EventBus, EventCancelled, EventDispatcher, EventOutcome, NoopDispatcher};

// ============================================================================
// Temporal Types
// ============================================================================

/// Wall-clock timestamp with millisecond precision.
///
/// Stored as milliseconds since Unix epoch (1970-01-01 00:00:00 UTC), the
/// resolution the persisted permission and punishment records use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The Unix epoch (1970-01-01 00:00:00 UTC).
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Creates a timestamp from milliseconds since Unix epoch.
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as milliseconds since Unix epoch.
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Creates a timestamp for the current time.
    ///
    /// A clock set before the epoch reads as [`Timestamp::EPOCH`].
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self(millis)
    }

    /// Adds `millis`, saturating at the maximum representable time.
    pub fn saturating_add(self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// Milliseconds from `earlier` to `self`, zero if `earlier` is later.
    pub fn millis_since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match i64::try_from(self.0)
            .ok()
            .and_then(chrono::DateTime::from_timestamp_millis)
        {
            Some(dt) => write!(f, "{}", dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
            None => write!(f, "{}ms", self.0),
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::EPOCH
    }
}

impl From<u64> for Timestamp {
    fn from(millis: u64) -> Self {
        Self(millis)
    }
}

impl Add<u64> for Timestamp {
    type Output = Timestamp;

    fn add(self, millis: u64) -> Self::Output {
        self.saturating_add(millis)
    }
}

impl Sub for Timestamp {
    type Output = u64;

    fn sub(self, rhs: Timestamp) -> Self::Output {
        self.millis_since(rhs)
    }
}

/// Validity window shared by permission nodes and punishments.
///
/// `predicted_end` records the end computed at creation time and is never
/// rewritten, so an entity shortened or extended later still remembers what
/// it was originally issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemporalWindow {
    pub start: Timestamp,
    /// Duration in milliseconds; `None` is unlimited.
    pub duration: Option<u64>,
    pub end: Option<Timestamp>,
    pub predicted_end: Option<Timestamp>,
}

impl TemporalWindow {
    /// A window starting at `start` that never ends.
    pub fn unlimited(start: Timestamp) -> Self {
        Self::with_duration(start, None)
    }

    /// A window starting at `start` lasting `duration` milliseconds.
    pub fn with_duration(start: Timestamp, duration: Option<u64>) -> Self {
        let end = duration.map(|d| start.saturating_add(d));
        Self {
            start,
            duration,
            end,
            predicted_end: end,
        }
    }

    /// Valid when there is no end or the end lies after `now`.
    pub fn is_valid(&self, now: Timestamp) -> bool {
        self.end.is_none_or(|end| end > now)
    }

    /// Returns a copy with a new end; `predicted_end` is preserved.
    pub fn with_end(&self, end: Option<Timestamp>) -> Self {
        Self { end, ..*self }
    }

    /// Time actually spanned by the window, `None` when unlimited.
    pub fn accurate_duration(&self) -> Option<u64> {
        self.end.map(|end| end.millis_since(self.start))
    }

    /// Milliseconds left at `now`; `None` when unlimited, zero once expired.
    pub fn remaining(&self, now: Timestamp) -> Option<u64> {
        self.end.map(|end| end.millis_since(now))
    }
}

#[cfg(test)]
mod tests;
