//! Hour-of-day values and charging plans
//!
//! An [`Hour`] is a wall-clock position 0..=23 without a date. The same value
//! is used as an absolute clock position and, through modular arithmetic, as
//! an offset from the hour a session started.

use crate::error::{ChargeClockError, Result};
use crate::logging::get_logger;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Number of hours in a day
pub const HOURS_PER_DAY: u8 = 24;

/// Wall-clock hour of day in `0..=23`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Hour(u8);

impl Hour {
    /// Midnight
    pub const MIDNIGHT: Hour = Hour(0);

    /// Create an hour, `None` when outside `0..=23`
    pub const fn new(value: u8) -> Option<Self> {
        if value < HOURS_PER_DAY {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Raw value
    pub const fn value(self) -> u8 {
        self.0
    }

    /// The following hour, wrapping 23 to 0
    pub const fn next(self) -> Self {
        Self((self.0 + 1) % HOURS_PER_DAY)
    }

    /// Hours elapsed going forward from `start` to `self` (0..=23)
    pub const fn distance_from(self, start: Hour) -> u8 {
        (self.0 + HOURS_PER_DAY - start.0) % HOURS_PER_DAY
    }

    /// All 24 hours in clock order
    pub fn all() -> impl Iterator<Item = Hour> {
        (0..HOURS_PER_DAY).map(Hour)
    }
}

impl TryFrom<u8> for Hour {
    type Error = ChargeClockError;

    fn try_from(value: u8) -> Result<Self> {
        Hour::new(value).ok_or_else(|| {
            ChargeClockError::invalid_session(format!("hour out of range: {}", value))
        })
    }
}

impl TryFrom<i64> for Hour {
    type Error = ChargeClockError;

    fn try_from(value: i64) -> Result<Self> {
        u8::try_from(value)
            .ok()
            .and_then(Hour::new)
            .ok_or_else(|| {
                ChargeClockError::invalid_session(format!("hour out of range: {}", value))
            })
    }
}

impl From<Hour> for u8 {
    fn from(hour: Hour) -> Self {
        hour.0
    }
}

impl fmt::Display for Hour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// Set of hours the external optimizer selected for active charging
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChargingPlan {
    hours: BTreeSet<Hour>,
}

impl ChargingPlan {
    /// Empty plan (nothing fetched yet, or the fetch failed)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a plan from validated hours
    pub fn new<I: IntoIterator<Item = Hour>>(hours: I) -> Self {
        Self {
            hours: hours.into_iter().collect(),
        }
    }

    /// Build a plan from raw backend values, dropping anything outside `0..=23`
    pub fn from_raw<I: IntoIterator<Item = i64>>(raw: I) -> Self {
        let mut hours = BTreeSet::new();
        let mut dropped = Vec::new();
        for value in raw {
            match Hour::try_from(value) {
                Ok(hour) => {
                    hours.insert(hour);
                }
                Err(_) => dropped.push(value),
            }
        }
        if !dropped.is_empty() {
            get_logger("plan").warn(&format!(
                "Ignoring out-of-range charging hours from backend: {:?}",
                dropped
            ));
        }
        Self { hours }
    }

    /// Whether `hour` is a planned charging hour
    pub fn contains(&self, hour: Hour) -> bool {
        self.hours.contains(&hour)
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hours.len()
    }

    /// Planned hours in clock order
    pub fn iter(&self) -> impl Iterator<Item = Hour> + '_ {
        self.hours.iter().copied()
    }
}

impl FromIterator<Hour> for ChargingPlan {
    fn from_iter<T: IntoIterator<Item = Hour>>(iter: T) -> Self {
        Self::new(iter)
    }
}
