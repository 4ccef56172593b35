//! Charging session parameters
//!
//! A session is created when a user starts a charge and lives until the
//! pickup deadline passes or the user stops it. Its start timestamp is also
//! its identity: async completions are matched against it.

use crate::error::{ChargeClockError, Result};
use crate::hour::Hour;
use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Maximum target state of charge in percent
pub const MAX_TARGET_SOC: u8 = 100;

/// Active charging request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session creation instant
    pub start: DateTime<Utc>,

    /// Wall-clock hour the vehicle must be ready by
    pub pickup_hour: Hour,

    /// Target state of charge in percent
    pub target_soc: u8,
}

impl Session {
    /// Create a validated session
    pub fn new(start: DateTime<Utc>, pickup_hour: Hour, target_soc: u8) -> Result<Self> {
        if target_soc > MAX_TARGET_SOC {
            return Err(ChargeClockError::invalid_session(format!(
                "target state of charge out of range: {}",
                target_soc
            )));
        }
        Ok(Self {
            start,
            pickup_hour,
            target_soc,
        })
    }

    /// Build from raw request values (hours and percent as plain integers)
    pub fn from_raw(start: DateTime<Utc>, pickup_hour: i64, target_soc: i64) -> Result<Self> {
        let pickup_hour = Hour::try_from(pickup_hour)?;
        let target_soc = u8::try_from(target_soc).map_err(|_| {
            ChargeClockError::invalid_session(format!(
                "target state of charge out of range: {}",
                target_soc
            ))
        })?;
        Self::new(start, pickup_hour, target_soc)
    }

    /// Identity used to match async completions to this session
    pub fn id(&self) -> SessionId {
        SessionId(self.start)
    }

    /// Wall-clock hour the session started at in `tz`
    pub fn start_hour(&self, tz: &Tz) -> Hour {
        let local = self.start.with_timezone(tz);
        // hour() is always 0..=23
        Hour::new(local.hour() as u8).unwrap_or(Hour::MIDNIGHT)
    }

    /// Start timestamp as persisted and sent to the backend
    pub fn start_iso(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Session identity (its start instant)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub DateTime<Utc>);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}
