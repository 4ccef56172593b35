//! Coarse session status state machine
//!
//! `idle` means no session or an explicit stop; `standby` an active session
//! outside its planned hours; `charging` an active session inside them.

use crate::hour::{ChargingPlan, Hour};
use serde::{Deserialize, Serialize};

/// Coarse session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Standby,
    Charging,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Standby => "standby",
            Self::Charging => "charging",
        }
    }
}

/// Status engine driven by ticks, session starts and stop events
#[derive(Debug, Clone, Default)]
pub struct SessionStatusEngine {
    status: SessionStatus,
    active: bool,
    stopped: bool,
}

impl SessionStatusEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Whether a stop has latched the engine to idle
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// A session was hydrated or created; clears a previous stop latch
    pub fn begin_session(&mut self) {
        self.active = true;
        self.stopped = false;
        self.status = SessionStatus::Standby;
    }

    /// Explicit stop: idle until the next `begin_session`
    pub fn stop(&mut self) {
        self.active = false;
        self.stopped = true;
        self.status = SessionStatus::Idle;
    }

    /// Re-evaluate for the tick's current hour
    pub fn tick(&mut self, plan: &ChargingPlan, current_hour: Hour) -> SessionStatus {
        self.status = if self.stopped || !self.active {
            SessionStatus::Idle
        } else if plan.contains(current_hour) {
            SessionStatus::Charging
        } else {
            SessionStatus::Standby
        };
        self.status
    }
}
