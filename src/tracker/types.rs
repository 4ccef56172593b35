use crate::config::Config;
use crate::deadline::ZERO_COUNTDOWN;
use crate::error::{ChargeClockError, Result};
use crate::hour::{ChargingPlan, Hour};
use crate::schedule::HourSchedule;
use crate::session::{Session, SessionId};
use crate::status::SessionStatus;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

/// Tracker settings derived from configuration
#[derive(Debug, Clone)]
pub struct TrackerOptions {
    pub tick_interval: Duration,
    pub tz: Tz,
}

impl TrackerOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            tz: config.tz()?,
        })
    }
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            tz: chrono_tz::UTC,
        }
    }
}

/// Commands accepted from external components (web, CLI)
#[derive(Debug)]
pub enum TrackerCommand {
    /// Start a session now with raw pickup hour and target percent
    CreateSession {
        pickup_hour: i64,
        target_soc: i64,
        reply: oneshot::Sender<Result<Session>>,
    },
    /// Stop charging and end the session
    Stop { reply: oneshot::Sender<Result<()>> },
}

/// Async completions delivered back to the loop
#[derive(Debug)]
pub(crate) enum TrackerEvent {
    SessionStarted {
        session: Session,
        result: Result<()>,
        reply: oneshot::Sender<Result<Session>>,
    },
    PlanFetched {
        session: SessionId,
        result: Result<ChargingPlan>,
    },
    StopCompleted {
        /// Session active when the stop was issued
        session: Option<SessionId>,
        result: Result<()>,
        reply: oneshot::Sender<Result<()>>,
    },
    DeadlineReached {
        session: SessionId,
    },
}

/// Last computed schedule and the inputs it was computed from
#[derive(Debug, Clone)]
pub(crate) struct ScheduleMemo {
    pub plan: ChargingPlan,
    pub current: Hour,
    pub start: Hour,
    pub schedule: HourSchedule,
}

/// Everything a UI needs to render one tick
#[derive(Debug, Clone, Serialize)]
pub struct TrackerSnapshot {
    pub generated_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub schedule: HourSchedule,
    pub session_window: Vec<Hour>,
    /// Boundary hour closing the window arc
    pub window_end: Option<Hour>,
    pub countdown: String,
    /// Local wall-clock time, `HH:MM`
    pub current_time: String,
    pub session: Option<Session>,
    pub deadline: Option<DateTime<Utc>>,
    pub plan: ChargingPlan,
    pub notice: Option<String>,
}

impl TrackerSnapshot {
    /// Snapshot with no session
    pub fn inert(now: DateTime<Utc>, tz: &Tz) -> Self {
        Self {
            generated_at: now,
            status: SessionStatus::Idle,
            schedule: HourSchedule::inert(),
            session_window: Vec::new(),
            window_end: None,
            countdown: ZERO_COUNTDOWN.to_string(),
            current_time: now.with_timezone(tz).format("%H:%M").to_string(),
            session: None,
            deadline: None,
            plan: ChargingPlan::empty(),
            notice: None,
        }
    }
}

/// Cloneable handle to a running tracker
#[derive(Debug, Clone)]
pub struct TrackerHandle {
    commands: mpsc::UnboundedSender<TrackerCommand>,
    snapshots: watch::Receiver<Arc<TrackerSnapshot>>,
    shutdown: CancellationToken,
}

impl TrackerHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<TrackerCommand>,
        snapshots: watch::Receiver<Arc<TrackerSnapshot>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            commands,
            snapshots,
            shutdown,
        }
    }

    /// Create a session starting now; resolves once the backend accepted it
    pub async fn create_session(&self, pickup_hour: i64, target_soc: i64) -> Result<Session> {
        let (reply, rx) = oneshot::channel();
        self.send(TrackerCommand::CreateSession {
            pickup_hour,
            target_soc,
            reply,
        })?;
        rx.await.map_err(|_| tracker_gone())?
    }

    /// Stop charging; on failure the session stays active
    pub async fn stop(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(TrackerCommand::Stop { reply })?;
        rx.await.map_err(|_| tracker_gone())?
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<TrackerSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<TrackerSnapshot>> {
        self.snapshots.clone()
    }

    /// Ask the loop to exit and cancel all timers and in-flight calls
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    fn send(&self, cmd: TrackerCommand) -> Result<()> {
        self.commands.send(cmd).map_err(|_| tracker_gone())
    }
}

fn tracker_gone() -> ChargeClockError {
    ChargeClockError::generic("Session tracker is not running")
}
