//! Session timeline tracker
//!
//! [`SessionTracker`] is the single event loop that owns the session store,
//! the fetched plan, the status engine and the deadline timer. Every tick it
//! samples the clock once and publishes a [`TrackerSnapshot`]; backend calls
//! run as spawned tasks whose results come back as events tagged with the
//! session they were issued for.

mod commands;
mod runtime;
mod snapshot;
mod types;


pub use types::{TrackerCommand, TrackerHandle, TrackerOptions, TrackerSnapshot};

use crate::backend::{ChargerControl, PlanSource};
use crate::clock::Clock;
use crate::deadline::DeadlineScheduler;
use crate::hour::ChargingPlan;
use crate::logging::get_logger;
use crate::status::SessionStatusEngine;
use crate::store::SessionStore;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use types::{ScheduleMemo, TrackerEvent};

/// Event loop owning all mutable session state
pub struct SessionTracker {
    options: TrackerOptions,

    clock: Arc<dyn Clock>,
    plans: Arc<dyn PlanSource>,
    control: Arc<dyn ChargerControl>,

    /// The only mutable session state
    store: SessionStore,

    /// Plan of the active session; empty until fetched
    plan: ChargingPlan,
    engine: SessionStatusEngine,
    scheduler: DeadlineScheduler,
    memo: Option<ScheduleMemo>,

    /// Last fetch or stop failure shown to the user
    notice: Option<String>,

    commands_rx: mpsc::UnboundedReceiver<TrackerCommand>,
    events_tx: mpsc::UnboundedSender<TrackerEvent>,
    events_rx: mpsc::UnboundedReceiver<TrackerEvent>,
    snapshots: watch::Sender<Arc<TrackerSnapshot>>,

    /// Cancels the deadline timer and in-flight fetches of the current session
    session_token: CancellationToken,
    shutdown: CancellationToken,

    logger: crate::logging::StructuredLogger,
}

impl SessionTracker {
    /// Build a tracker and the handle used to talk to it
    pub fn new(
        options: TrackerOptions,
        clock: Arc<dyn Clock>,
        plans: Arc<dyn PlanSource>,
        control: Arc<dyn ChargerControl>,
        store: SessionStore,
    ) -> (Self, TrackerHandle) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let initial = Arc::new(TrackerSnapshot::inert(clock.now(), &options.tz));
        let (snapshots, snapshots_rx) = watch::channel(initial);
        let shutdown = CancellationToken::new();
        let session_token = shutdown.child_token();

        let handle = TrackerHandle::new(commands_tx, snapshots_rx, shutdown.clone());
        let scheduler = DeadlineScheduler::new(options.tz);

        let tracker = Self {
            options,
            clock,
            plans,
            control,
            store,
            plan: ChargingPlan::empty(),
            engine: SessionStatusEngine::new(),
            scheduler,
            memo: None,
            notice: None,
            commands_rx,
            events_tx,
            events_rx,
            snapshots,
            session_token,
            shutdown,
            logger: get_logger("tracker"),
        };
        (tracker, handle)
    }
}
