use super::SessionTracker;
use super::types::TrackerEvent;
use crate::error::Result;
use crate::hour::ChargingPlan;
use crate::session::{Session, SessionId};
use tokio::time::{MissedTickBehavior, interval};

impl SessionTracker {
    /// Run the loop until the handle requests shutdown.
    ///
    /// `fresh` parameters start a new session; `None` resumes a persisted one.
    pub async fn run(mut self, fresh: Option<Session>) -> Result<()> {
        self.activate(fresh);
        self.publish();

        let mut ticker = interval(self.options.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.logger.info(&format!(
            "Session tracker running (tick {} ms, tz {})",
            self.options.tick_interval.as_millis(),
            self.options.tz
        ));

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    self.logger.info("Shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {
                    self.publish();
                }
                Some(cmd) = self.commands_rx.recv() => {
                    self.handle_command(cmd);
                }
                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event);
                    self.publish();
                }
            }
        }

        self.session_token.cancel();
        self.scheduler.disarm();
        Ok(())
    }

    /// Hydrate the store and start timers and the plan fetch for its session.
    ///
    /// Any previous session's timers and fetches are cancelled first.
    pub(crate) fn activate(&mut self, fresh: Option<Session>) {
        self.reset_session_scope();

        let Some(session) = self.store.hydrate(fresh) else {
            return;
        };
        self.engine.begin_session();
        self.notice = None;

        let id = session.id();
        let events = self.events_tx.clone();
        let now = self.clock.now();
        self.scheduler.arm(
            session.start,
            session.pickup_hour,
            now,
            &self.session_token,
            move |_| {
                let _ = events.send(TrackerEvent::DeadlineReached { session: id });
            },
        );
        self.spawn_plan_fetch(session);
    }

    /// End the active session locally: timers cancelled, fields cleared, idle
    pub(crate) fn terminate(&mut self, reason: &str) {
        self.reset_session_scope();
        match self.store.clear() {
            Ok(true) => self.logger.info(&format!("Session ended: {}", reason)),
            Ok(false) => self.logger.debug("No session to end"),
            Err(e) => self
                .logger
                .error(&format!("Failed to clear persisted session: {}", e)),
        }
        self.engine.stop();
    }

    fn reset_session_scope(&mut self) {
        self.session_token.cancel();
        self.session_token = self.shutdown.child_token();
        self.scheduler.disarm();
        self.plan = ChargingPlan::empty();
        self.memo = None;
    }

    fn spawn_plan_fetch(&self, session: Session) {
        let plans = self.plans.clone();
        let events = self.events_tx.clone();
        let token = self.session_token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                result = plans.fetch_plan(&session) => {
                    let _ = events.send(TrackerEvent::PlanFetched {
                        session: session.id(),
                        result,
                    });
                }
            }
        });
    }

    /// Identity of the active session, if any
    pub(crate) fn current_id(&self) -> Option<SessionId> {
        self.store.current().map(Session::id)
    }
}
