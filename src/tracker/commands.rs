use super::SessionTracker;
use super::types::{TrackerCommand, TrackerEvent};
use crate::error::{ChargeClockError, Result};
use crate::session::{Session, SessionId};

impl SessionTracker {
    pub(crate) fn handle_command(&mut self, cmd: TrackerCommand) {
        match cmd {
            TrackerCommand::CreateSession {
                pickup_hour,
                target_soc,
                reply,
            } => {
                let session = match Session::from_raw(self.clock.now(), pickup_hour, target_soc) {
                    Ok(s) => s,
                    Err(e) => {
                        self.logger
                            .warn(&format!("Rejected session request: {}", e));
                        let _ = reply.send(Err(e));
                        return;
                    }
                };
                let control = self.control.clone();
                let events = self.events_tx.clone();
                let shutdown = self.shutdown.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = shutdown.cancelled() => {}
                        result = control.start_charging(&session) => {
                            let _ = events.send(TrackerEvent::SessionStarted { session, result, reply });
                        }
                    }
                });
            }
            TrackerCommand::Stop { reply } => {
                let issued_for = self.current_id();
                let control = self.control.clone();
                let events = self.events_tx.clone();
                let shutdown = self.shutdown.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = shutdown.cancelled() => {}
                        result = control.stop_charging() => {
                            let _ = events.send(TrackerEvent::StopCompleted {
                                session: issued_for,
                                result,
                                reply,
                            });
                        }
                    }
                });
            }
        }
    }

    /// Apply a completion; replies go out after the resulting snapshot is published
    pub(crate) fn handle_event(&mut self, event: TrackerEvent) {
        match event {
            TrackerEvent::SessionStarted {
                session,
                result,
                reply,
            } => {
                let outcome = match result {
                    Ok(()) => {
                        self.activate(Some(session));
                        self.spawn_record(session);
                        Ok(session)
                    }
                    Err(e) => {
                        self.logger
                            .warn(&format!("Backend refused new session: {}", e));
                        Err(e)
                    }
                };
                self.publish();
                let _ = reply.send(outcome);
            }
            TrackerEvent::PlanFetched { session, result } => {
                if let Err(e) = self.ensure_current(session, "plan fetch") {
                    self.log_dropped(&e);
                    return;
                }
                // Plan outcomes are logged only; the notice belongs to stop failures
                match result {
                    Ok(plan) => self.plan = plan,
                    Err(e) => {
                        self.logger
                            .with_session(&session.to_string())
                            .warn(&format!("No charging plan, staying in standby: {}", e));
                    }
                }
            }
            TrackerEvent::StopCompleted {
                session,
                result,
                reply,
            } => {
                let outcome = self.complete_stop(session, result);
                self.publish();
                let _ = reply.send(outcome);
            }
            TrackerEvent::DeadlineReached { session } => {
                if let Err(e) = self.ensure_current(session, "deadline") {
                    self.log_dropped(&e);
                    return;
                }
                self.terminate("pickup deadline reached");
            }
        }
    }

    fn complete_stop(&mut self, issued_for: Option<SessionId>, result: Result<()>) -> Result<()> {
        if let Err(e) = result {
            self.logger.error(&format!("Stop charging failed: {}", e));
            self.notice = Some(format!("Failed to stop charging: {}", e));
            return Err(e);
        }

        // A stop that lands after a newer session started leaves that session alone
        let current = self.current_id();
        if current.is_some() && current != issued_for {
            let e = ChargeClockError::stale(format!(
                "stop issued for {:?} but session {:?} is active",
                issued_for.map(|id| id.to_string()),
                current.map(|id| id.to_string())
            ));
            self.log_dropped(&e);
            return Ok(());
        }

        self.terminate("stopped by user");
        self.notice = None;
        Ok(())
    }

    /// Report a started session to the history service; failures are only logged
    fn spawn_record(&self, session: Session) {
        let control = self.control.clone();
        let shutdown = self.shutdown.clone();
        let logger = self.logger.with_session(&session.id().to_string());
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                result = control.record_session(&session) => {
                    if let Err(e) = result {
                        logger.warn(&format!("Session not recorded: {}", e));
                    }
                }
            }
        });
    }

    fn ensure_current(&self, session: SessionId, what: &str) -> Result<()> {
        if self.current_id() == Some(session) {
            Ok(())
        } else {
            Err(ChargeClockError::stale(format!(
                "{} for session {} arrived after it ended",
                what, session
            )))
        }
    }

    fn log_dropped(&self, e: &ChargeClockError) {
        self.logger.debug(&format!("Dropping event: {}", e));
    }
}
