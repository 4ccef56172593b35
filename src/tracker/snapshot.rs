use super::SessionTracker;
use super::types::{ScheduleMemo, TrackerSnapshot};
use crate::hour::Hour;
use crate::schedule::{HourSchedule, classify};
use crate::window::{build_window, window_end};
use chrono::Timelike;
use std::sync::Arc;

impl SessionTracker {
    /// Sample the clock once and publish the derived snapshot
    pub(crate) fn publish(&mut self) {
        let now = self.clock.now();
        let local = now.with_timezone(&self.options.tz);
        let current_hour = Hour::new(local.hour() as u8).unwrap_or(Hour::MIDNIGHT);
        let status = self.engine.tick(&self.plan, current_hour);

        let session = self.store.current().copied();
        let (schedule, session_window) = match &session {
            Some(s) => {
                let start_hour = s.start_hour(&self.options.tz);
                (
                    self.schedule_for(current_hour, start_hour),
                    build_window(start_hour, s.pickup_hour),
                )
            }
            None => (HourSchedule::inert(), Vec::new()),
        };

        let snapshot = TrackerSnapshot {
            generated_at: now,
            status,
            schedule,
            window_end: window_end(&session_window),
            session_window,
            countdown: self.scheduler.countdown(now),
            current_time: local.format("%H:%M").to_string(),
            session,
            deadline: self.scheduler.deadline(),
            plan: self.plan.clone(),
            notice: self.notice.clone(),
        };
        self.snapshots.send_replace(Arc::new(snapshot));
    }

    /// Classification reused while plan, current hour and start hour are unchanged
    fn schedule_for(&mut self, current: Hour, start: Hour) -> HourSchedule {
        if let Some(memo) = &self.memo
            && memo.current == current
            && memo.start == start
            && memo.plan == self.plan
        {
            return memo.schedule;
        }
        let schedule = classify(&self.plan, current, start);
        self.memo = Some(ScheduleMemo {
            plan: self.plan.clone(),
            current,
            start,
            schedule,
        });
        schedule
    }
}
