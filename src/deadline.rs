//! Pickup deadline, countdown and termination timer
//!
//! The deadline is the first instant at or after the session start whose
//! local hour equals the pickup hour. The countdown is recomputed on every
//! tick; termination hangs off a one-shot timer task so it still fires when
//! ticks are late or skipped.

use crate::hour::Hour;
use crate::logging::get_logger;
use chrono::{DateTime, Days, Duration as ChronoDuration, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

/// Countdown shown when nothing is armed or the deadline has passed
pub const ZERO_COUNTDOWN: &str = "00:00:00";

/// Compute the pickup deadline for a session started at `session_start`.
///
/// Returns `None` only when the local date arithmetic leaves chrono's range.
pub fn compute_deadline(
    session_start: DateTime<Utc>,
    pickup_hour: Hour,
    tz: &Tz,
) -> Option<DateTime<Utc>> {
    let local_date = session_start.with_timezone(tz).date_naive();
    let same_day = local_date.and_hms_opt(u32::from(pickup_hour.value()), 0, 0)?;
    let candidate = resolve_local(tz, same_day)?;
    if candidate > session_start {
        return Some(candidate);
    }

    let next_day = local_date
        .checked_add_days(Days::new(1))?
        .and_hms_opt(u32::from(pickup_hour.value()), 0, 0)?;
    resolve_local(tz, next_day)
}

/// Map a local wall-clock time to UTC; ambiguous times take the earlier
/// instant, times inside a DST gap move to the end of the gap.
fn resolve_local(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => Some(t.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => {
            // Gaps are at most a couple of hours in practice
            (1..=3).find_map(|h| {
                tz.from_local_datetime(&(naive + ChronoDuration::hours(h)))
                    .earliest()
                    .map(|t| t.with_timezone(&Utc))
            })
        }
    }
}

/// Format remaining time as `HH:MM:SS`, clamping negatives to zero
pub fn format_countdown(remaining: ChronoDuration) -> String {
    let secs = remaining.num_seconds().max(0);
    let hours = secs / 3600;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

#[derive(Debug)]
struct ArmedDeadline {
    session_start: DateTime<Utc>,
    pickup_hour: Hour,
    deadline: DateTime<Utc>,
    cancel: CancellationToken,
    fired: Arc<AtomicBool>,
}

/// Owner of the armed deadline and its one-shot termination timer
#[derive(Debug)]
pub struct DeadlineScheduler {
    tz: Tz,
    armed: Option<ArmedDeadline>,
    logger: crate::logging::StructuredLogger,
}

impl DeadlineScheduler {
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            armed: None,
            logger: get_logger("deadline"),
        }
    }

    /// Armed deadline, if any
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.armed.as_ref().map(|a| a.deadline)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Whether the termination callback for the armed deadline has run
    pub fn has_fired(&self) -> bool {
        self.armed
            .as_ref()
            .is_some_and(|a| a.fired.load(Ordering::SeqCst))
    }

    /// Arm the timer for a session; `on_deadline` runs once when `now >= deadline`.
    ///
    /// Re-arming with the same start and pickup hour keeps the running timer.
    /// The timer is cancelled with `parent` as well as by [`Self::disarm`].
    /// Must be called inside a tokio runtime.
    pub fn arm<F>(
        &mut self,
        session_start: DateTime<Utc>,
        pickup_hour: Hour,
        now: DateTime<Utc>,
        parent: &CancellationToken,
        on_deadline: F,
    ) -> Option<DateTime<Utc>>
    where
        F: FnOnce(DateTime<Utc>) + Send + 'static,
    {
        if let Some(armed) = &self.armed
            && armed.session_start == session_start
            && armed.pickup_hour == pickup_hour
        {
            return Some(armed.deadline);
        }
        self.disarm();

        let Some(deadline) = compute_deadline(session_start, pickup_hour, &self.tz) else {
            self.logger.warn(&format!(
                "Cannot compute deadline for start {} pickup {}; scheduler inert",
                session_start, pickup_hour
            ));
            return None;
        };

        let delay = (deadline - now).to_std().unwrap_or_default();
        let cancel = parent.child_token();
        let fired = Arc::new(AtomicBool::new(false));

        let task_cancel = cancel.clone();
        let task_fired = fired.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = task_cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if !task_fired.swap(true, Ordering::SeqCst) {
                        on_deadline(deadline);
                    }
                }
            }
        });

        self.logger.info(&format!(
            "Armed pickup deadline {} (in {})",
            deadline,
            format_countdown(deadline - now)
        ));

        self.armed = Some(ArmedDeadline {
            session_start,
            pickup_hour,
            deadline,
            cancel,
            fired,
        });
        Some(deadline)
    }

    /// Cancel the timer and forget the deadline; no-op when inert
    pub fn disarm(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.cancel.cancel();
            self.logger.debug(&format!("Disarmed deadline {}", armed.deadline));
        }
    }

    /// Countdown to the armed deadline as of `now`
    pub fn countdown(&self, now: DateTime<Utc>) -> String {
        match &self.armed {
            Some(armed) => format_countdown(armed.deadline - now),
            None => ZERO_COUNTDOWN.to_string(),
        }
    }
}

impl Drop for DeadlineScheduler {
    fn drop(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.cancel.cancel();
        }
    }
}
