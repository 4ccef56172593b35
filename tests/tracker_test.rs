use async_trait::async_trait;
use chargeclock::backend::{ChargerControl, PlanSource};
use chargeclock::clock::ManualClock;
use chargeclock::error::{ChargeClockError, Result};
use chargeclock::hour::{ChargingPlan, Hour};
use chargeclock::session::Session;
use chargeclock::status::SessionStatus;
use chargeclock::store::{JsonFileStore, SessionStore};
use chargeclock::tracker::{SessionTracker, TrackerHandle, TrackerOptions};
use chrono::{DateTime, TimeZone, Utc};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Backend answering with the two hours before pickup
#[derive(Default)]
struct ScriptedBackend {
    fail_start: AtomicBool,
    fail_stop: AtomicBool,
    fail_fetch: AtomicBool,
    fail_record: AtomicBool,
    stop_calls: AtomicUsize,
    record_calls: AtomicUsize,
}

#[async_trait]
impl PlanSource for ScriptedBackend {
    async fn fetch_plan(&self, session: &Session) -> Result<ChargingPlan> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ChargeClockError::fetch("HTTP 500"));
        }
        let pickup = i64::from(session.pickup_hour.value());
        Ok(ChargingPlan::from_raw([
            (pickup + 22) % 24,
            (pickup + 23) % 24,
        ]))
    }
}

#[async_trait]
impl ChargerControl for ScriptedBackend {
    async fn start_charging(&self, _session: &Session) -> Result<()> {
        if self.fail_start.load(Ordering::SeqCst) {
            Err(ChargeClockError::fetch("HTTP 503"))
        } else {
            Ok(())
        }
    }

    async fn stop_charging(&self) -> Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop.load(Ordering::SeqCst) {
            Err(ChargeClockError::fetch("HTTP 503"))
        } else {
            Ok(())
        }
    }

    async fn record_session(&self, _session: &Session) -> Result<()> {
        self.record_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_record.load(Ordering::SeqCst) {
            Err(ChargeClockError::fetch("HTTP 500"))
        } else {
            Ok(())
        }
    }
}

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

fn hour(v: u8) -> Hour {
    Hour::new(v).unwrap()
}

fn spawn_tracker(
    now: DateTime<Utc>,
    backend: Arc<ScriptedBackend>,
    store_path: &Path,
    fresh: Option<Session>,
) -> (TrackerHandle, ManualClock) {
    let clock = ManualClock::new(now);
    let store = SessionStore::new(Box::new(JsonFileStore::open(store_path).unwrap()));
    let (tracker, handle) = SessionTracker::new(
        TrackerOptions::default(),
        Arc::new(clock.clone()),
        backend.clone(),
        backend,
        store,
    );
    tokio::spawn(tracker.run(fresh));
    (handle, clock)
}

fn persisted(path: &Path) -> Option<Session> {
    SessionStore::new(Box::new(JsonFileStore::open(path).unwrap())).load()
}

async fn settle() {
    tokio::time::sleep(Duration::from_secs(2)).await;
}

#[tokio::test(start_paused = true)]
async fn created_session_fetches_plan_and_counts_down() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let backend = Arc::new(ScriptedBackend::default());
    let (handle, clock) = spawn_tracker(utc(2024, 1, 1, 22, 0), backend, &path, None);

    let session = handle.create_session(6, 80).await.unwrap();
    assert_eq!(session.start, utc(2024, 1, 1, 22, 0));
    assert_eq!(persisted(&path), Some(session));

    clock.set(utc(2024, 1, 2, 4, 30));
    settle().await;

    let snap = handle.snapshot();
    assert_eq!(snap.status, SessionStatus::Charging);
    assert!(snap.plan.contains(hour(4)));
    assert!(snap.plan.contains(hour(5)));
    assert_eq!(snap.countdown, "01:30:00");
    assert_eq!(snap.current_time, "04:30");
    assert_eq!(snap.session_window.len(), 8);
    handle.shutdown();
}

#[tokio::test(start_paused = true)]
async fn resumes_persisted_session_on_start() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let session = Session::from_raw(utc(2024, 1, 1, 22, 0), 6, 80).unwrap();
    {
        let mut store = SessionStore::new(Box::new(JsonFileStore::open(&path).unwrap()));
        store.persist(&session).unwrap();
    }

    let backend = Arc::new(ScriptedBackend::default());
    let (handle, _clock) = spawn_tracker(utc(2024, 1, 1, 23, 0), backend, &path, None);
    settle().await;

    let snap = handle.snapshot();
    assert_eq!(snap.session, Some(session));
    assert_eq!(snap.status, SessionStatus::Standby);
    assert_eq!(snap.countdown, "07:00:00");
    handle.shutdown();
}

#[tokio::test(start_paused = true)]
async fn fetch_failure_keeps_standby() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let backend = Arc::new(ScriptedBackend::default());
    backend.fail_fetch.store(true, Ordering::SeqCst);
    let (handle, _clock) = spawn_tracker(utc(2024, 1, 1, 22, 0), backend, &path, None);

    handle.create_session(6, 80).await.unwrap();
    settle().await;

    let snap = handle.snapshot();
    assert_eq!(snap.status, SessionStatus::Standby);
    assert!(snap.plan.is_empty());
    assert!(snap.notice.is_none());
    handle.shutdown();
}

#[tokio::test(start_paused = true)]
async fn stop_failure_notice_outlives_plan_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let backend = Arc::new(ScriptedBackend::default());
    backend.fail_stop.store(true, Ordering::SeqCst);
    let (handle, clock) = spawn_tracker(utc(2024, 1, 1, 22, 0), backend, &path, None);

    // Stop fails while the 200 ms plan fetch is still in flight
    handle.create_session(6, 80).await.unwrap();
    handle.stop().await.unwrap_err();
    assert!(handle.snapshot().notice.is_some());

    clock.set(utc(2024, 1, 2, 4, 0));
    settle().await;
    let snap = handle.snapshot();
    assert_eq!(snap.status, SessionStatus::Charging);
    assert!(snap.notice.as_deref().unwrap_or("").contains("stop"));
    handle.shutdown();
}

#[tokio::test(start_paused = true)]
async fn created_session_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let backend = Arc::new(ScriptedBackend::default());
    let (handle, _clock) = spawn_tracker(utc(2024, 1, 1, 22, 0), backend.clone(), &path, None);

    handle.create_session(6, 80).await.unwrap();
    settle().await;
    assert_eq!(backend.record_calls.load(Ordering::SeqCst), 1);
    handle.shutdown();
}

#[tokio::test(start_paused = true)]
async fn failed_recording_keeps_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let backend = Arc::new(ScriptedBackend::default());
    backend.fail_record.store(true, Ordering::SeqCst);
    let (handle, _clock) = spawn_tracker(utc(2024, 1, 1, 22, 0), backend.clone(), &path, None);

    let session = handle.create_session(6, 80).await.unwrap();
    settle().await;
    assert_eq!(backend.record_calls.load(Ordering::SeqCst), 1);
    let snap = handle.snapshot();
    assert_eq!(snap.session, Some(session));
    assert!(snap.notice.is_none());
    assert_eq!(persisted(&path), Some(session));
    handle.shutdown();
}

#[tokio::test(start_paused = true)]
async fn rejected_start_persists_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let backend = Arc::new(ScriptedBackend::default());
    backend.fail_start.store(true, Ordering::SeqCst);
    let (handle, _clock) = spawn_tracker(utc(2024, 1, 1, 22, 0), backend.clone(), &path, None);

    let err = handle.create_session(6, 80).await.unwrap_err();
    assert!(matches!(err, ChargeClockError::FetchFailure { .. }));
    let err = handle.create_session(6, 101).await.unwrap_err();
    assert!(matches!(err, ChargeClockError::InvalidSessionState { .. }));

    settle().await;
    assert!(handle.snapshot().session.is_none());
    assert_eq!(persisted(&path), None);
    assert_eq!(backend.record_calls.load(Ordering::SeqCst), 0);
    handle.shutdown();
}

#[tokio::test(start_paused = true)]
async fn stop_failure_leaves_session_intact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let backend = Arc::new(ScriptedBackend::default());
    backend.fail_stop.store(true, Ordering::SeqCst);
    let (handle, clock) = spawn_tracker(utc(2024, 1, 1, 22, 0), backend.clone(), &path, None);

    let session = handle.create_session(6, 80).await.unwrap();
    clock.set(utc(2024, 1, 2, 4, 0));
    settle().await;
    assert_eq!(handle.snapshot().status, SessionStatus::Charging);

    let err = handle.stop().await.unwrap_err();
    assert!(matches!(err, ChargeClockError::FetchFailure { .. }));
    assert_eq!(backend.stop_calls.load(Ordering::SeqCst), 1);

    settle().await;
    let snap = handle.snapshot();
    assert_eq!(snap.status, SessionStatus::Charging);
    assert_eq!(snap.session, Some(session));
    assert!(snap.notice.as_deref().unwrap_or("").contains("stop"));
    assert_eq!(persisted(&path), Some(session));
    handle.shutdown();
}

#[tokio::test(start_paused = true)]
async fn stop_success_is_idle_and_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let backend = Arc::new(ScriptedBackend::default());
    let (handle, clock) = spawn_tracker(utc(2024, 1, 1, 22, 0), backend, &path, None);

    handle.create_session(6, 80).await.unwrap();
    clock.set(utc(2024, 1, 2, 4, 0));
    settle().await;

    handle.stop().await.unwrap();
    let snap = handle.snapshot();
    assert_eq!(snap.status, SessionStatus::Idle);
    assert!(snap.session.is_none());
    assert!(snap.plan.is_empty());
    assert_eq!(snap.countdown, "00:00:00");
    assert_eq!(persisted(&path), None);

    handle.stop().await.unwrap();
    settle().await;
    assert_eq!(handle.snapshot().status, SessionStatus::Idle);
    handle.shutdown();
}

#[tokio::test(start_paused = true)]
async fn plan_fetch_after_stop_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let backend = Arc::new(ScriptedBackend::default());
    let (handle, _clock) = spawn_tracker(utc(2024, 1, 1, 22, 0), backend, &path, None);

    // Stop lands while the 200 ms plan fetch is still in flight
    handle.create_session(6, 80).await.unwrap();
    handle.stop().await.unwrap();
    settle().await;

    let snap = handle.snapshot();
    assert!(snap.plan.is_empty());
    assert_eq!(snap.status, SessionStatus::Idle);
    handle.shutdown();
}

#[tokio::test(start_paused = true)]
async fn newer_session_replaces_older_plan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let backend = Arc::new(ScriptedBackend::default());
    let (handle, clock) = spawn_tracker(utc(2024, 1, 1, 22, 0), backend, &path, None);

    handle.create_session(6, 80).await.unwrap();
    clock.set(utc(2024, 1, 1, 22, 1));
    let second = handle.create_session(9, 60).await.unwrap();
    settle().await;

    let snap = handle.snapshot();
    assert_eq!(snap.session, Some(second));
    assert!(snap.plan.contains(hour(7)));
    assert!(snap.plan.contains(hour(8)));
    assert!(!snap.plan.contains(hour(4)));
    assert_eq!(persisted(&path), Some(second));
    handle.shutdown();
}

#[tokio::test(start_paused = true)]
async fn deadline_terminates_session_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let backend = Arc::new(ScriptedBackend::default());
    let (handle, clock) = spawn_tracker(utc(2024, 1, 1, 4, 0), backend.clone(), &path, None);

    handle.create_session(6, 80).await.unwrap();
    settle().await;
    assert_eq!(handle.snapshot().status, SessionStatus::Charging);

    clock.set(utc(2024, 1, 1, 6, 0));
    tokio::time::sleep(Duration::from_secs(2 * 3600)).await;

    let snap = handle.snapshot();
    assert!(snap.session.is_none());
    assert_eq!(snap.status, SessionStatus::Idle);
    assert_eq!(snap.countdown, "00:00:00");
    assert_eq!(persisted(&path), None);
    // Deadline termination is local; the backend is not asked to stop
    assert_eq!(backend.stop_calls.load(Ordering::SeqCst), 0);
    handle.shutdown();
}

#[tokio::test(start_paused = true)]
async fn resumed_session_past_its_deadline_ends_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let session = Session::from_raw(utc(2024, 1, 1, 22, 0), 6, 80).unwrap();
    {
        let mut store = SessionStore::new(Box::new(JsonFileStore::open(&path).unwrap()));
        store.persist(&session).unwrap();
    }

    let backend = Arc::new(ScriptedBackend::default());
    let (handle, _clock) = spawn_tracker(utc(2024, 1, 2, 9, 0), backend, &path, None);
    settle().await;

    assert!(handle.snapshot().session.is_none());
    assert_eq!(handle.snapshot().status, SessionStatus::Idle);
    assert_eq!(persisted(&path), None);
    handle.shutdown();
}

#[tokio::test(start_paused = true)]
async fn fresh_parameters_override_persisted_ones() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    {
        let old = Session::from_raw(utc(2024, 1, 1, 20, 0), 5, 50).unwrap();
        let mut store = SessionStore::new(Box::new(JsonFileStore::open(&path).unwrap()));
        store.persist(&old).unwrap();
    }

    let fresh = Session::from_raw(utc(2024, 1, 1, 22, 0), 7, 90).unwrap();
    let backend = Arc::new(ScriptedBackend::default());
    let (handle, _clock) =
        spawn_tracker(utc(2024, 1, 1, 22, 0), backend, &path, Some(fresh));
    settle().await;

    assert_eq!(handle.snapshot().session, Some(fresh));
    assert_eq!(persisted(&path), Some(fresh));
    handle.shutdown();
}
