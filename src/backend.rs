//! Scheduling and charger-control backend
//!
//! The tracker only sees the two traits below. [`HttpBackend`] implements
//! both against the scheduling service; with the `backend` feature disabled
//! it is a stub whose calls all fail with [`ChargeClockError::FetchFailure`].

pub mod http;

pub use http::HttpBackend;

use crate::error::Result;
use crate::hour::ChargingPlan;
use crate::session::Session;
use async_trait::async_trait;

/// Source of the planned charging hours for a session
#[async_trait]
pub trait PlanSource: Send + Sync {
    async fn fetch_plan(&self, session: &Session) -> Result<ChargingPlan>;
}

/// Remote charger start/stop commands
#[async_trait]
pub trait ChargerControl: Send + Sync {
    /// Ask the backend to start charging for a new session
    async fn start_charging(&self, session: &Session) -> Result<()>;

    /// Ask the backend to stop charging; failures leave the session intact
    async fn stop_charging(&self) -> Result<()>;

    /// Append a started session to the history service
    async fn record_session(&self, session: &Session) -> Result<()>;
}

/// Query parameters shared by the plan, start and record requests
pub(crate) fn session_query(session: &Session) -> Vec<(&'static str, String)> {
    vec![
        ("start_charge_timestamp", session.start_iso()),
        ("hours", session.pickup_hour.value().to_string()),
        ("soc", session.target_soc.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_session_query_fields() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 22, 0, 0).unwrap();
        let session = Session::from_raw(start, 6, 80).unwrap();
        let query = session_query(&session);
        assert_eq!(
            query,
            vec![
                ("start_charge_timestamp", "2024-01-01T22:00:00.000Z".to_string()),
                ("hours", "6".to_string()),
                ("soc", "80".to_string()),
            ]
        );
    }
}
