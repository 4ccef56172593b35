use super::{ChargerControl, PlanSource};
use crate::config::BackendConfig;
use crate::error::{ChargeClockError, Result};
use crate::hour::ChargingPlan;
use crate::session::Session;
use async_trait::async_trait;

#[cfg(feature = "backend")]
use crate::logging::get_logger;
#[cfg(feature = "backend")]
use serde::Deserialize;

/// Plan query response body
#[cfg(feature = "backend")]
#[derive(Debug, Deserialize)]
struct PlanResponse {
    #[serde(default)]
    charging_hours: Vec<i64>,
}

/// HTTP client for the scheduling service
pub struct HttpBackend {
    #[cfg(feature = "backend")]
    client: reqwest::Client,
    #[cfg(feature = "backend")]
    base_url: String,
    #[cfg(feature = "backend")]
    sessions_url: String,
    #[cfg(feature = "backend")]
    logger: crate::logging::StructuredLogger,
}

impl HttpBackend {
    /// Create a client with the configured request timeout
    pub fn new(cfg: &BackendConfig) -> Result<Self> {
        #[cfg(feature = "backend")]
        {
            let client = reqwest::Client::builder()
                .timeout(std::time::Duration::from_millis(cfg.request_timeout_ms))
                .user_agent(concat!("chargeclock/", env!("CARGO_PKG_VERSION")))
                .build()?;
            let sessions_url = cfg.sessions_url.as_deref().unwrap_or(&cfg.base_url);
            Ok(Self {
                client,
                base_url: cfg.base_url.trim_end_matches('/').to_string(),
                sessions_url: sessions_url.trim_end_matches('/').to_string(),
                logger: get_logger("backend"),
            })
        }
        #[cfg(not(feature = "backend"))]
        {
            let _ = cfg;
            Ok(Self {})
        }
    }

    #[cfg(feature = "backend")]
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    #[cfg(feature = "backend")]
    fn sessions_endpoint(&self) -> String {
        format!("{}/api/save_session", self.sessions_url)
    }

    /// Send a request and turn transport errors and non-2xx answers into fetch failures
    #[cfg(feature = "backend")]
    async fn send(&self, what: &str, req: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let resp = req.send().await.map_err(|e| {
            self.logger.warn(&format!("{} request failed: {}", what, e));
            ChargeClockError::fetch(format!("{} request failed: {}", what, e))
        })?;
        let status = resp.status();
        if !status.is_success() {
            self.logger
                .warn(&format!("{} rejected with HTTP {}", what, status));
            return Err(ChargeClockError::fetch(format!(
                "{} rejected with HTTP {}",
                what, status
            )));
        }
        Ok(resp)
    }
}

#[cfg(feature = "backend")]
#[async_trait]
impl PlanSource for HttpBackend {
    async fn fetch_plan(&self, session: &Session) -> Result<ChargingPlan> {
        let req = self
            .client
            .get(self.url("/api/charging_schedule"))
            .query(&super::session_query(session));
        let resp = self.send("Plan query", req).await?;
        let body: PlanResponse = resp
            .json()
            .await
            .map_err(|e| ChargeClockError::fetch(format!("Malformed plan response: {}", e)))?;
        let plan = ChargingPlan::from_raw(body.charging_hours);
        self.logger.with_session(&session.id().to_string()).info(&format!(
            "Fetched charging plan with {} hour(s)",
            plan.len()
        ));
        Ok(plan)
    }
}

#[cfg(feature = "backend")]
#[async_trait]
impl ChargerControl for HttpBackend {
    async fn start_charging(&self, session: &Session) -> Result<()> {
        let mut query = super::session_query(session);
        query.push(("minutes", "0".to_string()));
        let req = self.client.post(self.url("/api/charge")).query(&query);
        self.send("Start charging", req).await?;
        self.logger
            .with_session(&session.id().to_string())
            .info("Backend accepted charging request");
        Ok(())
    }

    async fn stop_charging(&self) -> Result<()> {
        let req = self.client.post(self.url("/api/stop_charging"));
        self.send("Stop charging", req).await?;
        self.logger.info("Backend stopped charging");
        Ok(())
    }

    async fn record_session(&self, session: &Session) -> Result<()> {
        let mut query = super::session_query(session);
        query.push(("minutes", "0".to_string()));
        let req = self.client.post(self.sessions_endpoint()).query(&query);
        self.send("Record session", req).await?;
        self.logger
            .with_session(&session.id().to_string())
            .debug("Session recorded");
        Ok(())
    }
}

#[cfg(not(feature = "backend"))]
#[async_trait]
impl PlanSource for HttpBackend {
    async fn fetch_plan(&self, _session: &Session) -> Result<ChargingPlan> {
        Err(ChargeClockError::fetch("Backend integration disabled"))
    }
}

#[cfg(not(feature = "backend"))]
#[async_trait]
impl ChargerControl for HttpBackend {
    async fn start_charging(&self, _session: &Session) -> Result<()> {
        Err(ChargeClockError::fetch("Backend integration disabled"))
    }

    async fn stop_charging(&self) -> Result<()> {
        Err(ChargeClockError::fetch("Backend integration disabled"))
    }

    async fn record_session(&self, _session: &Session) -> Result<()> {
        Err(ChargeClockError::fetch("Backend integration disabled"))
    }
}
