use anyhow::Result;
use chargeclock::backend::HttpBackend;
use chargeclock::clock::SystemClock;
use chargeclock::config::Config;
use chargeclock::logging::{get_logger, init_logging};
use chargeclock::store::{JsonFileStore, SessionStore};
use chargeclock::tracker::{SessionTracker, TrackerOptions};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let logger = get_logger("main");
    logger.info(&format!("Chargeclock {} starting up", env!("APP_VERSION")));

    let store = SessionStore::new(Box::new(JsonFileStore::open(&config.storage.path)?));
    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    let options = TrackerOptions::from_config(&config)?;
    let (tracker, handle) = SessionTracker::new(
        options,
        Arc::new(SystemClock),
        backend.clone(),
        backend,
        store,
    );

    #[cfg(feature = "web")]
    let web_task = if config.web.enabled {
        let web_handle = handle.clone();
        let web_cfg = config.web.clone();
        let shutdown = tokio_util::sync::CancellationToken::new();
        let web_shutdown = shutdown.clone();
        let task = tokio::spawn(async move {
            if let Err(e) =
                chargeclock::web::serve(web_handle, &web_cfg.host, web_cfg.port, web_shutdown).await
            {
                get_logger("web").error(&format!("Web server error: {}", e));
            }
        });
        Some((task, shutdown))
    } else {
        None
    };

    let signal_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            get_logger("main").info("Interrupt received, shutting down");
            signal_handle.shutdown();
        }
    });

    let result = tracker.run(None).await;

    #[cfg(feature = "web")]
    if let Some((task, shutdown)) = web_task {
        shutdown.cancel();
        let _ = task.await;
    }

    match result {
        Ok(()) => {
            logger.info("Tracker shutdown complete");
            Ok(())
        }
        Err(e) => {
            logger.error(&format!("Tracker failed with error: {}", e));
            Err(anyhow::anyhow!("Tracker error: {}", e))
        }
    }
}
