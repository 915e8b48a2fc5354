use anyhow::{Context, Result};
use flexprice::config::Config;
use flexprice::http::ReqwestTransport;
use flexprice::logging::{get_logger, init_logging};
use flexprice::{SettingsStore, TariffEngine};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = Config::locate();
    let config = Config::load_from(config_path.as_deref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_logging(&config.logging).context("Failed to initialize logging")?;
    let logger = get_logger("main");
    logger.info(&format!("FlexPrice {} starting up", env!("APP_VERSION")));
    match &config_path {
        Some(path) => logger.info(&format!("Using configuration {}", path.display())),
        None => logger.info("No configuration file found, using defaults"),
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let settings = SettingsStore::new(config.clone());

    let watcher = config_path
        .clone()
        .map(|path| settings.spawn_file_watcher(path, shutdown_rx.clone()));

    let transport = Arc::new(ReqwestTransport::new().context("Failed to build HTTP client")?);
    let engine = Arc::new(TariffEngine::new(settings, transport).context("Failed to create engine")?);
    let timer = engine
        .initialize(shutdown_rx.clone())
        .await
        .context("Failed to start refresh engine")?;

    let web_engine = Arc::clone(&engine);
    let web_shutdown = shutdown_rx.clone();
    let mut web_task = tokio::spawn(async move {
        flexprice::web::serve(web_engine, &config.web.host, config.web.port, web_shutdown).await
    });

    // The web server only returns early on a bind or serve error
    let early_exit = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                logger.error(&format!("Failed to listen for shutdown signal: {}", e));
            }
            logger.info("Shutdown requested");
            None
        }
        result = &mut web_task => Some(result),
    };

    let _ = shutdown_tx.send(true);
    let _ = timer.await;
    if let Some(watcher) = watcher {
        let _ = watcher.await;
    }
    let web_result = match early_exit {
        Some(result) => result,
        None => web_task.await,
    };
    match web_result {
        Ok(Err(e)) => logger.error(&format!("Web server error: {}", e)),
        Err(e) => logger.error(&format!("Web server task failed: {}", e)),
        Ok(Ok(())) => {}
    }

    if !engine.drain(DRAIN_TIMEOUT).await {
        logger.warn("Refresh still running at shutdown, exiting anyway");
    }
    logger.info("Shutdown complete");
    Ok(())
}
