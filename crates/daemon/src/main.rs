//! `noisewatch-daemon` -- noise-level alerting service.
//!
//! Reads device readings and telemetry as JSON lines on stdin, stores them in
//! SQLite, and sends an SMS when a device keeps exceeding its threshold.
//! Configuration comes from the environment (see [`DaemonConfig::from_env`]).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use noisewatch_core::clock::{Clock, SystemClock};
use noisewatch_daemon::{ingest, logging, retention, DaemonConfig, Services};
use noisewatch_events::SmsDelivery;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

/// Upper bound on waiting for in-flight notifications at shutdown.
const NOTIFY_DRAIN_LIMIT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = DaemonConfig::from_env().context("Invalid configuration")?;
    logging::init(config.log_format);

    tracing::info!(
        database = %config.redacted_database_url(),
        gateway = %config.sms.gateway_url,
        sender = %config.sms.sender,
        sms_key_configured = config.sms.has_api_key(),
        notify_timeout_secs = config.sms.timeout.as_secs(),
        "Starting noisewatch-daemon"
    );
    if !config.sms.has_api_key() {
        tracing::warn!("SMS_API_KEY not set, alerts will be recorded but not sent");
    }

    // --- Database ---
    let pool = noisewatch_db::create_pool(&config.database_url, config.db_max_connections)
        .await
        .context("Failed to open database")?;
    noisewatch_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    noisewatch_db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database ready");

    // --- Services ---
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let notifier = Arc::new(SmsDelivery::new(config.sms.clone()).context("Failed to build SMS client")?);
    let services = Services::start(pool.clone(), &config, notifier, Arc::clone(&clock))
        .await
        .context("Failed to start services")?;

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let retention_handle = config.reading_retention.map(|keep| {
        tokio::spawn(retention::run(pool.clone(), Arc::clone(&clock), keep, cancel.clone()))
    });

    // --- Ingestion (returns on EOF or signal) ---
    let stats = ingest::run(BufReader::new(tokio::io::stdin()), &services.distributor, cancel.clone()).await;
    tracing::info!(published = stats.published, "Ingestion finished, shutting down");

    // --- Shutdown ---
    cancel.cancel();
    if let Some(handle) = retention_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }
    services.shutdown(NOTIFY_DRAIN_LIMIT).await;
    pool.close().await;
    tracing::info!("Graceful shutdown complete");

    // A pending stdin read keeps a blocking thread alive past runtime teardown.
    std::process::exit(0);
}

/// Cancel `token` on Ctrl-C or SIGTERM.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    token.cancel();
}
