// Agent binary: seeds due-state and runs the backup scheduler loop

use anyhow::Context;
use common::backup::BackupRunner;
use common::config::Settings;
use common::dump::{DumpProducer, PgDumpProducer};
use common::scheduler::BackupScheduler;
use common::storage::{BackupStore, S3Store};
use common::telemetry;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration before logging is up; anyhow prints load errors
    let settings = Settings::load().context("Failed to load configuration")?;
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    telemetry::init_logging(&settings.telemetry.log_level)?;
    telemetry::init_metrics(settings.telemetry.metrics_port)?;

    info!(
        bucket = %settings.storage.bucket,
        subfolder = %settings.backup.subfolder,
        retention_count = settings.backup.retention_count,
        "Starting pgvault agent"
    );

    // Initialize the object store and verify it is reachable before
    // anything is scheduled
    let store: Arc<dyn BackupStore> = Arc::new(
        S3Store::new(&settings.storage)
            .await
            .context("Failed to initialize object store")?,
    );
    store
        .healthcheck(&settings.backup.subfolder)
        .await
        .context("Object store health check failed")?;
    info!("Object store is reachable");

    // Assemble the backup pipeline
    let dumper: Arc<dyn DumpProducer> =
        Arc::new(PgDumpProducer::new(&settings.database, &settings.backup));
    let runner = BackupRunner::new(store.clone(), dumper, &settings.backup);
    let mut scheduler = BackupScheduler::new(store, runner, settings.backup.subfolder.clone());

    // Seed due-state from archives already in the store
    scheduler.seed().await;

    if settings.agent.single_shot {
        info!("Running in single-shot mode");
        let outcome = scheduler.run_once().await;
        if outcome.failed > 0 {
            anyhow::bail!("{} backup cycle(s) failed", outcome.failed);
        }
        info!(triggered = outcome.triggered, "Single-shot run complete");
        return Ok(());
    }

    if settings.agent.run_on_startup {
        info!("Running startup evaluation pass");
        let outcome = scheduler.run_once().await;
        if outcome.failed > 0 {
            anyhow::bail!("{} startup backup cycle(s) failed", outcome.failed);
        }
    }

    // Set up graceful shutdown on SIGINT/SIGTERM
    let shutdown = scheduler.shutdown_sender();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received termination signal, initiating graceful shutdown");
        let _ = shutdown.send(());
    });

    scheduler.run().await;

    info!("pgvault agent stopped");
    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler, falling back to Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
