//! # Status Reconciler
//!
//! Runs one reconciliation pass and exits. Scheduling is left to cron, a
//! systemd timer or whatever runs the binary.
//!
//! ## Usage
//!
//! ```bash
//! # Run with the configuration in ./config
//! status-reconciler
//!
//! # Production overrides, primary round only
//! status-reconciler --environment production --no-extra-iterations
//!
//! # Inspect the datastore event log
//! status-reconciler --environment production --show-event-log
//! ```

use anyhow::Context;
use clap::Parser;
use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

use status_reconciler::clock::{Clock, SystemClock};
use status_reconciler::config::ConfigManager;
use status_reconciler::database::{connect, PgEventLogger, PgStatusRepository, StatusRepository};
use status_reconciler::logging::{self, EventLogger, TracingEventLogger};
use status_reconciler::provider::HttpDeliveryProvider;
use status_reconciler::reconciliation::{
    ProviderStatusAdapter, ReconciliationEngine, RunController,
};

#[derive(Parser)]
#[command(name = "status-reconciler")]
#[command(about = "Reconcile stored order statuses with delivery providers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration directory path (default: config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Environment overrides to apply (development, test, production)
    #[arg(short, long)]
    environment: Option<String>,

    /// Run the primary round only, even if the configuration allows retries
    #[arg(long)]
    no_extra_iterations: bool,

    /// Print the datastore event log and exit without reconciling
    #[arg(long)]
    show_event_log: bool,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(environment) = &cli.environment {
        env::set_var("RECONCILER_ENV", environment);
    }
    if cli.verbose > 0 && env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", if cli.verbose == 1 { "debug" } else { "trace" });
    }

    logging::init_structured_logging();
    info!("Starting status reconciler v{}", env!("CARGO_PKG_VERSION"));

    let manager = ConfigManager::load_from_directory(cli.config_dir.clone())
        .context("Failed to load configuration")?;
    let config = manager.config();

    let pool = connect(&config.database)
        .await
        .context("Failed to connect to the datastore")?;
    let repository = Arc::new(PgStatusRepository::new(pool.clone(), &config.database)?);

    if cli.show_event_log {
        let entries = repository
            .load_event_log()
            .await
            .context("Failed to read the event log")?;
        for entry in &entries {
            println!("{entry}");
        }
        info!(entries = entries.len(), "Event log printed");
        pool.close().await;
        return Ok(());
    }

    let event_log = config
        .database
        .persist_event_log
        .then(|| PgEventLogger::new(pool.clone(), repository.procedures()));
    let logger: Arc<dyn EventLogger> = match &event_log {
        Some(event_log) => Arc::new(event_log.clone()),
        None => Arc::new(TracingEventLogger),
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let provider = Arc::new(
        HttpDeliveryProvider::new(config.provider.http.clone())
            .context("Failed to create delivery provider client")?,
    );

    check_delivery_services(
        repository.as_ref(),
        &config.provider.http.supported_delivery_services,
    )
    .await;

    let source = ProviderStatusAdapter::new(
        provider,
        Arc::clone(&logger),
        Arc::clone(&clock),
        config.messages.clone(),
    )
    .with_include_delivered(config.provider.include_delivered);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let engine = ReconciliationEngine::new(
        repository,
        Arc::new(source),
        Arc::clone(&logger),
        Arc::clone(&clock),
        config.schedule.clone(),
        config.messages.clone(),
    )?
    .with_shutdown(shutdown_rx);

    let controller = RunController::new(Arc::new(engine), logger, clock, config.messages.clone());

    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown requested, the run stops after the current round");
        let _ = shutdown_tx.send(true);
    });

    let allow_extra_iterations =
        config.schedule.allow_extra_iterations && !cli.no_extra_iterations;
    controller.execute(allow_extra_iterations).await;

    // The last events of a run are still in flight when execute returns.
    if let Some(event_log) = &event_log {
        event_log.flush().await;
    }
    pool.close().await;

    info!("Status reconciler finished");
    Ok(())
}

/// Warn about configured delivery services the datastore does not know
async fn check_delivery_services(repository: &dyn StatusRepository, configured: &[String]) {
    let known: HashSet<String> = match repository.load_delivery_services().await {
        Ok(services) => services
            .into_iter()
            .map(|service| service.delivery_service_id.to_lowercase())
            .collect(),
        Err(e) => {
            warn!(error = %e, "Could not load delivery services for the configuration check");
            return;
        }
    };

    for key in configured {
        if !known.contains(&key.to_lowercase()) {
            warn!(
                delivery_service = %key,
                "Configured delivery service is unknown to the datastore"
            );
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
}
