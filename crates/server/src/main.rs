//! eventpoll-rs server entry point.

use std::sync::Arc;

use eventpoll_common::{Config, SystemClock};
use eventpoll_core::{DbPollStore, PollAdminService, SharedPollStore};
use eventpoll_queue::{PollScheduler, SchedulerConfig};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventpoll=debug".into()),
        )
        .init();

    info!("Starting eventpoll-rs...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = eventpoll_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    eventpoll_db::migrate(&db).await?;
    info!("Migrations completed");

    let store: SharedPollStore = Arc::new(DbPollStore::from_connection(Arc::new(db)));
    let clock = Arc::new(SystemClock);

    // Report what is about to open or close
    let admin = PollAdminService::new(store.clone(), clock.clone());
    let window = chrono::Duration::minutes(config.scheduler.upcoming_window_minutes);
    match admin.upcoming_changes(window).await {
        Ok(changes) => {
            for poll in &changes.activating {
                info!(poll_id = poll.id, title = %poll.title, start_date = %poll.start_date, "Poll opens soon");
            }
            for poll in &changes.deactivating {
                info!(poll_id = poll.id, title = %poll.title, end_date = ?poll.end_date, "Poll closes soon");
            }
        }
        Err(e) => tracing::warn!(error = %e, "Failed to list upcoming poll changes"),
    }

    // Start the lifecycle scheduler
    let scheduler = PollScheduler::new(SchedulerConfig::from(&config.scheduler), store, clock);
    if config.scheduler.enabled {
        scheduler.start()?;
    } else {
        info!("Poll scheduler disabled by configuration");
    }

    shutdown_signal().await;

    scheduler.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}
