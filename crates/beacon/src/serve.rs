// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `beacon serve` command implementation.
//!
//! Opens the database, makes sure a coordination step is scheduled and runs
//! the task runner until a shutdown signal arrives. Running handlers are
//! drained before the process exits.

use std::sync::Arc;

use beacon_config::model::BeaconConfig;
use beacon_core::BeaconError;
use beacon_delivery::{DeliveryService, DeliverySettings, EnsureOutcome, TaskRunner};
use beacon_expo::ExpoGateway;
use beacon_storage::Database;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs the `beacon serve` command.
pub async fn run_serve(config: BeaconConfig) -> Result<(), BeaconError> {
    info!("starting beacon serve");

    let db = Database::open_with_config(&config.storage).await?;
    let settings = DeliverySettings::from(&config.delivery);
    let gateway = Arc::new(ExpoGateway::new(&config.gateway)?);

    let service = DeliveryService::new(db.clone(), settings);
    match service.ensure_coordinator().await? {
        EnsureOutcome::AdmissionClosed => warn!(
            "delivery is shutting down; run `beacon restart` once running senders finish"
        ),
        outcome => debug!(?outcome, "coordinator ensured"),
    }

    let cancel = install_signal_handler();
    let runner = TaskRunner::new(db.clone(), gateway, settings, config.runner.clone());
    runner.run(cancel).await?;

    db.close().await?;
    info!("beacon serve stopped");
    Ok(())
}

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => info!("received SIGINT, shutting down"),
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, shutting down");
        }

        token_clone.cancel();
    });

    token
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides `log.level`.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("beacon={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
