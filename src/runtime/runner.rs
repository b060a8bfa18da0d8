use std::time::{Duration, Instant};

use tokio::{select, signal::unix::SignalKind};
use tokio_util::sync::CancellationToken;

use super::{
    orchestrator::FarmOrchestrator,
    shutdown::{log_prover_summary, log_summary, wait_for_shutdown_task},
};
use crate::{config::Config, error::FarmError};

/// Slack on top of the per-wallet shutdown claim timeout before farmers are aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Runs every wallet until SIGINT/SIGTERM, or for a single cycle with `once`.
pub(crate) async fn run(config: &Config, once: bool) -> Result<(), FarmError> {
    let started = Instant::now();
    let orchestrator = FarmOrchestrator::build(config).await?;
    let summaries = orchestrator.summaries();
    let prover_pool = orchestrator.prover_pool();

    let shutdown = CancellationToken::new();
    let max_cycles = once.then_some(1);
    let mut farm_task = tokio::task::spawn(orchestrator.run(shutdown.clone(), max_cycles));

    tracing::info!(wallets = summaries.len(), once, "Farming started");

    // Wait for shutdown signal (SIGINT or SIGTERM), or for `--once` to finish
    let ctrl_c = tokio::signal::ctrl_c();
    let mut sigterm_signal = match tokio::signal::unix::signal(SignalKind::terminate()) {
        Ok(signal) => Some(signal),
        Err(error) => {
            tracing::warn!(error = %error, "Failed to install SIGTERM handler; SIGINT only");
            None
        }
    };
    let sigterm = async {
        match sigterm_signal.as_mut() {
            Some(signal) => {
                signal.recv().await;
            }
            None => std::future::pending::<()>().await,
        }
    };

    let finished = select! {
        result = &mut farm_task => {
            if let Err(error) = result {
                tracing::error!(error = ?error, "Farming task panicked");
            }
            true
        }
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, initiating shutdown...");
            false
        }
        _ = sigterm => {
            tracing::info!("Received SIGTERM, initiating shutdown...");
            false
        }
    };

    if !finished {
        tracing::info!("Shutting down gracefully...");
        shutdown.cancel();
        wait_for_shutdown_task(
            "wallet_farmers",
            config.farming.shutdown_timeout + SHUTDOWN_GRACE,
            &mut farm_task,
            true,
        )
        .await;
    }

    log_summary(&summaries, started.elapsed());
    log_prover_summary(&prover_pool.snapshot().await);
    tracing::info!("Shutdown complete");
    Ok(())
}
