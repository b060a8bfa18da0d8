use std::time::Duration;

use tokio::task::JoinHandle;
use worm_blockchain::format_ether_trimmed;
use worm_prover::EndpointStatus;

use crate::farming::{SummaryHandle, read_summary};

pub(super) async fn wait_for_shutdown_task(
    task: &str,
    timeout: Duration,
    handle: &mut JoinHandle<()>,
    abort_on_timeout: bool,
) {
    match tokio::time::timeout(timeout, &mut *handle).await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => tracing::error!(
            task,
            error = ?error,
            "Shutdown task panicked"
        ),
        Err(_) if abort_on_timeout => {
            tracing::warn!(
                task,
                timeout_secs = timeout.as_secs(),
                "Shutdown timeout reached, aborting task"
            );
            handle.abort();
            let _ = handle.await;
        }
        Err(_) => tracing::warn!(
            task,
            timeout_secs = timeout.as_secs(),
            "Shutdown timeout reached"
        ),
    }
}

/// One line per wallet, then the run's totals.
pub(super) fn log_summary(summaries: &[SummaryHandle], elapsed: Duration) {
    let mut totals = (0u64, 0u64, 0u64, 0u64);
    for handle in summaries {
        let summary = read_summary(handle);
        totals.0 += summary.cycles;
        totals.1 += summary.burns;
        totals.2 += summary.participations;
        totals.3 += summary.claims;
        tracing::info!(
            wallet = summary.ordinal,
            address = %summary.label,
            state = summary.state.as_str(),
            cycles = summary.cycles,
            burns = summary.burns,
            participations = summary.participations,
            claims = summary.claims,
            cumulative_burned_eth = %format_ether_trimmed(summary.cumulative_burned),
            consecutive_failures = summary.consecutive_failures,
            last_error = summary.last_error.as_deref().unwrap_or("none"),
            last_cycle_at = ?summary.last_cycle_at,
            "Wallet summary"
        );
    }

    let (cycles, burns, participations, claims) = totals;
    tracing::info!(
        wallets = summaries.len(),
        cycles,
        burns,
        participations,
        claims,
        elapsed_secs = elapsed.as_secs(),
        "Farming summary"
    );
}

/// Health each prover endpoint ended the run with.
pub(super) fn log_prover_summary(endpoints: &[EndpointStatus]) {
    for status in endpoints {
        tracing::info!(
            endpoint = %status.endpoint,
            failure_streak = status.health.failure_streak,
            demoted = status.demoted,
            last_success = ?status.health.last_success,
            last_failure = ?status.health.last_failure,
            "Prover summary"
        );
    }
}
