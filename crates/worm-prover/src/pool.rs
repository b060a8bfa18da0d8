use std::{sync::Arc, time::Instant};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use worm_observability as observability;

use crate::{
    ProofBackend,
    client::HttpProverClient,
    config::ProverConfig,
    error::ProverError,
    types::{ProofArtifact, ProofRequest},
};

/// Health record of one endpoint, shared by every wallet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointHealth {
    pub failure_streak: u32,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointStatus {
    pub endpoint: String,
    pub health: EndpointHealth,
    pub demoted: bool,
}

/// Routes each proof request through the configured provers in priority order.
///
/// Failover is synchronous: a failing endpoint is followed immediately by the next one
/// within the same call. Endpoints whose failure streak reached the demotion threshold
/// move behind the healthy ones (keeping their relative order) until a success resets
/// the streak. Health updates are serialized by one mutex that is never held across a
/// remote call.
pub struct ProverFailoverPool {
    backends: Vec<Arc<dyn ProofBackend>>,
    health: Mutex<Vec<EndpointHealth>>,
    demote_after_failures: u32,
}

impl ProverFailoverPool {
    pub fn new(backends: Vec<Arc<dyn ProofBackend>>, demote_after_failures: u32) -> Self {
        let health = vec![EndpointHealth::default(); backends.len()];
        Self {
            backends,
            health: Mutex::new(health),
            demote_after_failures: demote_after_failures.max(1),
        }
    }

    /// One [`HttpProverClient`] per configured endpoint.
    pub fn from_config(config: &ProverConfig) -> Result<Self, ProverError> {
        config.validate()?;
        let backends = config
            .normalized_endpoints()
            .iter()
            .map(|endpoint| {
                HttpProverClient::new(endpoint, config)
                    .map(|client| Arc::new(client) as Arc<dyn ProofBackend>)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(backends, config.demote_after_failures))
    }

    /// Request a fresh proof for one (wallet, amount) pair.
    ///
    /// Fails with [`ProverError::Unavailable`] only after every endpoint failed.
    pub async fn request_proof(&self, request: &ProofRequest) -> Result<ProofArtifact, ProverError> {
        let order = self.attempt_order().await;
        let mut last_error: Option<ProverError> = None;

        for index in order {
            let backend = &self.backends[index];
            let endpoint = backend.endpoint();
            let started = Instant::now();

            match backend.generate_proof(request).await {
                Ok(artifact) => {
                    observability::record_prover_attempt(endpoint, "ok", started.elapsed());
                    self.record_success(index).await;
                    return Ok(artifact);
                }
                Err(err) => {
                    observability::record_prover_attempt(endpoint, err.kind(), started.elapsed());
                    let streak = self.record_failure(index).await;
                    tracing::warn!(
                        endpoint,
                        wallet = %request.wallet_address,
                        failure_streak = streak,
                        error = %err,
                        "Prover failed; trying next endpoint"
                    );
                    last_error = Some(err);
                }
            }
        }

        observability::record_prover_unavailable();
        Err(ProverError::Unavailable {
            attempts: self.backends.len(),
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no prover endpoints configured".to_string()),
        })
    }

    /// Probe every endpoint concurrently.
    pub async fn check_health(&self) -> Vec<(String, bool)> {
        let probes = self.backends.iter().map(|backend| async move {
            (backend.endpoint().to_string(), backend.check_health().await)
        });
        futures::future::join_all(probes).await
    }

    /// Current health of every endpoint, in configured order.
    pub async fn snapshot(&self) -> Vec<EndpointStatus> {
        let health = self.health.lock().await;
        self.backends
            .iter()
            .zip(health.iter())
            .map(|(backend, health)| EndpointStatus {
                endpoint: backend.endpoint().to_string(),
                health: health.clone(),
                demoted: health.failure_streak >= self.demote_after_failures,
            })
            .collect()
    }

    async fn attempt_order(&self) -> Vec<usize> {
        let health = self.health.lock().await;
        attempt_order(&health, self.demote_after_failures)
    }

    async fn record_success(&self, index: usize) {
        let mut health = self.health.lock().await;
        if let Some(entry) = health.get_mut(index) {
            if entry.failure_streak >= self.demote_after_failures {
                tracing::info!(
                    endpoint = self.backends[index].endpoint(),
                    "Prover recovered; restoring its priority"
                );
            }
            entry.failure_streak = 0;
            entry.last_success = Some(Utc::now());
            observability::record_prover_failure_streak(self.backends[index].endpoint(), 0);
        }
    }

    async fn record_failure(&self, index: usize) -> u32 {
        let mut health = self.health.lock().await;
        let Some(entry) = health.get_mut(index) else {
            return 0;
        };
        entry.failure_streak = entry.failure_streak.saturating_add(1);
        entry.last_failure = Some(Utc::now());
        if entry.failure_streak == self.demote_after_failures {
            tracing::warn!(
                endpoint = self.backends[index].endpoint(),
                failure_streak = entry.failure_streak,
                "Prover demoted to last priority"
            );
        }
        observability::record_prover_failure_streak(
            self.backends[index].endpoint(),
            entry.failure_streak,
        );
        entry.failure_streak
    }
}

/// Healthy endpoints in configured order, then demoted ones in configured order.
fn attempt_order(health: &[EndpointHealth], demote_after_failures: u32) -> Vec<usize> {
    let (healthy, demoted): (Vec<usize>, Vec<usize>) =
        (0..health.len()).partition(|&i| health[i].failure_streak < demote_after_failures);
    healthy.into_iter().chain(demoted).collect()
}
