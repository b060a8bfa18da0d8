//! Remote proof generation for burns: the prover HTTP protocol, failover across
//! endpoints and the client-side burn-key search.

mod burn_key;
mod client;
mod config;
mod error;
mod pool;
mod types;

use async_trait::async_trait;

pub use burn_key::{
    BN254_PRIME, MAX_ITERATIONS, burn_extra_commitment, generate_burn_key, meets_difficulty,
};
pub use client::HttpProverClient;
pub use config::{DEFAULT_PROVER_ENDPOINTS, ProverConfig};
pub use error::ProverError;
pub use pool::{EndpointHealth, EndpointStatus, ProverFailoverPool};
pub use types::{FieldElement, Groth16Proof, ProofArtifact, ProofRequest};

/// One proof-generation endpoint.
#[async_trait]
pub trait ProofBackend: Send + Sync {
    fn endpoint(&self) -> &str;

    /// Submit the job and wait for its artifact, bounded by the backend's own timeouts.
    async fn generate_proof(&self, request: &ProofRequest) -> Result<ProofArtifact, ProverError>;

    /// Cheap reachability probe; never submits a job.
    async fn check_health(&self) -> bool;
}
