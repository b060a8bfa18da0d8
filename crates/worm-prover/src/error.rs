use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProverError {
    /// Transport-level failure (connect, TLS, timeout, body read).
    #[error("HTTP request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Endpoint answered with a status that means "not now" (429, 503, other non-2xx).
    #[error("{endpoint} responded with HTTP {status}")]
    Status { endpoint: String, status: u16 },

    /// Endpoint accepted the request but refused the job.
    #[error("{endpoint} rejected the proof request: {message}")]
    Rejected { endpoint: String, message: String },

    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },

    #[error("Proof job {job_id} failed at {endpoint}: {message}")]
    JobFailed {
        endpoint: String,
        job_id: String,
        message: String,
    },

    #[error("Proof job {job_id} at {endpoint} did not complete within {}s", .timeout.as_secs())]
    JobTimeout {
        endpoint: String,
        job_id: String,
        timeout: Duration,
    },

    /// Every endpoint in the pool failed for one request.
    #[error("All {attempts} prover endpoints failed; last error: {last_error}")]
    Unavailable { attempts: usize, last_error: String },

    #[error("No burn key met the difficulty within {iterations} iterations")]
    BurnKeyExhausted { iterations: u64 },

    #[error("Burn key search task failed: {0}")]
    BurnKeyTask(String),

    #[error("Invalid prover configuration: {0}")]
    InvalidConfig(String),
}

impl ProverError {
    /// True when the failure was a request or job deadline rather than an answer.
    pub fn is_timeout(&self) -> bool {
        match self {
            ProverError::Http { source, .. } => source.is_timeout(),
            ProverError::JobTimeout { .. } => true,
            _ => false,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProverError::Http { source, .. } if source.is_timeout() => "timeout",
            ProverError::Http { .. } => "http",
            ProverError::Status { .. } => "status",
            ProverError::Rejected { .. } => "rejected",
            ProverError::MalformedResponse { .. } => "malformed",
            ProverError::JobFailed { .. } => "job_failed",
            ProverError::JobTimeout { .. } => "job_timeout",
            ProverError::Unavailable { .. } => "unavailable",
            ProverError::BurnKeyExhausted { .. } | ProverError::BurnKeyTask(_) => "burn_key",
            ProverError::InvalidConfig(_) => "config",
        }
    }
}
