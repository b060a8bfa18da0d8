use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::time::Instant;

use crate::{
    ProofBackend,
    config::ProverConfig,
    error::ProverError,
    types::{ProofArtifact, ProofRequest},
};

/// Interval between "still waiting" log lines while a job is pending.
const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(30);

/// Status codes the health probe treats as "service is up" for an empty body.
const HEALTHY_PROBE_STATUSES: [u16; 4] = [200, 400, 405, 422];

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    status: Option<String>,
    message: Option<String>,
    result: Option<SubmitResult>,
}

#[derive(Debug, Deserialize)]
struct SubmitResult {
    job_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    status: Option<String>,
    message: Option<String>,
    result: Option<serde_json::Value>,
}

#[derive(Debug)]
pub(crate) enum JobState {
    Pending,
    Completed(Box<ProofArtifact>),
}

/// Client for one remote prover: submit a job, then poll it until it completes.
///
/// Holds no state besides its HTTP connection pool; health is tracked by the pool.
pub struct HttpProverClient {
    endpoint: String,
    client: Client,
    request_timeout: Duration,
    poll_interval: Duration,
    proof_timeout: Duration,
}

impl HttpProverClient {
    pub fn new(endpoint: &str, config: &ProverConfig) -> Result<Self, ProverError> {
        let endpoint = endpoint.trim().trim_end_matches('/').to_string();
        let client = Client::builder()
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.request_timeout())
            .build()
            .map_err(|source| ProverError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;

        Ok(Self {
            endpoint,
            client,
            request_timeout: config.request_timeout(),
            poll_interval: config.poll_interval(),
            proof_timeout: config.proof_timeout(),
        })
    }

    fn http_error(&self, source: reqwest::Error) -> ProverError {
        ProverError::Http {
            endpoint: self.endpoint.clone(),
            source,
        }
    }

    async fn submit(&self, request: &ProofRequest) -> Result<String, ProverError> {
        let url = format!("{}/proof", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&request.body())
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.http_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.http_error(e))?;
        let job_id = parse_submit_response(&self.endpoint, status, &body)?;
        tracing::info!(
            endpoint = %self.endpoint,
            job_id = %job_id,
            wallet = %request.wallet_address,
            "Proof job submitted"
        );
        Ok(job_id)
    }

    async fn poll(&self, job_id: &str) -> Result<JobState, ProverError> {
        let url = format!("{}/proof/{job_id}", self.endpoint);
        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.http_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.http_error(e))?;
        parse_job_status(&self.endpoint, job_id, status, &body)
    }

    async fn await_job(&self, job_id: &str) -> Result<ProofArtifact, ProverError> {
        let started = Instant::now();
        let deadline = started + self.proof_timeout;
        let mut next_progress_log = started + PROGRESS_LOG_INTERVAL;

        loop {
            if let JobState::Completed(artifact) = self.poll(job_id).await? {
                tracing::info!(
                    endpoint = %self.endpoint,
                    job_id,
                    elapsed_secs = started.elapsed().as_secs(),
                    burn_address = %artifact.burn_address,
                    "Proof generated"
                );
                return Ok(*artifact);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(ProverError::JobTimeout {
                    endpoint: self.endpoint.clone(),
                    job_id: job_id.to_string(),
                    timeout: self.proof_timeout,
                });
            }
            if now >= next_progress_log {
                tracing::info!(
                    endpoint = %self.endpoint,
                    job_id,
                    elapsed_secs = started.elapsed().as_secs(),
                    "Waiting for proof"
                );
                next_progress_log = now + PROGRESS_LOG_INTERVAL;
            }

            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}

#[async_trait]
impl ProofBackend for HttpProverClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn generate_proof(&self, request: &ProofRequest) -> Result<ProofArtifact, ProverError> {
        let job_id = self.submit(request).await?;
        self.await_job(&job_id).await
    }

    async fn check_health(&self) -> bool {
        let url = format!("{}/proof", self.endpoint);
        match self
            .client
            .post(&url)
            .json(&serde_json::json!({}))
            .timeout(self.request_timeout.min(Duration::from_secs(5)))
            .send()
            .await
        {
            Ok(response) => HEALTHY_PROBE_STATUSES.contains(&response.status().as_u16()),
            Err(e) => {
                tracing::debug!(endpoint = %self.endpoint, error = %e, "Prover health probe failed");
                false
            }
        }
    }
}

pub(crate) fn parse_submit_response(
    endpoint: &str,
    status: StatusCode,
    body: &str,
) -> Result<String, ProverError> {
    if !status.is_success() {
        return Err(ProverError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        });
    }

    let response: SubmitResponse =
        serde_json::from_str(body).map_err(|e| ProverError::MalformedResponse {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

    if response.status.as_deref() == Some("error") {
        return Err(ProverError::Rejected {
            endpoint: endpoint.to_string(),
            message: response
                .message
                .unwrap_or_else(|| "no message".to_string()),
        });
    }

    response
        .result
        .and_then(|result| result.job_id)
        .filter(|job_id| !job_id.is_empty())
        .ok_or_else(|| ProverError::MalformedResponse {
            endpoint: endpoint.to_string(),
            reason: "response carries no result.job_id".to_string(),
        })
}

pub(crate) fn parse_job_status(
    endpoint: &str,
    job_id: &str,
    status: StatusCode,
    body: &str,
) -> Result<JobState, ProverError> {
    if !status.is_success() {
        return Err(ProverError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        });
    }

    let malformed = |reason: String| ProverError::MalformedResponse {
        endpoint: endpoint.to_string(),
        reason,
    };

    let response: JobStatusResponse =
        serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;

    match response.status.as_deref() {
        Some("pending") | Some("in_progress") => Ok(JobState::Pending),
        Some("error") => Err(ProverError::JobFailed {
            endpoint: endpoint.to_string(),
            job_id: job_id.to_string(),
            message: response
                .message
                .unwrap_or_else(|| "no message".to_string()),
        }),
        Some("completed") => {
            let result = response
                .result
                .ok_or_else(|| malformed("completed job carries no result".to_string()))?;
            let artifact: ProofArtifact =
                serde_json::from_value(result).map_err(|e| malformed(e.to_string()))?;
            if !artifact.proof.is_complete() {
                return Err(malformed("proof is missing coordinates".to_string()));
            }
            Ok(JobState::Completed(Box::new(artifact)))
        }
        other => {
            tracing::warn!(endpoint, job_id, status = ?other, "Unknown proof job status");
            Ok(JobState::Pending)
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    const ENDPOINT: &str = "https://prover.example";

    fn completed_body() -> String {
        serde_json::json!({
            "status": "completed",
            "result": {
                "burn_address": "0x1111111111111111111111111111111111111111",
                "proof": {
                    "pi_a": ["1", "2", "1"],
                    "pi_b": [["3", "4"], ["5", "6"], ["1", "0"]],
                    "pi_c": ["7", "8", "1"]
                },
                "block_number": 123,
                "nullifier_u256": "9",
                "remaining_coin": "0",
                "broadcaster_fee": "0",
                "prover_fee": "0",
                "prover": "0x2222222222222222222222222222222222222222",
                "reveal_amount": "1000",
                "wallet_address": "0x3333333333333333333333333333333333333333"
            }
        })
        .to_string()
    }

    #[test]
    fn submit_returns_job_id() {
        let body = r#"{"status":"ok","result":{"job_id":"abc-123"}}"#;
        let job_id = parse_submit_response(ENDPOINT, StatusCode::OK, body).unwrap();
        assert_eq!(job_id, "abc-123");
    }

    #[test]
    fn busy_statuses_fail_the_endpoint() {
        for status in [StatusCode::TOO_MANY_REQUESTS, StatusCode::SERVICE_UNAVAILABLE] {
            let err = parse_submit_response(ENDPOINT, status, "").unwrap_err();
            assert!(matches!(err, ProverError::Status { status: s, .. } if s == status.as_u16()));
        }
    }

    #[test]
    fn error_status_in_body_is_a_rejection() {
        let body = r#"{"status":"error","message":"queue full"}"#;
        let err = parse_submit_response(ENDPOINT, StatusCode::OK, body).unwrap_err();
        assert!(matches!(err, ProverError::Rejected { ref message, .. } if message == "queue full"));
    }

    #[test]
    fn missing_job_id_is_malformed() {
        for body in [r#"{"status":"ok"}"#, r#"{"result":{}}"#, "not json"] {
            let err = parse_submit_response(ENDPOINT, StatusCode::OK, body).unwrap_err();
            assert!(matches!(err, ProverError::MalformedResponse { .. }));
        }
    }

    #[test]
    fn pending_and_in_progress_keep_polling() {
        for body in [r#"{"status":"pending"}"#, r#"{"status":"in_progress"}"#] {
            let state = parse_job_status(ENDPOINT, "job", StatusCode::OK, body).unwrap();
            assert!(matches!(state, JobState::Pending));
        }
    }

    #[test]
    fn failed_job_reports_message() {
        let body = r#"{"status":"error","message":"witness generation failed"}"#;
        let err = parse_job_status(ENDPOINT, "job", StatusCode::OK, body).unwrap_err();
        assert!(matches!(err, ProverError::JobFailed { ref message, .. } if message == "witness generation failed"));
    }

    #[test]
    fn completed_job_yields_artifact() {
        let state = parse_job_status(ENDPOINT, "job", StatusCode::OK, &completed_body()).unwrap();
        let JobState::Completed(artifact) = state else {
            panic!("expected a completed job");
        };
        assert_eq!(artifact.reveal_amount, alloy::primitives::U256::from(1000u64));
    }

    #[test]
    fn completed_without_result_is_malformed() {
        let body = r#"{"status":"completed"}"#;
        let err = parse_job_status(ENDPOINT, "job", StatusCode::OK, body).unwrap_err();
        assert!(matches!(err, ProverError::MalformedResponse { .. }));
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client =
            HttpProverClient::new("https://prover.example/ ", &ProverConfig::default()).unwrap();
        assert_eq!(client.endpoint(), "https://prover.example");
    }
}
