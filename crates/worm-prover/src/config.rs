use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ProverError;

/// Public provers, in priority order.
pub const DEFAULT_PROVER_ENDPOINTS: [&str; 2] = [
    "https://worm-miner-3.darkube.app",
    "https://worm-testnet.metatarz.xyz",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProverConfig {
    /// Base URLs (without `/proof`), highest priority first.
    pub endpoints: Vec<String>,
    /// Bound on each individual HTTP call.
    pub request_timeout_ms: u64,
    pub poll_interval_secs: u64,
    /// Bound on one job, from submission to completion.
    pub proof_timeout_secs: u64,
    /// Consecutive failures after which an endpoint is tried last.
    pub demote_after_failures: u32,
    /// Leading zero bytes required of the burn-key hash.
    pub pow_zero_bytes: usize,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_PROVER_ENDPOINTS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            request_timeout_ms: 30_000,
            poll_interval_secs: 5,
            proof_timeout_secs: 600,
            demote_after_failures: 3,
            pow_zero_bytes: 2,
        }
    }
}

impl ProverConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn proof_timeout(&self) -> Duration {
        Duration::from_secs(self.proof_timeout_secs)
    }

    /// Trimmed endpoints without trailing slashes, duplicates and blanks removed.
    pub fn normalized_endpoints(&self) -> Vec<String> {
        let mut endpoints: Vec<String> = Vec::with_capacity(self.endpoints.len());
        for endpoint in &self.endpoints {
            let endpoint = endpoint.trim().trim_end_matches('/');
            if !endpoint.is_empty() && !endpoints.iter().any(|e| e == endpoint) {
                endpoints.push(endpoint.to_string());
            }
        }
        endpoints
    }

    pub fn validate(&self) -> Result<(), ProverError> {
        let endpoints = self.normalized_endpoints();
        if endpoints.is_empty() {
            return Err(ProverError::InvalidConfig(
                "prover.endpoints must include at least one endpoint".to_string(),
            ));
        }
        if let Some(bad) = endpoints
            .iter()
            .find(|e| !(e.starts_with("http://") || e.starts_with("https://")))
        {
            return Err(ProverError::InvalidConfig(format!(
                "prover endpoint '{bad}' must start with http:// or https://"
            )));
        }
        if self.request_timeout_ms == 0 || self.poll_interval_secs == 0 {
            return Err(ProverError::InvalidConfig(
                "prover.request_timeout_ms and prover.poll_interval_secs must be greater than 0"
                    .to_string(),
            ));
        }
        if self.proof_timeout_secs < self.poll_interval_secs {
            return Err(ProverError::InvalidConfig(
                "prover.proof_timeout_secs must be at least prover.poll_interval_secs".to_string(),
            ));
        }
        if self.demote_after_failures == 0 {
            return Err(ProverError::InvalidConfig(
                "prover.demote_after_failures must be greater than 0".to_string(),
            ));
        }
        if self.pow_zero_bytes > 8 {
            return Err(ProverError::InvalidConfig(
                "prover.pow_zero_bytes must be at most 8".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn defaults_are_valid() {
        ProverConfig::default().validate().unwrap();
    }

    #[test]
    fn endpoints_are_normalized_in_order() {
        let config = ProverConfig {
            endpoints: vec![
                " https://a.example/ ".to_string(),
                String::new(),
                "https://b.example".to_string(),
                "https://a.example".to_string(),
            ],
            ..ProverConfig::default()
        };
        assert_eq!(
            config.normalized_endpoints(),
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn rejects_empty_and_non_http_endpoints() {
        let empty = ProverConfig {
            endpoints: vec!["  ".to_string()],
            ..ProverConfig::default()
        };
        assert!(empty.validate().is_err());

        let ftp = ProverConfig {
            endpoints: vec!["ftp://prover.example".to_string()],
            ..ProverConfig::default()
        };
        assert!(ftp.validate().is_err());
    }
}
