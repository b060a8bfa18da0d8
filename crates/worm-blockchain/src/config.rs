use std::time::Duration;

use alloy::primitives::{Address, address};
use serde::{Deserialize, Serialize};

use crate::gas::GasPolicy;

/// BETH token on Sepolia.
pub const SEPOLIA_BETH_ADDRESS: Address = address!("716bC7e331c9Da551e5Eb6A099c300db4c08E994");
/// WORM mining contract on Sepolia.
pub const SEPOLIA_WORM_ADDRESS: Address = address!("cBdF9890B5935F01B2f21583d1885CdC8389eb5F");

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid chain configuration: {0}")]
    InvalidConfig(String),
}

/// Chain connection settings shared by every wallet.
///
/// Wallets may override `rpc_endpoints`; everything else applies to all of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    /// Network name passed to provers (e.g. "sepolia").
    pub network: String,
    /// JSON-RPC endpoints (HTTP or WebSocket), tried with automatic failover.
    pub rpc_endpoints: Vec<String>,
    pub beth_contract_address: Address,
    pub worm_contract_address: Address,
    /// Optional per-wallet RPC rate limit.
    pub max_rpc_requests_per_second: Option<u32>,
    /// Bound on every individual read call, in milliseconds.
    pub rpc_timeout_ms: u64,
    /// Confirmations to wait for before a receipt counts.
    pub tx_confirmations: u64,
    /// Bound on waiting for a receipt, in milliseconds.
    pub tx_receipt_timeout_ms: u64,
    pub gas: GasPolicy,
}

impl ChainConfig {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn tx_receipt_timeout(&self) -> Duration {
        Duration::from_millis(self.tx_receipt_timeout_ms)
    }

    pub fn ensure_rpc_endpoints(&self) -> Result<(), ConfigError> {
        if self.rpc_endpoints.iter().all(|e| e.trim().is_empty()) {
            return Err(ConfigError::InvalidConfig(
                "chain.rpc_endpoints must include at least one endpoint (or set RPC_URL)"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn ensure_timeouts(&self) -> Result<(), ConfigError> {
        if self.rpc_timeout_ms == 0 || self.tx_receipt_timeout_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "chain.rpc_timeout_ms and chain.tx_receipt_timeout_ms must be greater than 0"
                    .to_string(),
            ));
        }
        if self.max_rpc_requests_per_second == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "chain.max_rpc_requests_per_second must be greater than 0 when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ensure_gas_policy(&self) -> Result<(), ConfigError> {
        if self.gas.max_fee_per_gas_gwei == 0 || self.gas.max_gas_limit == 0 {
            return Err(ConfigError::InvalidConfig(
                "chain.gas.max_fee_per_gas_gwei and chain.gas.max_gas_limit must be greater than 0"
                    .to_string(),
            ));
        }
        if self.gas.base_fee_headroom_percent < 100 {
            return Err(ConfigError::InvalidConfig(
                "chain.gas.base_fee_headroom_percent must be at least 100".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ensure_rpc_endpoints()?;
        self.ensure_timeouts()?;
        self.ensure_gas_policy()
    }
}
