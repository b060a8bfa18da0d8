//! Typed defaults, the lowest configuration layer.

use worm_blockchain::{
    ChainConfig, GasPolicy, SEPOLIA_BETH_ADDRESS, SEPOLIA_WORM_ADDRESS, U256,
};
use worm_prover::ProverConfig;

use super::{
    EtherAmount,
    raw::{ConfigRaw, FarmingConfigRaw},
};
use crate::logger::{LogFormat, LoggerConfig, TelemetryConfig, TelemetryMetricsConfig};

/// 0.001 ETH in wei.
const MILLI_ETHER: u64 = 1_000_000_000_000_000;

pub(crate) fn config() -> ConfigRaw {
    ConfigRaw {
        chain: chain(),
        prover: ProverConfig::default(),
        farming: farming(),
        wallets: Vec::new(),
        logger: logger(),
        telemetry: telemetry(),
    }
}

fn chain() -> ChainConfig {
    ChainConfig {
        network: "sepolia".to_string(),
        rpc_endpoints: Vec::new(),
        beth_contract_address: SEPOLIA_BETH_ADDRESS,
        worm_contract_address: SEPOLIA_WORM_ADDRESS,
        max_rpc_requests_per_second: None,
        rpc_timeout_ms: 30_000,
        tx_confirmations: 1,
        tx_receipt_timeout_ms: 120_000,
        gas: GasPolicy::default(),
    }
}

fn farming() -> FarmingConfigRaw {
    FarmingConfigRaw {
        total_eth_budget: milli_ether(50),
        beth_per_epoch: milli_ether(1),
        claim_interval: 5,
        burn_fee: EtherAmount(U256::ZERO),
        loop_interval_secs: 600,
        max_consecutive_failures: 3,
        min_gas_reserve: milli_ether(10),
        approval_epochs: 10,
        claim_on_shutdown: true,
        shutdown_timeout_secs: 60,
    }
}

fn logger() -> LoggerConfig {
    LoggerConfig {
        level: "info".to_string(),
        format: LogFormat::Pretty,
    }
}

fn telemetry() -> TelemetryConfig {
    TelemetryConfig {
        metrics: TelemetryMetricsConfig {
            enabled: false,
            bind_address: "127.0.0.1:9464".to_string(),
        },
    }
}

fn milli_ether(value: u64) -> EtherAmount {
    EtherAmount(U256::from(value) * U256::from(MILLI_ETHER))
}
