use std::time::Duration;

use metrics::{counter, histogram};

pub fn record_blockchain_rpc_call(wallet: &str, operation: &str, status: &str, duration: Duration) {
    counter!(
        "worm_blockchain_rpc_total",
        "wallet" => wallet.to_string(),
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "worm_blockchain_rpc_duration_seconds",
        "wallet" => wallet.to_string(),
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_blockchain_rpc_retry(wallet: &str, operation: &str) {
    counter!(
        "worm_blockchain_rpc_retries_total",
        "wallet" => wallet.to_string(),
        "operation" => operation.to_string()
    )
    .increment(1);
}

pub fn record_blockchain_tx(wallet: &str, operation: &str, status: &str, duration: Duration) {
    counter!(
        "worm_blockchain_tx_total",
        "wallet" => wallet.to_string(),
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "worm_blockchain_tx_duration_seconds",
        "wallet" => wallet.to_string(),
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_gas_admission(wallet: &str, operation: &str, decision: &str, max_fee_gwei: f64) {
    counter!(
        "worm_gas_admission_total",
        "wallet" => wallet.to_string(),
        "operation" => operation.to_string(),
        "decision" => decision.to_string()
    )
    .increment(1);
    histogram!(
        "worm_gas_max_fee_gwei",
        "operation" => operation.to_string()
    )
    .record(max_fee_gwei);
}
