use std::time::Duration;

use metrics::{counter, gauge, histogram};

pub fn record_cycle(wallet: &str, outcome: &str, duration: Duration) {
    counter!(
        "worm_farm_cycles_total",
        "wallet" => wallet.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!(
        "worm_farm_cycle_duration_seconds",
        "wallet" => wallet.to_string(),
        "outcome" => outcome.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_burn(wallet: &str, status: &str, amount_eth: f64) {
    counter!(
        "worm_farm_burns_total",
        "wallet" => wallet.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    if status == "success" {
        counter!(
            "worm_farm_burned_gwei_total",
            "wallet" => wallet.to_string()
        )
        .increment((amount_eth * 1e9) as u64);
    }
}

pub fn record_participation(wallet: &str, status: &str, epoch: Option<u64>) {
    counter!(
        "worm_farm_participations_total",
        "wallet" => wallet.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    if let Some(epoch) = epoch {
        gauge!(
            "worm_farm_last_participated_epoch",
            "wallet" => wallet.to_string()
        )
        .set(epoch as f64);
    }
}

pub fn record_claim(wallet: &str, status: &str, amount_worm: f64) {
    counter!(
        "worm_farm_claims_total",
        "wallet" => wallet.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    if status == "success" {
        histogram!(
            "worm_farm_claimed_worm",
            "wallet" => wallet.to_string()
        )
        .record(amount_worm);
    }
}

pub fn record_wallet_snapshot(
    wallet: &str,
    eth: f64,
    beth: f64,
    worm: f64,
    cumulative_burned: f64,
    consecutive_failures: u32,
) {
    gauge!("worm_wallet_eth_balance", "wallet" => wallet.to_string()).set(eth);
    gauge!("worm_wallet_beth_balance", "wallet" => wallet.to_string()).set(beth);
    gauge!("worm_wallet_worm_balance", "wallet" => wallet.to_string()).set(worm);
    gauge!("worm_wallet_cumulative_burned_eth", "wallet" => wallet.to_string())
        .set(cumulative_burned);
    gauge!("worm_wallet_consecutive_failures", "wallet" => wallet.to_string())
        .set(consecutive_failures as f64);
}
