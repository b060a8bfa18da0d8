use std::time::Duration;

use metrics::{counter, gauge, histogram};

pub fn record_prover_attempt(endpoint: &str, status: &str, duration: Duration) {
    counter!(
        "worm_prover_attempts_total",
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "worm_prover_attempt_duration_seconds",
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_prover_failure_streak(endpoint: &str, streak: u32) {
    gauge!(
        "worm_prover_failure_streak",
        "endpoint" => endpoint.to_string()
    )
    .set(streak as f64);
}

pub fn record_prover_unavailable() {
    counter!("worm_prover_unavailable_total").increment(1);
}
