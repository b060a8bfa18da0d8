use std::num::NonZeroU32;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

/// Per-wallet ceiling on JSON-RPC request rate.
///
/// Wallets usually share one provider account, so five farmers hitting a free-tier
/// endpoint at the same moment is enough to trip its limit. `None` disables throttling.
pub(crate) struct RpcRateLimiter {
    limiter: Option<DefaultDirectRateLimiter>,
}

impl RpcRateLimiter {
    pub(crate) fn new(requests_per_second: Option<u32>) -> Self {
        let limiter = requests_per_second
            .and_then(NonZeroU32::new)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps).allow_burst(rps)));

        Self { limiter }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    pub(crate) async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}
