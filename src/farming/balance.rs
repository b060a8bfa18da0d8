use std::sync::Arc;

use worm_blockchain::{FarmChain, WalletBalances};

use super::error::{CycleStep, StepError};

/// Reads and caches one wallet's balances so every decision within a cycle sees the
/// same numbers. Refreshed at the start of each cycle and after each burn.
pub(crate) struct BalanceTracker {
    chain: Arc<dyn FarmChain>,
    last: Option<WalletBalances>,
}

impl BalanceTracker {
    pub(crate) fn new(chain: Arc<dyn FarmChain>) -> Self {
        Self { chain, last: None }
    }

    pub(crate) async fn refresh(&mut self) -> Result<WalletBalances, StepError> {
        let balances = self
            .chain
            .balances()
            .await
            .map_err(|e| StepError::chain(CycleStep::Balance, e))?;
        self.last = Some(balances);
        Ok(balances)
    }

    /// Last successfully read balances, possibly from an earlier cycle.
    pub(crate) fn last(&self) -> Option<WalletBalances> {
        self.last
    }
}
