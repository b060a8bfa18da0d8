use std::{collections::BTreeSet, sync::Arc};

use worm_blockchain::{
    B256, ChainCall, FarmChain, GasPriceGuard, U256, format_ether_trimmed, wei_to_eth_f64,
};
use worm_observability as observability;

use super::{
    error::{CycleStep, StepError},
    submit::submit_guarded,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClaimResult {
    /// WORM received, measured as the balance delta across the claim.
    pub amount_claimed: U256,
    pub starting_epoch: u64,
    pub num_epochs: u64,
    /// `None` when there was nothing to claim yet.
    pub tx_hash: Option<B256>,
}

/// Counts participations and claims every completed epoch once the interval is reached.
///
/// Once due, a claim is attempted every cycle until it succeeds. The counter saturates
/// at the interval in the meantime and only a successful claim resets it.
pub(crate) struct ClaimScheduler {
    claim_interval: u32,
    participations_since_claim: u32,
    unclaimed_epochs: BTreeSet<u64>,
    gas: Arc<GasPriceGuard>,
}

impl ClaimScheduler {
    pub(crate) fn new(claim_interval: u32, gas: Arc<GasPriceGuard>) -> Self {
        Self {
            claim_interval,
            participations_since_claim: 0,
            unclaimed_epochs: BTreeSet::new(),
            gas,
        }
    }

    pub(crate) fn record_participation(&mut self, epoch: u64) {
        self.unclaimed_epochs.insert(epoch);
        self.participations_since_claim =
            (self.participations_since_claim + 1).min(self.claim_interval);
    }

    pub(crate) fn is_due(&self) -> bool {
        self.participations_since_claim >= self.claim_interval
    }

    pub(crate) fn participations_since_claim(&self) -> u32 {
        self.participations_since_claim
    }

    pub(crate) fn has_unclaimed(&self) -> bool {
        !self.unclaimed_epochs.is_empty()
    }

    /// Claim `[earliest unclaimed, current)`, every epoch that has completed.
    pub(crate) async fn claim_all(
        &mut self,
        chain: &dyn FarmChain,
        wallet: &str,
    ) -> Result<ClaimResult, StepError> {
        let claim_error = |e| StepError::chain(CycleStep::Claim, e);
        let current = chain.epoch_info().await.map_err(claim_error)?.current_epoch;

        let Some(&starting_epoch) = self.unclaimed_epochs.first() else {
            self.reset(current);
            return Ok(ClaimResult {
                amount_claimed: U256::ZERO,
                starting_epoch: current,
                num_epochs: 0,
                tx_hash: None,
            });
        };
        if starting_epoch >= current {
            tracing::info!(epoch = current, "No completed epoch to claim yet");
            self.reset(current);
            return Ok(ClaimResult {
                amount_claimed: U256::ZERO,
                starting_epoch,
                num_epochs: 0,
                tx_hash: None,
            });
        }

        let num_epochs = current - starting_epoch;
        let before = chain.worm_balance().await.map_err(claim_error)?;
        let call = ChainCall::Claim {
            starting_epoch: U256::from(starting_epoch),
            num_epochs: U256::from(num_epochs),
        };
        let outcome = match submit_guarded(chain, &self.gas, wallet, CycleStep::Claim, &call).await
        {
            Ok(outcome) => outcome,
            Err(error) => {
                observability::record_claim(wallet, "failed", 0.0);
                return Err(StepError::new(CycleStep::Claim, error));
            }
        };

        let amount_claimed = match chain.worm_balance().await {
            Ok(after) => after.saturating_sub(before),
            Err(error) => {
                tracing::warn!(error = %error, "Claim confirmed but WORM balance could not be read");
                U256::ZERO
            }
        };
        self.reset(current);

        observability::record_claim(wallet, "success", wei_to_eth_f64(amount_claimed));
        tracing::info!(
            starting_epoch,
            num_epochs,
            amount_worm = %format_ether_trimmed(amount_claimed),
            tx_hash = %outcome.tx_hash,
            "Claimed rewards"
        );
        Ok(ClaimResult {
            amount_claimed,
            starting_epoch,
            num_epochs,
            tx_hash: Some(outcome.tx_hash),
        })
    }

    /// Drops epochs before `current` and restarts the count.
    fn reset(&mut self, current: u64) {
        self.unclaimed_epochs = self.unclaimed_epochs.split_off(&current);
        self.participations_since_claim = 0;
    }
}
