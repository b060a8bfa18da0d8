use std::sync::Arc;

use worm_blockchain::{B256, ChainCall, FarmChain, GasPriceGuard, U256, format_ether_trimmed};
use worm_observability as observability;

use super::{
    error::{CycleStep, StepError},
    submit::submit_guarded,
};

/// One confirmed single-epoch commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EpochCommitment {
    pub epoch: u64,
    pub amount: U256,
    pub tx_hash: B256,
}

/// Commits BETH to the current epoch, one epoch at a time.
pub(crate) struct EpochParticipationEngine {
    gas: Arc<GasPriceGuard>,
    /// Allowance granted when the current one runs short, so approvals stay rare.
    approval_amount: U256,
}

impl EpochParticipationEngine {
    pub(crate) fn new(gas: Arc<GasPriceGuard>, approval_amount: U256) -> Self {
        Self {
            gas,
            approval_amount,
        }
    }

    pub(crate) async fn participate_one_epoch(
        &self,
        chain: &dyn FarmChain,
        wallet: &str,
        amount: U256,
    ) -> Result<EpochCommitment, StepError> {
        let epoch = chain
            .epoch_info()
            .await
            .map_err(|e| StepError::chain(CycleStep::Participate, e))?;

        self.ensure_allowance(chain, wallet, amount).await?;

        let call = ChainCall::Participate {
            amount_per_epoch: amount,
            num_epochs: U256::from(1u64),
        };
        let outcome = submit_guarded(chain, &self.gas, wallet, CycleStep::Participate, &call)
            .await
            .map_err(|e| {
                observability::record_participation(wallet, "failed", Some(epoch.current_epoch));
                StepError::new(CycleStep::Participate, e)
            })?;

        observability::record_participation(wallet, "success", Some(epoch.current_epoch));
        tracing::info!(
            epoch = epoch.current_epoch,
            amount_beth = %format_ether_trimmed(amount),
            epoch_remaining_secs = epoch.remaining_secs,
            "Participated in epoch"
        );
        Ok(EpochCommitment {
            epoch: epoch.current_epoch,
            amount,
            tx_hash: outcome.tx_hash,
        })
    }

    async fn ensure_allowance(
        &self,
        chain: &dyn FarmChain,
        wallet: &str,
        amount: U256,
    ) -> Result<(), StepError> {
        let allowance = chain
            .beth_allowance()
            .await
            .map_err(|e| StepError::chain(CycleStep::Approve, e))?;
        if allowance >= amount {
            return Ok(());
        }

        let approve = self.approval_amount.max(amount);
        tracing::info!(
            allowance_beth = %format_ether_trimmed(allowance),
            approve_beth = %format_ether_trimmed(approve),
            "Approving BETH for participation"
        );
        submit_guarded(
            chain,
            &self.gas,
            wallet,
            CycleStep::Approve,
            &ChainCall::ApproveBeth { amount: approve },
        )
        .await
        .map_err(|e| StepError::new(CycleStep::Approve, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use worm_blockchain::WalletBalances;

    use super::*;
    use crate::farming::{
        error::CycleError,
        testing::{FakeChain, FakeFailure, gas_guard, milli_eth},
    };

    fn chain_with_beth(beth: U256) -> Arc<FakeChain> {
        FakeChain::new(WalletBalances {
            eth: milli_eth(100),
            beth,
            worm: U256::ZERO,
        })
    }

    fn engine() -> EpochParticipationEngine {
        EpochParticipationEngine::new(gas_guard(), milli_eth(10))
    }

    #[tokio::test]
    async fn commits_exactly_one_epoch() {
        let chain = chain_with_beth(milli_eth(3));

        let commitment = engine()
            .participate_one_epoch(chain.as_ref(), "w", milli_eth(1))
            .await
            .unwrap();

        assert_eq!(commitment.epoch, 10);
        assert_eq!(commitment.amount, milli_eth(1));
        assert_eq!(chain.submitted_operations(), vec!["participate"]);
        assert_eq!(
            chain.with(|s| s.submitted[0].clone()),
            ChainCall::Participate {
                amount_per_epoch: milli_eth(1),
                num_epochs: U256::from(1u64)
            }
        );
        assert_eq!(chain.balances_now().beth, milli_eth(2));
    }

    #[tokio::test]
    async fn approves_when_allowance_is_short() {
        let chain = chain_with_beth(milli_eth(1));
        chain.with(|s| s.allowance = U256::ZERO);

        engine()
            .participate_one_epoch(chain.as_ref(), "w", milli_eth(1))
            .await
            .unwrap();

        assert_eq!(chain.submitted_operations(), vec!["approve_beth", "participate"]);
        assert_eq!(
            chain.with(|s| s.submitted[0].clone()),
            ChainCall::ApproveBeth {
                amount: milli_eth(10)
            }
        );
        assert_eq!(chain.with(|s| s.allowance), milli_eth(9));
    }

    #[tokio::test]
    async fn revert_is_reported_as_epoch_revert() {
        let chain = chain_with_beth(milli_eth(1));
        chain.fail_next("participate", FakeFailure::Revert);

        let err = engine()
            .participate_one_epoch(chain.as_ref(), "w", milli_eth(1))
            .await
            .unwrap_err();

        assert_eq!(err.step, CycleStep::Participate);
        assert!(matches!(err.error, CycleError::EpochReverted(_)));
        assert_eq!(chain.balances_now().beth, milli_eth(1));
    }

    #[tokio::test]
    async fn failed_approval_skips_participation() {
        let chain = chain_with_beth(milli_eth(1));
        chain.with(|s| s.allowance = U256::ZERO);
        chain.fail_next("approve_beth", FakeFailure::Timeout);

        let err = engine()
            .participate_one_epoch(chain.as_ref(), "w", milli_eth(1))
            .await
            .unwrap_err();

        assert_eq!(err.step, CycleStep::Approve);
        assert!(chain.submitted_operations().is_empty());
    }
}
