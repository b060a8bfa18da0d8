//! Burn decisioning and the burn flow: proof of work, proof, transfer, mint.

use std::sync::Arc;

use worm_blockchain::{
    B256, Bytes, ChainCall, FarmChain, GasPriceGuard, MintCoinArgs, U256, format_ether_trimmed,
    wei_to_eth_f64,
};
use worm_observability as observability;
use worm_prover::{ProofArtifact, ProofRequest, ProverError, ProverFailoverPool, generate_burn_key};

use super::{
    error::{CycleError, CycleStep, StepError},
    submit::submit_guarded,
};

/// A mint that reverted this many times is dropped; its nullifier is most likely spent.
const MAX_MINT_REVERTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SkipReason {
    /// Already holding at least one epoch's BETH.
    SufficientBeth,
    /// The lifetime budget is spent. Participation may continue on existing BETH.
    BudgetExhausted,
    /// What is left of the budget would not cover the burn fee.
    BelowBurnFee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BurnDecision {
    Skip(SkipReason),
    Burn { amount: U256 },
}

/// Decides whether, and how much, base asset to burn this cycle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BurnDecisionEngine {
    beth_per_epoch: U256,
    burn_fee: U256,
}

impl BurnDecisionEngine {
    pub(crate) fn new(beth_per_epoch: U256, burn_fee: U256) -> Self {
        Self {
            beth_per_epoch,
            burn_fee,
        }
    }

    /// Top up to exactly one epoch's BETH, never past the remaining budget.
    ///
    /// A non-zero burn fee is added to the target so the minted spend still covers
    /// the epoch.
    pub(crate) fn decide(&self, current_beth: U256, budget_remaining: U256) -> BurnDecision {
        if current_beth >= self.beth_per_epoch {
            return BurnDecision::Skip(SkipReason::SufficientBeth);
        }
        if budget_remaining.is_zero() {
            return BurnDecision::Skip(SkipReason::BudgetExhausted);
        }

        let target = self.beth_per_epoch - current_beth + self.burn_fee;
        let amount = target.min(budget_remaining);
        if amount <= self.burn_fee {
            return BurnDecision::Skip(SkipReason::BelowBurnFee);
        }
        BurnDecision::Burn { amount }
    }

    /// BETH minted for a burn of `amount`.
    pub(crate) fn spend(&self, amount: U256) -> U256 {
        amount.saturating_sub(self.burn_fee)
    }
}

/// Proof artifact whose transfer confirmed but whose mint has not.
#[derive(Debug, Clone)]
pub(crate) struct PendingMint {
    pub artifact: ProofArtifact,
    pub amount: U256,
    pub transfer_tx: B256,
    pub reverts: u32,
}

/// Per-wallet burn bookkeeping. Memory only.
#[derive(Debug, Default)]
pub(crate) struct BurnLedger {
    pub cumulative_burned: U256,
    pub pending_mint: Option<PendingMint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BurnReceipt {
    pub amount: U256,
    pub spend: U256,
    pub transfer_tx: B256,
    pub mint_tx: B256,
}

pub(crate) struct BurnExecutor {
    pool: Arc<ProverFailoverPool>,
    gas: Arc<GasPriceGuard>,
    network: String,
    pow_zero_bytes: usize,
}

impl BurnExecutor {
    pub(crate) fn new(
        pool: Arc<ProverFailoverPool>,
        gas: Arc<GasPriceGuard>,
        network: String,
        pow_zero_bytes: usize,
    ) -> Self {
        Self {
            pool,
            gas,
            network,
            pow_zero_bytes,
        }
    }

    /// Full burn of `amount` wei minting `spend` BETH.
    ///
    /// `ledger.cumulative_burned` grows as soon as the transfer confirms. If the mint
    /// then fails, the artifact stays in `ledger.pending_mint` for [`Self::mint_pending`].
    pub(crate) async fn burn(
        &self,
        chain: &dyn FarmChain,
        wallet: &str,
        ledger: &mut BurnLedger,
        amount: U256,
        spend: U256,
    ) -> Result<BurnReceipt, StepError> {
        let burn_error = |error: CycleError| StepError::new(CycleStep::Burn, error);
        let address = chain.address();

        tracing::info!(
            amount_eth = %format_ether_trimmed(amount),
            spend_eth = %format_ether_trimmed(spend),
            "Generating burn key"
        );
        let burn_key = generate_burn_key(address, spend, self.pow_zero_bytes)
            .await
            .map_err(|e| burn_error(CycleError::from_prover(e)))?;

        let request = ProofRequest {
            network: self.network.clone(),
            wallet_address: address,
            amount,
            spend,
            burn_key,
        };
        let artifact = self
            .pool
            .request_proof(&request)
            .await
            .map_err(|e| burn_error(CycleError::from_prover(e)))?;

        if artifact.wallet_address != address || artifact.reveal_amount != spend {
            return Err(burn_error(CycleError::Prover(
                ProverError::MalformedResponse {
                    endpoint: "prover pool".to_string(),
                    reason: format!(
                        "artifact is for {} revealing {} wei, expected {address} revealing {spend} wei",
                        artifact.wallet_address, artifact.reveal_amount
                    ),
                },
            )));
        }

        let transfer = ChainCall::BurnTransfer {
            burn_address: artifact.burn_address,
            amount,
        };
        let outcome = submit_guarded(chain, &self.gas, wallet, CycleStep::Burn, &transfer)
            .await
            .map_err(burn_error)?;

        ledger.cumulative_burned += amount;
        observability::record_burn(wallet, "success", wei_to_eth_f64(amount));
        tracing::info!(
            burn_address = %artifact.burn_address,
            amount_eth = %format_ether_trimmed(amount),
            cumulative_burned_eth = %format_ether_trimmed(ledger.cumulative_burned),
            "Burn transfer confirmed"
        );

        ledger.pending_mint = Some(PendingMint {
            artifact,
            amount,
            transfer_tx: outcome.tx_hash,
            reverts: 0,
        });
        let mint_tx = self.mint_pending(chain, wallet, ledger).await?;

        Ok(BurnReceipt {
            amount,
            spend,
            transfer_tx: outcome.tx_hash,
            mint_tx,
        })
    }

    /// Submit `mintCoin` for the pending artifact, clearing it on success.
    ///
    /// Returns the mint transaction hash; does nothing useful when nothing is pending.
    pub(crate) async fn mint_pending(
        &self,
        chain: &dyn FarmChain,
        wallet: &str,
        ledger: &mut BurnLedger,
    ) -> Result<B256, StepError> {
        let mint_error = |error: CycleError| StepError::new(CycleStep::Mint, error);
        let Some(pending) = ledger.pending_mint.as_mut() else {
            return Ok(B256::ZERO);
        };

        let args = mint_args(&pending.artifact).map_err(mint_error)?;
        let call = ChainCall::MintCoin(Box::new(args));
        match submit_guarded(chain, &self.gas, wallet, CycleStep::Mint, &call).await {
            Ok(outcome) => {
                tracing::info!(
                    transfer_tx = %pending.transfer_tx,
                    mint_tx = %outcome.tx_hash,
                    minted_eth = %format_ether_trimmed(pending.artifact.reveal_amount),
                    "BETH minted"
                );
                ledger.pending_mint = None;
                Ok(outcome.tx_hash)
            }
            Err(error) => {
                observability::record_burn(wallet, "mint_failed", wei_to_eth_f64(pending.amount));
                if matches!(error, CycleError::TransactionReverted(_)) {
                    pending.reverts += 1;
                    if pending.reverts >= MAX_MINT_REVERTS {
                        tracing::error!(
                            transfer_tx = %pending.transfer_tx,
                            reverts = pending.reverts,
                            "Dropping pending mint after repeated reverts"
                        );
                        ledger.pending_mint = None;
                    }
                } else {
                    tracing::warn!(
                        transfer_tx = %pending.transfer_tx,
                        "Mint kept for retry next cycle"
                    );
                }
                Err(mint_error(error))
            }
        }
    }
}

/// `mintCoin` arguments for `artifact`, with `pi_b` in verifier order.
pub(crate) fn mint_args(artifact: &ProofArtifact) -> Result<MintCoinArgs, CycleError> {
    let incomplete = || {
        CycleError::Prover(ProverError::MalformedResponse {
            endpoint: "prover pool".to_string(),
            reason: "proof is missing coordinates".to_string(),
        })
    };
    Ok(MintCoinArgs {
        p_a: artifact.proof.a().ok_or_else(incomplete)?,
        p_b: artifact.proof.b_for_verifier().ok_or_else(incomplete)?,
        p_c: artifact.proof.c().ok_or_else(incomplete)?,
        block_number: artifact.block_number,
        nullifier: artifact.nullifier,
        remaining_coin: artifact.remaining_coin,
        broadcaster_fee: artifact.broadcaster_fee,
        revealed_amount: artifact.reveal_amount,
        revealed_amount_receiver: artifact.wallet_address,
        prover_fee: artifact.prover_fee,
        prover: artifact.prover,
        receiver_post_mint_hook: Bytes::new(),
        broadcaster_fee_post_mint_hook: Bytes::new(),
    })
}
