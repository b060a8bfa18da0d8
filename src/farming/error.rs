use std::fmt;

use thiserror::Error;
use worm_blockchain::{BlockchainError, GasRejection};
use worm_prover::ProverError;

/// The step of a farming cycle an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CycleStep {
    Balance,
    Burn,
    Mint,
    Approve,
    Participate,
    Claim,
}

impl CycleStep {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            CycleStep::Balance => "balance",
            CycleStep::Burn => "burn",
            CycleStep::Mint => "mint",
            CycleStep::Approve => "approve",
            CycleStep::Participate => "participate",
            CycleStep::Claim => "claim",
        }
    }
}

impl fmt::Display for CycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that can end a cycle early. None of these stop the wallet's task.
#[derive(Debug, Error)]
pub(crate) enum CycleError {
    #[error("Prover unavailable: {0}")]
    ProverUnavailable(#[source] ProverError),

    /// Proof of work or another local prover-side failure.
    #[error("Proof preparation failed: {0}")]
    Prover(#[source] ProverError),

    #[error("Gas rejected for {operation}: {rejection}")]
    GasRejected {
        operation: &'static str,
        rejection: GasRejection,
    },

    #[error("Epoch participation reverted: {0}")]
    EpochReverted(#[source] BlockchainError),

    #[error("Transaction reverted: {0}")]
    TransactionReverted(#[source] BlockchainError),

    #[error("Network timeout: {0}")]
    NetworkTimeout(#[source] BlockchainError),

    #[error("Chain call failed: {0}")]
    Chain(#[source] BlockchainError),
}

impl CycleError {
    /// Classifies a chain failure; participation reverts get their own variant.
    pub(crate) fn from_chain(step: CycleStep, err: BlockchainError) -> Self {
        if err.is_revert() {
            if step == CycleStep::Participate {
                CycleError::EpochReverted(err)
            } else {
                CycleError::TransactionReverted(err)
            }
        } else if err.is_timeout() {
            CycleError::NetworkTimeout(err)
        } else {
            CycleError::Chain(err)
        }
    }

    pub(crate) fn from_prover(err: ProverError) -> Self {
        match err {
            ProverError::Unavailable { .. } => CycleError::ProverUnavailable(err),
            other => CycleError::Prover(other),
        }
    }

    /// A gas rejection postpones the step; it is not counted as a failure.
    pub(crate) fn is_deferral(&self) -> bool {
        matches!(self, CycleError::GasRejected { .. })
    }

    /// Errors that cannot clear up by waiting for the next cycle.
    pub(crate) fn is_fatal(&self) -> bool {
        match self {
            CycleError::Chain(err) => err.is_fatal(),
            _ => false,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            CycleError::ProverUnavailable(_) => "prover_unavailable",
            CycleError::Prover(_) => "prover",
            CycleError::GasRejected { .. } => "gas_rejected",
            CycleError::EpochReverted(_) => "epoch_reverted",
            CycleError::TransactionReverted(_) => "tx_reverted",
            CycleError::NetworkTimeout(_) => "timeout",
            CycleError::Chain(_) => "chain",
        }
    }
}

/// A [`CycleError`] tagged with the step that raised it.
#[derive(Debug, Error)]
#[error("{step} step failed: {error}")]
pub(crate) struct StepError {
    pub step: CycleStep,
    #[source]
    pub error: CycleError,
}

impl StepError {
    pub(crate) fn new(step: CycleStep, error: CycleError) -> Self {
        Self { step, error }
    }

    pub(crate) fn chain(step: CycleStep, err: BlockchainError) -> Self {
        Self::new(step, CycleError::from_chain(step, err))
    }
}
