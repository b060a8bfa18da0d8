use std::time::Duration;

use alloy::{
    contract::Error as ContractError,
    transports::{RpcError, TransportErrorKind},
};

use crate::{
    chains::evm::error_decode::decode_revert_data,
    error::BlockchainError,
    error_classification::{
        contract_error_backoff_hint, is_execution_revert, is_retryable_contract_error,
        is_retryable_rpc_error, revert_data, rpc_backoff_hint,
    },
};

#[derive(Debug, Clone)]
pub(crate) struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Read calls: a few quick attempts, the farming cycle itself is the slow retry.
    pub(crate) fn reads() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
        }
    }

    /// Submissions: retried only for transient transport failures and fee bumps.
    pub(crate) fn submissions() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

pub(crate) trait RetryableError: std::fmt::Display {
    fn is_retryable(&self) -> bool;

    fn backoff_hint(&self) -> Option<Duration> {
        None
    }

    /// Final conversion once retries are exhausted; reverts become
    /// [`BlockchainError::Reverted`] so callers can tell them from transport trouble.
    fn into_blockchain_error(self, operation: &'static str) -> BlockchainError;
}

impl RetryableError for RpcError<TransportErrorKind> {
    fn is_retryable(&self) -> bool {
        is_retryable_rpc_error(self)
    }

    fn backoff_hint(&self) -> Option<Duration> {
        rpc_backoff_hint(self)
    }

    fn into_blockchain_error(self, operation: &'static str) -> BlockchainError {
        if !is_execution_revert(&self) {
            return BlockchainError::Rpc(self);
        }
        let reason = revert_data(&self)
            .map(|data| decode_revert_data(&data))
            .or_else(|| self.as_error_resp().map(|payload| payload.message.to_string()));
        BlockchainError::Reverted {
            operation,
            tx_hash: None,
            reason,
        }
    }
}

impl RetryableError for ContractError {
    fn is_retryable(&self) -> bool {
        is_retryable_contract_error(self)
    }

    fn backoff_hint(&self) -> Option<Duration> {
        contract_error_backoff_hint(self)
    }

    fn into_blockchain_error(self, operation: &'static str) -> BlockchainError {
        match self {
            ContractError::TransportError(inner) => inner.into_blockchain_error(operation),
            other => match other.as_revert_data() {
                Some(data) => BlockchainError::Reverted {
                    operation,
                    tx_hash: None,
                    reason: Some(decode_revert_data(&data)),
                },
                None => BlockchainError::Contract(other),
            },
        }
    }
}

pub(crate) fn backoff_delay(
    policy: &RetryPolicy,
    attempt: usize,
    hint: Option<Duration>,
) -> Duration {
    if let Some(hint) = hint {
        return hint.min(policy.max_delay);
    }

    let base_ms = policy.base_delay.as_millis() as u64;
    let exponent = (attempt.saturating_sub(1)).min(6) as u32;
    let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
    let delay_ms = base_ms.saturating_mul(factor);
    let max_ms = policy.max_delay.as_millis() as u64;

    Duration::from_millis(delay_ms.min(max_ms))
}
