use std::time::Duration;

use alloy::{
    contract::Error as ContractError,
    primitives::B256,
    signers::local::LocalSignerError,
    transports::{RpcError, TransportErrorKind},
};

#[derive(Debug, thiserror::Error)]
pub enum BlockchainError {
    #[error("Contract error: {0}")]
    Contract(#[from] ContractError),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError<TransportErrorKind>),

    #[error("Invalid private key for wallet #{wallet_index} (length: {key_length})")]
    InvalidPrivateKey {
        wallet_index: usize,
        key_length: usize,
        #[source]
        source: LocalSignerError,
    },

    #[error("Invalid address: {address}")]
    InvalidAddress { address: String },

    #[error("RPC connection failed after trying {attempts} endpoint(s)")]
    RpcConnectionFailed { attempts: usize },

    #[error("Provider initialization failed: {reason}")]
    ProviderInit { reason: String },

    #[error("{operation} timed out after {}s", .timeout.as_secs())]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("{operation} reverted: {}", .reason.as_deref().unwrap_or("no revert reason"))]
    Reverted {
        operation: &'static str,
        tx_hash: Option<B256>,
        reason: Option<String>,
    },

    #[error("Transaction receipt failed for {operation}: {reason}")]
    ReceiptFailed {
        operation: &'static str,
        reason: String,
    },

    #[error("{0}")]
    Custom(String),
}

impl BlockchainError {
    /// True when the chain executed (or simulated) the call and rejected it.
    pub fn is_revert(&self) -> bool {
        matches!(self, Self::Reverted { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Errors that no later cycle can fix.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidPrivateKey { .. } | Self::InvalidAddress { .. }
        )
    }
}
