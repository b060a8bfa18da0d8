use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use crate::{
    error::BlockchainError,
    gas::GasQuote,
    types::{ChainCall, EpochInfo, FeeEstimate, TxOutcome, WalletBalances},
};

/// The chain operations one wallet's farming cycle depends on.
///
/// Implemented by [`crate::EvmChain`] for a single signer. Every method is bounded by
/// the implementation's own timeouts; `submit` returns only after the receipt is known.
#[async_trait]
pub trait FarmChain: Send + Sync {
    /// Address of the signer this chain handle submits with.
    fn address(&self) -> Address;

    async fn balances(&self) -> Result<WalletBalances, BlockchainError>;

    async fn worm_balance(&self) -> Result<U256, BlockchainError>;

    /// BETH the WORM contract may still pull from this wallet.
    async fn beth_allowance(&self) -> Result<U256, BlockchainError>;

    async fn epoch_info(&self) -> Result<EpochInfo, BlockchainError>;

    async fn fee_estimate(&self) -> Result<FeeEstimate, BlockchainError>;

    /// Raw `eth_estimateGas` for the payload, without any buffer applied.
    async fn estimate_gas(&self, call: &ChainCall) -> Result<u64, BlockchainError>;

    /// Sign, send and wait for the receipt. A mined-but-reverted transaction is
    /// [`BlockchainError::Reverted`].
    async fn submit(&self, call: &ChainCall, quote: &GasQuote)
    -> Result<TxOutcome, BlockchainError>;
}
