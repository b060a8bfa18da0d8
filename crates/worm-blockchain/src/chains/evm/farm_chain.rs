use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use crate::{
    chains::evm::EvmChain,
    error::BlockchainError,
    farm_chain::FarmChain,
    gas::GasQuote,
    types::{ChainCall, EpochInfo, FeeEstimate, TxOutcome, WalletBalances},
};

#[async_trait]
impl FarmChain for EvmChain {
    fn address(&self) -> Address {
        EvmChain::address(self)
    }

    async fn balances(&self) -> Result<WalletBalances, BlockchainError> {
        EvmChain::balances(self).await
    }

    async fn worm_balance(&self) -> Result<U256, BlockchainError> {
        EvmChain::worm_balance(self).await
    }

    async fn beth_allowance(&self) -> Result<U256, BlockchainError> {
        EvmChain::beth_allowance(self).await
    }

    async fn epoch_info(&self) -> Result<EpochInfo, BlockchainError> {
        EvmChain::epoch_info(self).await
    }

    async fn fee_estimate(&self) -> Result<FeeEstimate, BlockchainError> {
        EvmChain::fee_estimate(self).await
    }

    async fn estimate_gas(&self, call: &ChainCall) -> Result<u64, BlockchainError> {
        EvmChain::estimate_gas(self, call).await
    }

    async fn submit(
        &self,
        call: &ChainCall,
        quote: &GasQuote,
    ) -> Result<TxOutcome, BlockchainError> {
        self.send_and_confirm(call, quote).await
    }
}
