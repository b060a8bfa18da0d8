use alloy::{eips::BlockNumberOrTag, providers::Provider};

use crate::{
    chains::evm::EvmChain,
    error::BlockchainError,
    types::{ChainCall, FeeEstimate},
};

impl EvmChain {
    /// Current base fee plus suggested tip. Chains whose latest block carries no base
    /// fee fall back to the legacy gas price.
    pub async fn fee_estimate(&self) -> Result<FeeEstimate, BlockchainError> {
        let block = self
            .rpc_call("get_latest_block", || {
                self.provider.get_block_by_number(BlockNumberOrTag::Latest)
            })
            .await?;
        let base_fee = block.and_then(|block| block.header.base_fee_per_gas);

        match base_fee {
            Some(base_fee) => {
                let priority_fee = self
                    .rpc_call("max_priority_fee", || {
                        self.provider.get_max_priority_fee_per_gas()
                    })
                    .await?;
                Ok(FeeEstimate {
                    base_fee_per_gas: Some(u128::from(base_fee)),
                    priority_fee_per_gas: priority_fee,
                })
            }
            None => {
                let gas_price = self
                    .rpc_call("gas_price", || self.provider.get_gas_price())
                    .await?;
                tracing::debug!(wallet = %self.label, gas_price, "No base fee reported; using legacy pricing");
                Ok(FeeEstimate {
                    base_fee_per_gas: None,
                    priority_fee_per_gas: gas_price,
                })
            }
        }
    }

    /// Raw gas estimate for `call`; reverting payloads surface as
    /// [`BlockchainError::Reverted`] before anything is signed.
    pub async fn estimate_gas(&self, call: &ChainCall) -> Result<u64, BlockchainError> {
        let operation = call.operation();
        let request = self.transaction_request(call);
        self.rpc_call(operation, || self.provider.estimate_gas(request.clone()))
            .await
    }
}
