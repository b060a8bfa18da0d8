use alloy::{primitives::U256, providers::Provider};

use crate::{chains::evm::EvmChain, error::BlockchainError, types::WalletBalances};

impl EvmChain {
    pub async fn eth_balance(&self) -> Result<U256, BlockchainError> {
        let address = self.address;
        self.rpc_call("get_balance", || self.provider.get_balance(address))
            .await
    }

    pub async fn beth_balance(&self) -> Result<U256, BlockchainError> {
        let beth = self.contracts.beth();
        self.rpc_call("beth_balance_of", || async {
            beth.balanceOf(self.address).call().await
        })
            .await
    }

    pub async fn worm_balance(&self) -> Result<U256, BlockchainError> {
        let worm = self.contracts.worm();
        self.rpc_call("worm_balance_of", || async {
            worm.balanceOf(self.address).call().await
        })
            .await
    }

    /// ETH, BETH and WORM balances read concurrently.
    pub async fn balances(&self) -> Result<WalletBalances, BlockchainError> {
        let (eth, beth, worm) =
            tokio::try_join!(self.eth_balance(), self.beth_balance(), self.worm_balance())?;
        Ok(WalletBalances { eth, beth, worm })
    }

    /// BETH the WORM contract is allowed to pull from this wallet.
    pub async fn beth_allowance(&self) -> Result<U256, BlockchainError> {
        let beth = self.contracts.beth();
        let spender = *self.contracts.worm().address();
        self.rpc_call("beth_allowance", || async {
            beth.allowance(self.address, spender).call().await
        })
        .await
    }
}
