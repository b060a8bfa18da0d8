use crate::{
    chains::evm::EvmChain,
    error::BlockchainError,
    types::{EpochInfo, ProtocolStats},
};

impl EvmChain {
    pub async fn current_epoch(&self) -> Result<u64, BlockchainError> {
        let worm = self.contracts.worm();
        let epoch = self
            .rpc_call("current_epoch", || async {
                worm.currentEpoch().call().await
            })
            .await?;
        Ok(epoch.saturating_to())
    }

    pub async fn epoch_info(&self) -> Result<EpochInfo, BlockchainError> {
        let worm = self.contracts.worm();
        let (current_epoch, remaining) = tokio::try_join!(
            self.current_epoch(),
            self.rpc_call("epoch_remaining_time", || async {
                worm.epochRemainingTime().call().await
            }),
        )?;
        Ok(EpochInfo {
            current_epoch,
            remaining_secs: remaining.saturating_to(),
        })
    }

    /// Protocol-wide BETH committed and WORM emitted.
    pub async fn protocol_stats(&self) -> Result<ProtocolStats, BlockchainError> {
        let worm = self.contracts.worm();
        let (total_beth, total_worm) = tokio::try_join!(
            self.rpc_call("total_beth", || async { worm.totalBeth().call().await }),
            self.rpc_call("total_worm", || async { worm.totalWorm().call().await }),
        )?;
        Ok(ProtocolStats {
            total_beth,
            total_worm,
        })
    }
}
