use alloy::{primitives::Address, sol};

use super::provider::BlockchainProvider;

sol! {
    /// BETH: ERC-20 minted against a proven burn of native ETH.
    #[sol(rpc)]
    contract Beth {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function mintCoin(
            uint256[2] memory _pA,
            uint256[2][2] memory _pB,
            uint256[2] memory _pC,
            uint256 _blockNumber,
            uint256 _nullifier,
            uint256 _remainingCoin,
            uint256 _broadcasterFee,
            uint256 _revealedAmount,
            address _revealedAmountReceiver,
            uint256 _proverFee,
            address _prover,
            bytes memory _receiverPostMintHook,
            bytes memory _broadcasterFeePostMintHook
        ) external;
    }
}

sol! {
    /// WORM: epoch-based mining with BETH commitments.
    #[sol(rpc)]
    contract Worm {
        function balanceOf(address account) external view returns (uint256);
        function currentEpoch() external view returns (uint256);
        function epochRemainingTime() external view returns (uint256);
        function totalBeth() external view returns (uint256);
        function totalWorm() external view returns (uint256);
        function participate(uint256 _amountPerEpoch, uint256 _numEpochs) external;
        function claim(uint256 _startingEpoch, uint256 _numEpochs) external;
    }
}

pub(crate) struct Contracts {
    beth: Beth::BethInstance<BlockchainProvider>,
    worm: Worm::WormInstance<BlockchainProvider>,
}

impl Contracts {
    pub(crate) fn new(
        provider: &BlockchainProvider,
        beth_address: Address,
        worm_address: Address,
    ) -> Self {
        Self {
            beth: Beth::new(beth_address, provider.clone()),
            worm: Worm::new(worm_address, provider.clone()),
        }
    }

    pub(crate) fn beth(&self) -> &Beth::BethInstance<BlockchainProvider> {
        &self.beth
    }

    pub(crate) fn worm(&self) -> &Worm::WormInstance<BlockchainProvider> {
        &self.worm
    }
}
