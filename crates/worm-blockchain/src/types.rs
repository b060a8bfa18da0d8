use alloy::primitives::{Address, B256, Bytes, U256};

/// Native, BETH and WORM balances of one wallet, all in wei.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalletBalances {
    pub eth: U256,
    pub beth: U256,
    pub worm: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochInfo {
    pub current_epoch: u64,
    pub remaining_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolStats {
    pub total_beth: U256,
    pub total_worm: U256,
}

/// Network fee suggestion, in wei per gas.
///
/// `base_fee_per_gas` is `None` on chains without EIP-1559; `priority_fee_per_gas`
/// then carries the legacy gas price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub base_fee_per_gas: Option<u128>,
    pub priority_fee_per_gas: u128,
}

/// Arguments of `BETH.mintCoin`, decoded from a prover artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintCoinArgs {
    pub p_a: [U256; 2],
    pub p_b: [[U256; 2]; 2],
    pub p_c: [U256; 2],
    pub block_number: U256,
    pub nullifier: U256,
    pub remaining_coin: U256,
    pub broadcaster_fee: U256,
    pub revealed_amount: U256,
    pub revealed_amount_receiver: Address,
    pub prover_fee: U256,
    pub prover: Address,
    pub receiver_post_mint_hook: Bytes,
    pub broadcaster_fee_post_mint_hook: Bytes,
}

/// Every state-changing call the farmer makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainCall {
    /// Plain value transfer of `amount` wei to a prover-derived burn address.
    BurnTransfer { burn_address: Address, amount: U256 },
    MintCoin(Box<MintCoinArgs>),
    /// Approve the WORM contract to pull `amount` BETH.
    ApproveBeth { amount: U256 },
    Participate {
        amount_per_epoch: U256,
        num_epochs: U256,
    },
    Claim {
        starting_epoch: U256,
        num_epochs: U256,
    },
}

impl ChainCall {
    pub fn operation(&self) -> &'static str {
        match self {
            ChainCall::BurnTransfer { .. } => "burn_transfer",
            ChainCall::MintCoin(_) => "mint_coin",
            ChainCall::ApproveBeth { .. } => "approve_beth",
            ChainCall::Participate { .. } => "participate",
            ChainCall::Claim { .. } => "claim",
        }
    }
}

/// A transaction that was mined with a successful status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}
