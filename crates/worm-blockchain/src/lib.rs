mod chains;
mod config;
mod error;
mod error_classification;
mod farm_chain;
mod gas;
mod rpc_executor;
mod rpc_rate_limiter;
mod types;
mod utils;
mod wallets;

pub use chains::evm::EvmChain;
pub use config::{ChainConfig, ConfigError, SEPOLIA_BETH_ADDRESS, SEPOLIA_WORM_ADDRESS};
pub use error::BlockchainError;
pub use farm_chain::FarmChain;
pub use gas::{GasAdmission, GasPolicy, GasPriceGuard, GasQuote, GasRejection, WEI_PER_GWEI};
pub use types::{
    ChainCall, EpochInfo, FeeEstimate, MintCoinArgs, ProtocolStats, TxOutcome, WalletBalances,
};
pub use utils::{
    format_ether_trimmed, mask_rpc_url, parse_ether_amount, short_address, wei_to_eth_f64,
};
pub use wallets::{PrivateKey, signer_from_private_key, wallet_from_private_key};

pub use alloy::primitives::{Address, B256, Bytes, U256};
