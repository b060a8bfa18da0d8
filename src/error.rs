use thiserror::Error;
use worm_blockchain::BlockchainError;
use worm_prover::ProverError;

use crate::config::ConfigError;

/// Errors that stop the process before or while wallets start.
#[derive(Error, Debug)]
pub(crate) enum FarmError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Wallet #{wallet} could not connect: {source}")]
    Connect {
        wallet: usize,
        #[source]
        source: BlockchainError,
    },

    #[error("Prover pool setup failed: {0}")]
    Prover(#[from] ProverError),
}
