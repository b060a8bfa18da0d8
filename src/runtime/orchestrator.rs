use std::sync::Arc;

use futures::future::try_join_all;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use worm_blockchain::{EvmChain, FarmChain, GasPriceGuard, U256};
use worm_prover::ProverFailoverPool;

use crate::{
    config::{Config, FarmingConfig, WalletConfig},
    error::FarmError,
    farming::{FarmerSettings, SharedServices, SummaryHandle, WalletFarmer},
};

/// Owns one [`WalletFarmer`] per configured wallet and runs them side by side.
pub(crate) struct FarmOrchestrator {
    farmers: Vec<WalletFarmer>,
    pool: Arc<ProverFailoverPool>,
}

impl FarmOrchestrator {
    /// Connects every wallet. Any connection failure is fatal: no wallet starts.
    pub(crate) async fn build(config: &Config) -> Result<Self, FarmError> {
        let services = SharedServices {
            pool: Arc::new(ProverFailoverPool::from_config(&config.prover)?),
            gas: Arc::new(GasPriceGuard::new(config.chain.gas.clone())),
            network: config.chain.network.clone(),
            pow_zero_bytes: config.prover.pow_zero_bytes,
        };

        let chains = try_join_all(config.wallets.iter().map(|wallet| async move {
            EvmChain::connect(
                wallet.ordinal,
                &config.chain,
                &wallet.rpc_endpoints,
                &wallet.private_key,
            )
            .await
            .map_err(|source| FarmError::Connect {
                wallet: wallet.ordinal,
                source,
            })
        }))
        .await?;

        let farmers = config
            .wallets
            .iter()
            .zip(chains)
            .map(|(wallet, chain)| {
                tracing::info!(
                    wallet = wallet.ordinal,
                    address = %chain.label(),
                    "Wallet connected"
                );
                let chain: Arc<dyn FarmChain> = Arc::new(chain);
                WalletFarmer::new(
                    wallet.ordinal,
                    chain,
                    farmer_settings(wallet, &config.farming),
                    services.clone(),
                )
            })
            .collect();

        Ok(Self {
            farmers,
            pool: services.pool,
        })
    }

    /// The prover pool every wallet shares.
    pub(crate) fn prover_pool(&self) -> Arc<ProverFailoverPool> {
        Arc::clone(&self.pool)
    }

    pub(crate) fn summaries(&self) -> Vec<SummaryHandle> {
        self.farmers.iter().map(WalletFarmer::summary_handle).collect()
    }

    /// Runs every farmer to completion. Wallets never wait on each other.
    pub(crate) async fn run(self, shutdown: CancellationToken, max_cycles: Option<u64>) {
        let mut tasks = JoinSet::new();
        for farmer in self.farmers {
            tasks.spawn(farmer.run(shutdown.clone(), max_cycles));
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(error) = result {
                tracing::error!(error = ?error, "Wallet farmer task panicked");
            }
        }
    }
}

fn farmer_settings(wallet: &WalletConfig, farming: &FarmingConfig) -> FarmerSettings {
    FarmerSettings {
        budget: wallet.budget,
        burn_fee: farming.burn_fee,
        min_gas_reserve: farming.min_gas_reserve,
        approval_amount: wallet
            .budget
            .beth_per_epoch
            .saturating_mul(U256::from(farming.approval_epochs)),
        already_burned: wallet.already_burned,
        loop_interval: farming.loop_interval,
        max_consecutive_failures: farming.max_consecutive_failures,
        claim_on_shutdown: farming.claim_on_shutdown,
        shutdown_claim_timeout: farming.shutdown_timeout,
    }
}
