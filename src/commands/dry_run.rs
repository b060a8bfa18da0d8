use worm_blockchain::{EvmChain, format_ether_trimmed, mask_rpc_url, short_address};
use worm_prover::ProverFailoverPool;

use crate::{config::Config, error::FarmError};

/// Success marker scripts look for on stdout.
pub(crate) const VALID_MARKER: &str = "Configuration valid";

/// Validates configuration, provers and balances without sending anything.
pub(crate) async fn dry_run(config: &Config) -> Result<(), FarmError> {
    log_configuration(config);

    let pool = ProverFailoverPool::from_config(&config.prover)?;
    for (endpoint, healthy) in pool.check_health().await {
        if healthy {
            tracing::info!(endpoint = %endpoint, "Prover reachable");
        } else {
            tracing::warn!(endpoint = %endpoint, "Prover not reachable");
        }
    }

    for (index, wallet) in config.wallets.iter().enumerate() {
        let connect_error = |source| FarmError::Connect {
            wallet: wallet.ordinal,
            source,
        };
        let chain = EvmChain::connect(
            wallet.ordinal,
            &config.chain,
            &wallet.rpc_endpoints,
            &wallet.private_key,
        )
        .await
        .map_err(connect_error)?;

        if index == 0 {
            let (epoch, stats) = tokio::try_join!(chain.epoch_info(), chain.protocol_stats())
                .map_err(connect_error)?;
            tracing::info!(
                current_epoch = epoch.current_epoch,
                epoch_remaining_secs = epoch.remaining_secs,
                total_beth = %format_ether_trimmed(stats.total_beth),
                total_worm = %format_ether_trimmed(stats.total_worm),
                "Protocol state"
            );
        }

        let balances = chain.balances().await.map_err(connect_error)?;
        let per_epoch = wallet.budget.beth_per_epoch;
        if balances.eth.is_zero() && balances.beth < per_epoch {
            tracing::warn!(
                wallet = wallet.ordinal,
                address = %chain.label(),
                "Wallet has neither ETH to burn nor BETH to commit"
            );
        }
        tracing::info!(
            wallet = wallet.ordinal,
            address = %chain.label(),
            eth = %format_ether_trimmed(balances.eth),
            beth = %format_ether_trimmed(balances.beth),
            worm = %format_ether_trimmed(balances.worm),
            "Wallet balances"
        );
    }

    println!("{VALID_MARKER}");
    Ok(())
}

fn log_configuration(config: &Config) {
    let rpc_endpoints: Vec<String> = config
        .chain
        .rpc_endpoints
        .iter()
        .map(|url| mask_rpc_url(url))
        .collect();
    tracing::info!(
        network = %config.chain.network,
        rpc_endpoints = ?rpc_endpoints,
        beth_contract = %config.chain.beth_contract_address,
        worm_contract = %config.chain.worm_contract_address,
        max_fee_per_gas_gwei = config.chain.gas.max_fee_per_gas_gwei,
        "Chain"
    );

    let farming = &config.farming;
    tracing::info!(
        loop_interval_secs = farming.loop_interval.as_secs(),
        burn_fee_eth = %format_ether_trimmed(farming.burn_fee),
        min_gas_reserve_eth = %format_ether_trimmed(farming.min_gas_reserve),
        max_consecutive_failures = farming.max_consecutive_failures,
        claim_on_shutdown = farming.claim_on_shutdown,
        "Farming"
    );
    tracing::info!(
        endpoints = ?config.prover.normalized_endpoints(),
        proof_timeout_secs = config.prover.proof_timeout_secs,
        "Provers"
    );

    for wallet in &config.wallets {
        tracing::info!(
            wallet = wallet.ordinal,
            address = %short_address(&wallet.address),
            total_eth_budget = %format_ether_trimmed(wallet.budget.total_eth_budget),
            beth_per_epoch = %format_ether_trimmed(wallet.budget.beth_per_epoch),
            claim_interval = wallet.budget.claim_interval,
            already_burned = %format_ether_trimmed(wallet.already_burned),
            custom_rpc = !wallet.rpc_endpoints.is_empty(),
            "Wallet"
        );
    }
}
