mod commands;
mod config;
mod error;
mod farming;
mod logger;
mod periodic;
mod runtime;

use std::process::ExitCode;

use clap::Parser;
use worm_blockchain::format_ether_trimmed;

use crate::config::{Cli, Config};

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    // Logging is not up yet, so configuration errors go straight to stderr.
    let config = match config::load_configuration(&cli) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Configuration error: {error}");
            return ExitCode::FAILURE;
        }
    };

    logger::initialize(&config.logger, &config.telemetry, cli.debug);
    display_startup_banner(&config, &cli);

    let result = if cli.dry_run {
        commands::dry_run(&config).await
    } else {
        runtime::run(&config, cli.once).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %error, "Fatal error");
            ExitCode::FAILURE
        }
    }
}

fn display_startup_banner(config: &Config, cli: &Cli) {
    tracing::info!("======================================================");
    tracing::info!("             WORM Farmer v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("======================================================");
    tracing::info!(
        network = %config.chain.network,
        wallets = config.wallets.len(),
        dry_run = cli.dry_run,
        once = cli.once,
        "Starting"
    );

    for warning in &config.warnings {
        tracing::warn!("{warning}");
    }

    // Burn totals live in memory only; a restart starts from the configured seed.
    tracing::warn!(
        "Cumulative burn is not persisted across restarts; set already_burned per wallet to carry it over"
    );
    for wallet in config.wallets.iter().filter(|w| !w.already_burned.is_zero()) {
        tracing::info!(
            wallet = wallet.ordinal,
            already_burned = %format_ether_trimmed(wallet.already_burned),
            "Seeded cumulative burn"
        );
    }
}
