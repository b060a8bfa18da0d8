use std::path::PathBuf;

use clap::Parser;

/// Unattended multi-wallet WORM farming loop.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "worm-farmer", version, about)]
pub(crate) struct Cli {
    /// TOML config file, merged over `config.toml` in the working directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Environment file to load instead of `.env`
    #[arg(long, value_name = "FILE")]
    pub env: Option<PathBuf>,

    /// Validate configuration, provers and balances without sending transactions
    #[arg(long)]
    pub dry_run: bool,

    /// Run one cycle per wallet, print the summary and exit
    #[arg(long, conflicts_with = "dry_run")]
    pub once: bool,

    /// Log at debug level regardless of RUST_LOG and the config file
    #[arg(long)]
    pub debug: bool,
}
