//! Configuration: typed defaults, `config.toml`, `--config`, `.env` style variables
//! and `PK1`..`PK5`, resolved into an immutable [`Config`].

mod amount;
mod cli;
mod defaults;
mod error;
mod loader;
mod raw;

pub(crate) use amount::EtherAmount;
pub(crate) use cli::Cli;
pub(crate) use error::ConfigError;
pub(crate) use loader::load_configuration;
pub(crate) use raw::{Config, ConfigRaw, FarmingConfig, WalletConfig};
