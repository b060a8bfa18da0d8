use std::{
    collections::HashMap,
    env,
    path::{Path, PathBuf},
    str::FromStr,
};

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use worm_blockchain::PrivateKey;
use worm_prover::DEFAULT_PROVER_ENDPOINTS;

use super::{
    Cli, Config, ConfigError, ConfigRaw, defaults,
    raw::{MAX_WALLETS, WalletConfigRaw},
};

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const DEFAULT_ENV_FILE: &str = ".env";

/// Layers every configuration source and resolves the result.
pub(crate) fn load_configuration(cli: &Cli) -> Result<Config, ConfigError> {
    let env = EnvVars::load(cli.env.as_deref())?;

    // Build configuration with layered sources (priority: lowest to highest)
    let mut figment = Figment::from(Serialized::defaults(defaults::config()));

    // User overrides from config.toml
    if Path::new(DEFAULT_CONFIG_FILE).exists() {
        figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE));
    }

    // An explicit config file must exist
    if let Some(config_path) = &cli.config {
        if !config_path.exists() {
            return Err(ConfigError::MissingConfig(
                config_path.display().to_string(),
            ));
        }
        figment = figment.merge(Toml::file(config_path));
    }

    figment = env.merge_overrides(figment)?;

    let mut config: ConfigRaw = figment.extract().map_err(Box::new)?;
    env.apply_wallets(&mut config.wallets);

    config.resolve()
}

/// Process environment first, then the `.env` file. The file never touches the
/// process environment.
struct EnvVars {
    file: HashMap<String, String>,
}

impl EnvVars {
    fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None if Path::new(DEFAULT_ENV_FILE).exists() => PathBuf::from(DEFAULT_ENV_FILE),
            None => {
                return Ok(Self {
                    file: HashMap::new(),
                });
            }
        };
        let file = dotenvy::from_path_iter(&path)?.collect::<Result<_, _>>()?;
        Ok(Self { file })
    }

    fn value(&self, name: &str) -> Option<String> {
        env::var(name)
            .ok()
            .or_else(|| self.file.get(name).cloned())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn number<T: FromStr>(&self, name: &str) -> Result<Option<T>, ConfigError> {
        self.value(name)
            .map(|value| {
                value.parse::<T>().map_err(|_| {
                    ConfigError::InvalidConfig(format!(
                        "{name} must be a whole number (got '{value}')"
                    ))
                })
            })
            .transpose()
    }

    /// Variables in the `.env` format the bot has always accepted.
    fn merge_overrides(&self, mut figment: Figment) -> Result<Figment, ConfigError> {
        if let Some(url) = self.value("RPC_URL") {
            figment = figment.merge(Serialized::default("chain.rpc_endpoints", vec![url]));
        }
        if let Some(network) = self.value("NETWORK") {
            figment = figment.merge(Serialized::default("chain.network", network));
        }

        for (name, key) in [
            ("TOTAL_ETH_BUDGET", "farming.total_eth_budget"),
            ("BETH_PER_EPOCH", "farming.beth_per_epoch"),
            ("BURN_FEE", "farming.burn_fee"),
        ] {
            if let Some(amount) = self.value(name) {
                figment = figment.merge(Serialized::default(key, amount));
            }
        }

        if let Some(value) = self.number::<u32>("CLAIM_INTERVAL")? {
            figment = figment.merge(Serialized::default("farming.claim_interval", value));
        }
        if let Some(value) = self.number::<u64>("LOOP_INTERVAL_SECONDS")? {
            figment = figment.merge(Serialized::default("farming.loop_interval_secs", value));
        }
        if let Some(value) = self.number::<u32>("MAX_RETRIES")? {
            figment = figment.merge(Serialized::default(
                "farming.max_consecutive_failures",
                value,
            ));
        }

        let primary = self.value("PROVER_URL");
        let backup = self.value("PROVER_BACKUP_URL");
        if primary.is_some() || backup.is_some() {
            // Public provers stay behind the configured ones as a last resort.
            let endpoints: Vec<String> = primary
                .into_iter()
                .chain(backup)
                .chain(DEFAULT_PROVER_ENDPOINTS.iter().map(|e| e.to_string()))
                .collect();
            figment = figment.merge(Serialized::default("prover.endpoints", endpoints));
        }
        if let Some(value) = self.number::<u64>("PROVER_TIMEOUT")? {
            figment = figment.merge(Serialized::default("prover.proof_timeout_secs", value));
        }

        if let Some(level) = self.value("LOG_LEVEL") {
            figment = figment.merge(Serialized::default("logger.level", level.to_lowercase()));
        }

        Ok(figment)
    }

    /// `PK<n>` fills wallet slot `n`, adding empty slots in between as needed.
    fn apply_wallets(&self, wallets: &mut Vec<WalletConfigRaw>) {
        for slot in 1..=MAX_WALLETS {
            let Some(key) = self.value(&format!("PK{slot}")) else {
                continue;
            };
            if wallets.len() < slot {
                wallets.resize_with(slot, WalletConfigRaw::default);
            }
            wallets[slot - 1].private_key = Some(PrivateKey::new(key));
        }
    }
}
