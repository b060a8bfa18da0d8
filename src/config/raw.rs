use std::{collections::HashSet, time::Duration};

use serde::{Deserialize, Serialize};
use worm_blockchain::{
    Address, ChainConfig, PrivateKey, U256, format_ether_trimmed, signer_from_private_key,
};
use worm_prover::ProverConfig;

use super::{ConfigError, EtherAmount};
use crate::{
    farming::FarmingBudget,
    logger::{LoggerConfig, TelemetryConfig},
};

pub(crate) const MAX_WALLETS: usize = 5;
const CLAIM_INTERVAL_RANGE: std::ops::RangeInclusive<u32> = 1..=100;
const LOOP_INTERVAL_RANGE: std::ops::RangeInclusive<u64> = 60..=3600;
const MAX_CONSECUTIVE_FAILURES_RANGE: std::ops::RangeInclusive<u32> = 1..=10;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConfigRaw {
    pub chain: ChainConfig,
    pub prover: ProverConfig,
    pub farming: FarmingConfigRaw,
    /// Filled from `[[wallets]]` and `PK1`..`PK5`; never serialized.
    #[serde(default, skip_serializing)]
    pub wallets: Vec<WalletConfigRaw>,
    pub logger: LoggerConfig,
    pub telemetry: TelemetryConfig,
}

/// Defaults shared by every wallet, plus loop and shutdown settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct FarmingConfigRaw {
    pub total_eth_budget: EtherAmount,
    pub beth_per_epoch: EtherAmount,
    pub claim_interval: u32,
    pub burn_fee: EtherAmount,
    pub loop_interval_secs: u64,
    pub max_consecutive_failures: u32,
    pub min_gas_reserve: EtherAmount,
    /// Epochs' worth of BETH approved at once.
    pub approval_epochs: u32,
    pub claim_on_shutdown: bool,
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct WalletConfigRaw {
    pub private_key: Option<PrivateKey>,
    /// Overrides `chain.rpc_endpoints` for this wallet.
    #[serde(default)]
    pub rpc_endpoints: Vec<String>,
    pub total_eth_budget: Option<EtherAmount>,
    pub beth_per_epoch: Option<EtherAmount>,
    pub claim_interval: Option<u32>,
    /// Base asset already burned before this run.
    pub already_burned: Option<EtherAmount>,
}

#[derive(Debug, Clone)]
pub(crate) struct FarmingConfig {
    pub default_budget: FarmingBudget,
    pub burn_fee: U256,
    pub loop_interval: Duration,
    pub max_consecutive_failures: u32,
    pub min_gas_reserve: U256,
    pub approval_epochs: u32,
    pub claim_on_shutdown: bool,
    pub shutdown_timeout: Duration,
}

#[derive(Debug, Clone)]
pub(crate) struct WalletConfig {
    /// 1-based slot (`PK<n>` or `[[wallets]]` position).
    pub ordinal: usize,
    pub address: Address,
    pub private_key: PrivateKey,
    pub rpc_endpoints: Vec<String>,
    pub budget: FarmingBudget,
    pub already_burned: U256,
}

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub chain: ChainConfig,
    pub prover: ProverConfig,
    pub farming: FarmingConfig,
    pub wallets: Vec<WalletConfig>,
    pub logger: LoggerConfig,
    pub telemetry: TelemetryConfig,
    /// Problems that did not stop the load, logged once the logger is up.
    pub warnings: Vec<String>,
}

impl ConfigRaw {
    pub(crate) fn resolve(self) -> Result<Config, ConfigError> {
        self.chain.validate()?;
        self.prover.validate()?;
        let farming = self.farming.resolve()?;

        let mut warnings = Vec::new();
        let mut wallets = Vec::new();
        for (index, raw) in self.wallets.into_iter().enumerate() {
            if let Some(wallet) = raw.resolve(index + 1, &farming, &mut warnings)? {
                wallets.push(wallet);
            }
        }

        if wallets.is_empty() {
            return Err(ConfigError::MissingSecret(
                "no valid wallet private key; set PK1..PK5 or [[wallets]].private_key".to_string(),
            ));
        }
        if wallets.len() > MAX_WALLETS {
            return Err(ConfigError::InvalidConfig(format!(
                "{} wallets configured, at most {MAX_WALLETS} are supported",
                wallets.len()
            )));
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = wallets.iter().find(|w| !seen.insert(w.address)) {
            return Err(ConfigError::InvalidConfig(format!(
                "wallet #{} repeats address {}",
                duplicate.ordinal, duplicate.address
            )));
        }

        Ok(Config {
            chain: self.chain,
            prover: self.prover,
            farming,
            wallets,
            logger: self.logger,
            telemetry: self.telemetry,
            warnings,
        })
    }
}

impl FarmingConfigRaw {
    fn resolve(&self) -> Result<FarmingConfig, ConfigError> {
        let budget = FarmingBudget {
            total_eth_budget: self.total_eth_budget.wei(),
            beth_per_epoch: self.beth_per_epoch.wei(),
            claim_interval: self.claim_interval,
        };
        validate_budget("farming", &budget, self.burn_fee.wei())?;

        if !LOOP_INTERVAL_RANGE.contains(&self.loop_interval_secs) {
            return Err(ConfigError::InvalidConfig(format!(
                "farming.loop_interval_secs must be within {}..={} (got {})",
                LOOP_INTERVAL_RANGE.start(),
                LOOP_INTERVAL_RANGE.end(),
                self.loop_interval_secs
            )));
        }
        if !MAX_CONSECUTIVE_FAILURES_RANGE.contains(&self.max_consecutive_failures) {
            return Err(ConfigError::InvalidConfig(format!(
                "farming.max_consecutive_failures must be within {}..={} (got {})",
                MAX_CONSECUTIVE_FAILURES_RANGE.start(),
                MAX_CONSECUTIVE_FAILURES_RANGE.end(),
                self.max_consecutive_failures
            )));
        }
        if self.approval_epochs == 0 || self.shutdown_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "farming.approval_epochs and farming.shutdown_timeout_secs must be greater than 0"
                    .to_string(),
            ));
        }

        Ok(FarmingConfig {
            default_budget: budget,
            burn_fee: self.burn_fee.wei(),
            loop_interval: Duration::from_secs(self.loop_interval_secs),
            max_consecutive_failures: self.max_consecutive_failures,
            min_gas_reserve: self.min_gas_reserve.wei(),
            approval_epochs: self.approval_epochs,
            claim_on_shutdown: self.claim_on_shutdown,
            shutdown_timeout: Duration::from_secs(self.shutdown_timeout_secs),
        })
    }
}

impl WalletConfigRaw {
    /// `Ok(None)` skips the slot: a missing or unusable key is a warning, not an error.
    fn resolve(
        self,
        ordinal: usize,
        farming: &FarmingConfig,
        warnings: &mut Vec<String>,
    ) -> Result<Option<WalletConfig>, ConfigError> {
        let Some(private_key) = self.private_key.map(|k| k.normalized()) else {
            warnings.push(format!("wallet #{ordinal} has no private key, skipping"));
            return Ok(None);
        };
        if !private_key.is_well_formed() {
            warnings.push(format!(
                "wallet #{ordinal} private key is not 0x followed by 64 hex characters, skipping"
            ));
            return Ok(None);
        }
        let address = match signer_from_private_key(ordinal, &private_key) {
            Ok(signer) => signer.address(),
            Err(err) => {
                warnings.push(format!("{err}, skipping"));
                return Ok(None);
            }
        };

        let defaults = farming.default_budget;
        let budget = FarmingBudget {
            total_eth_budget: self
                .total_eth_budget
                .map_or(defaults.total_eth_budget, EtherAmount::wei),
            beth_per_epoch: self
                .beth_per_epoch
                .map_or(defaults.beth_per_epoch, EtherAmount::wei),
            claim_interval: self.claim_interval.unwrap_or(defaults.claim_interval),
        };
        validate_budget(&format!("wallet #{ordinal}"), &budget, farming.burn_fee)?;

        let already_burned = self.already_burned.map_or(U256::ZERO, EtherAmount::wei);
        if already_burned > budget.total_eth_budget {
            return Err(ConfigError::InvalidConfig(format!(
                "wallet #{ordinal} already_burned {} exceeds its total_eth_budget {}",
                format_ether_trimmed(already_burned),
                format_ether_trimmed(budget.total_eth_budget)
            )));
        }

        Ok(Some(WalletConfig {
            ordinal,
            address,
            private_key,
            rpc_endpoints: self
                .rpc_endpoints
                .into_iter()
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect(),
            budget,
            already_burned,
        }))
    }
}

fn validate_budget(scope: &str, budget: &FarmingBudget, burn_fee: U256) -> Result<(), ConfigError> {
    if budget.total_eth_budget.is_zero() || budget.beth_per_epoch.is_zero() {
        return Err(ConfigError::InvalidConfig(format!(
            "{scope}: total_eth_budget and beth_per_epoch must be greater than 0"
        )));
    }
    if burn_fee >= budget.total_eth_budget {
        return Err(ConfigError::InvalidConfig(format!(
            "{scope}: burn_fee {} must be below total_eth_budget {}",
            format_ether_trimmed(burn_fee),
            format_ether_trimmed(budget.total_eth_budget)
        )));
    }
    if !CLAIM_INTERVAL_RANGE.contains(&budget.claim_interval) {
        return Err(ConfigError::InvalidConfig(format!(
            "{scope}: claim_interval must be within {}..={} (got {})",
            CLAIM_INTERVAL_RANGE.start(),
            CLAIM_INTERVAL_RANGE.end(),
            budget.claim_interval
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::config::defaults;

    const KEY_1: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const KEY_2: &str =
        "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    fn raw_with_keys(keys: &[&str]) -> ConfigRaw {
        let mut raw = defaults::config();
        raw.chain.rpc_endpoints = vec!["https://rpc.sepolia.org".to_string()];
        raw.wallets = keys
            .iter()
            .map(|k| WalletConfigRaw {
                private_key: Some(PrivateKey::new(*k)),
                ..WalletConfigRaw::default()
            })
            .collect();
        raw
    }

    fn invalid_message(raw: ConfigRaw) -> String {
        match raw.resolve() {
            Err(ConfigError::InvalidConfig(message)) => message,
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn defaults_with_one_key_resolve() {
        let config = raw_with_keys(&[KEY_1]).resolve().unwrap();

        assert_eq!(config.wallets.len(), 1);
        let wallet = &config.wallets[0];
        assert_eq!(wallet.ordinal, 1);
        assert_eq!(
            wallet.address.to_string(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
        assert_eq!(wallet.budget.claim_interval, 5);
        assert_eq!(
            wallet.budget.beth_per_epoch,
            U256::from(1_000_000_000_000_000u64)
        );
        assert_eq!(config.farming.loop_interval, Duration::from_secs(600));
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn bad_keys_are_skipped_with_a_warning() {
        let mut raw = raw_with_keys(&["0x1234", KEY_2]);
        raw.wallets.insert(1, WalletConfigRaw::default());
        let config = raw.resolve().unwrap();

        assert_eq!(config.wallets.len(), 1);
        assert_eq!(config.wallets[0].ordinal, 3);
        assert_eq!(config.warnings.len(), 2);
        assert!(config.warnings.iter().all(|w| !w.contains("1234")));
    }

    #[test]
    fn key_without_prefix_is_accepted() {
        let config = raw_with_keys(&[&KEY_1[2..]]).resolve().unwrap();
        assert_eq!(config.wallets[0].private_key.expose_secret(), KEY_1);
    }

    #[test]
    fn no_usable_key_is_a_missing_secret() {
        assert!(matches!(
            raw_with_keys(&[]).resolve(),
            Err(ConfigError::MissingSecret(_))
        ));
    }

    #[test]
    fn more_than_five_wallets_are_rejected() {
        let keys: Vec<String> = (1..=6u8)
            .map(|i| format!("0x{}", format!("{i:02x}").repeat(32)))
            .collect();
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        assert!(invalid_message(raw_with_keys(&keys)).contains("at most 5"));
    }

    #[test]
    fn duplicate_wallets_are_rejected() {
        assert!(invalid_message(raw_with_keys(&[KEY_1, KEY_1])).contains("repeats address"));
    }

    #[test]
    fn ranges_are_enforced() {
        let mut raw = raw_with_keys(&[KEY_1]);
        raw.farming.claim_interval = 0;
        assert!(invalid_message(raw).contains("claim_interval"));

        let mut raw = raw_with_keys(&[KEY_1]);
        raw.farming.loop_interval_secs = 30;
        assert!(invalid_message(raw).contains("loop_interval_secs"));

        let mut raw = raw_with_keys(&[KEY_1]);
        raw.farming.max_consecutive_failures = 11;
        assert!(invalid_message(raw).contains("max_consecutive_failures"));

        let mut raw = raw_with_keys(&[KEY_1]);
        raw.farming.burn_fee = raw.farming.total_eth_budget;
        assert!(invalid_message(raw).contains("burn_fee"));

        let mut raw = raw_with_keys(&[KEY_1]);
        raw.farming.beth_per_epoch = EtherAmount(U256::ZERO);
        assert!(invalid_message(raw).contains("beth_per_epoch"));
    }

    #[test]
    fn wallet_overrides_apply_to_that_wallet_only() {
        let mut raw = raw_with_keys(&[KEY_1, KEY_2]);
        raw.wallets[1].claim_interval = Some(2);
        raw.wallets[1].already_burned = Some(EtherAmount::parse("0.01").unwrap());
        raw.wallets[1].rpc_endpoints = vec![" https://other.rpc ".to_string(), String::new()];
        let config = raw.resolve().unwrap();

        assert_eq!(config.wallets[0].budget.claim_interval, 5);
        assert_eq!(config.wallets[1].budget.claim_interval, 2);
        assert_eq!(
            config.wallets[1].already_burned,
            U256::from(10_000_000_000_000_000u64)
        );
        assert_eq!(config.wallets[1].rpc_endpoints, vec!["https://other.rpc"]);
    }

    #[test]
    fn already_burned_cannot_exceed_budget() {
        let mut raw = raw_with_keys(&[KEY_1]);
        raw.wallets[0].already_burned = Some(EtherAmount::parse("1").unwrap());
        assert!(invalid_message(raw).contains("already_burned"));
    }

    #[test]
    fn missing_rpc_is_a_chain_error() {
        let mut raw = raw_with_keys(&[KEY_1]);
        raw.chain.rpc_endpoints.clear();
        assert!(matches!(raw.resolve(), Err(ConfigError::Chain(_))));
    }
}
