//! Gas admission control for every farmer transaction.
//!
//! A [`GasQuote`] is derived fresh for each submission: the network's suggested
//! priority fee gets a percentage buffer, the base fee gets headroom for the next
//! few blocks, and the payload's gas estimate gets its own buffer. [`GasPriceGuard::admit`]
//! then applies the hard caps. The fee ceiling is checked on the buffered value.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::BlockchainError,
    farm_chain::FarmChain,
    types::{ChainCall, FeeEstimate},
};

pub const WEI_PER_GWEI: u128 = 1_000_000_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GasPolicy {
    /// Added on top of the suggested priority fee (20 = +20%).
    pub priority_fee_buffer_percent: u32,
    /// Base fee is scaled to this percentage when computing the max fee (100 = as-is).
    pub base_fee_headroom_percent: u32,
    /// Hard ceiling for the max fee per gas, in gwei.
    pub max_fee_per_gas_gwei: u64,
    /// Added on top of `eth_estimateGas` (20 = +20%).
    pub gas_limit_buffer_percent: u32,
    /// Hard cap on the buffered gas limit.
    pub max_gas_limit: u64,
    /// Bump applied when a node rejects a submission as underpriced (20 = +20%).
    pub bump_percent: u32,
}

impl Default for GasPolicy {
    fn default() -> Self {
        Self {
            priority_fee_buffer_percent: 20,
            base_fee_headroom_percent: 125,
            max_fee_per_gas_gwei: 100,
            gas_limit_buffer_percent: 20,
            max_gas_limit: 2_000_000,
            bump_percent: 20,
        }
    }
}

impl GasPolicy {
    pub fn max_fee_ceiling_wei(&self) -> u128 {
        u128::from(self.max_fee_per_gas_gwei).saturating_mul(WEI_PER_GWEI)
    }
}

/// Fee and limit for one transaction attempt. Never reused across cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasQuote {
    pub base_fee_per_gas: Option<u128>,
    pub suggested_priority_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
    pub max_fee_per_gas: u128,
    pub gas_limit: u64,
}

impl GasQuote {
    pub fn compute(policy: &GasPolicy, fees: &FeeEstimate, gas_estimate: u64) -> Self {
        let max_priority_fee_per_gas =
            scale_percent(fees.priority_fee_per_gas, 100 + policy.priority_fee_buffer_percent);
        let base_component = fees
            .base_fee_per_gas
            .map(|base| scale_percent(base, policy.base_fee_headroom_percent))
            .unwrap_or(0);
        let gas_limit = scale_percent(
            u128::from(gas_estimate),
            100 + policy.gas_limit_buffer_percent,
        );

        Self {
            base_fee_per_gas: fees.base_fee_per_gas,
            suggested_priority_fee_per_gas: fees.priority_fee_per_gas,
            max_priority_fee_per_gas,
            max_fee_per_gas: base_component.saturating_add(max_priority_fee_per_gas),
            gas_limit: u64::try_from(gas_limit).unwrap_or(u64::MAX),
        }
    }

    /// Legacy chains take a single gas price, which is the max fee.
    pub fn is_legacy(&self) -> bool {
        self.base_fee_per_gas.is_none()
    }

    /// Fee-bumped copy for resubmission, or `None` if the bump would break the ceiling.
    pub fn bumped(&self, policy: &GasPolicy) -> Option<Self> {
        let factor = 100 + policy.bump_percent;
        let max_fee_per_gas = scale_percent(self.max_fee_per_gas, factor);
        let max_priority_fee_per_gas =
            scale_percent(self.max_priority_fee_per_gas, factor).min(max_fee_per_gas);

        (max_fee_per_gas <= policy.max_fee_ceiling_wei()).then_some(Self {
            max_fee_per_gas,
            max_priority_fee_per_gas,
            ..*self
        })
    }

    pub fn max_fee_gwei(&self) -> f64 {
        self.max_fee_per_gas as f64 / WEI_PER_GWEI as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GasRejection {
    MaxFeeAboveCeiling { max_fee_per_gas: u128, ceiling: u128 },
    GasLimitAboveCap { gas_limit: u64, cap: u64 },
}

impl fmt::Display for GasRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GasRejection::MaxFeeAboveCeiling {
                max_fee_per_gas,
                ceiling,
            } => write!(
                f,
                "max fee {:.2} gwei exceeds ceiling {:.2} gwei",
                *max_fee_per_gas as f64 / WEI_PER_GWEI as f64,
                *ceiling as f64 / WEI_PER_GWEI as f64
            ),
            GasRejection::GasLimitAboveCap { gas_limit, cap } => {
                write!(f, "gas limit {gas_limit} exceeds cap {cap}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GasAdmission {
    Allowed,
    Rejected(GasRejection),
}

/// Shared by every wallet; holds only the immutable policy.
#[derive(Debug, Clone)]
pub struct GasPriceGuard {
    policy: GasPolicy,
}

impl GasPriceGuard {
    pub fn new(policy: GasPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &GasPolicy {
        &self.policy
    }

    /// Fetch current fees and the payload's gas estimate from `chain`.
    pub async fn quote(
        &self,
        chain: &dyn FarmChain,
        call: &ChainCall,
    ) -> Result<GasQuote, BlockchainError> {
        let fees = chain.fee_estimate().await?;
        let gas_estimate = chain.estimate_gas(call).await?;
        Ok(GasQuote::compute(&self.policy, &fees, gas_estimate))
    }

    pub fn admit(&self, quote: &GasQuote) -> GasAdmission {
        let ceiling = self.policy.max_fee_ceiling_wei();
        if quote.max_fee_per_gas > ceiling {
            return GasAdmission::Rejected(GasRejection::MaxFeeAboveCeiling {
                max_fee_per_gas: quote.max_fee_per_gas,
                ceiling,
            });
        }
        if quote.gas_limit > self.policy.max_gas_limit {
            return GasAdmission::Rejected(GasRejection::GasLimitAboveCap {
                gas_limit: quote.gas_limit,
                cap: self.policy.max_gas_limit,
            });
        }
        GasAdmission::Allowed
    }
}

/// `value * percent / 100`, rounded up.
fn scale_percent(value: u128, percent: u32) -> u128 {
    value
        .saturating_mul(u128::from(percent))
        .div_ceil(100)
}
