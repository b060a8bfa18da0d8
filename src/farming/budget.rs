use worm_blockchain::U256;

/// Lifetime limits for one wallet. Immutable for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FarmingBudget {
    /// Base asset (wei) the wallet may ever burn.
    pub total_eth_budget: U256,
    /// BETH (wei) committed per epoch.
    pub beth_per_epoch: U256,
    /// Participations between claims.
    pub claim_interval: u32,
}

impl FarmingBudget {
    /// Budget left after `cumulative_burned`; zero once exhausted.
    pub(crate) fn remaining(&self, cumulative_burned: U256) -> U256 {
        self.total_eth_budget.saturating_sub(cumulative_burned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget() -> FarmingBudget {
        FarmingBudget {
            total_eth_budget: U256::from(100u64),
            beth_per_epoch: U256::from(10u64),
            claim_interval: 5,
        }
    }

    #[test]
    fn remaining_never_underflows() {
        assert_eq!(budget().remaining(U256::from(40u64)), U256::from(60u64));
        assert_eq!(budget().remaining(U256::from(100u64)), U256::ZERO);
        assert_eq!(budget().remaining(U256::from(150u64)), U256::ZERO);
        assert_eq!(budget().remaining(U256::from(99u64)), U256::from(1u64));
    }
}
