use std::{
    fmt,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use worm_blockchain::{
    FarmChain, GasPriceGuard, U256, WalletBalances, format_ether_trimmed, short_address,
    wei_to_eth_f64,
};
use worm_observability as observability;
use worm_prover::ProverFailoverPool;

use super::{
    balance::BalanceTracker,
    budget::FarmingBudget,
    burn::{BurnDecision, BurnDecisionEngine, BurnExecutor, BurnLedger, SkipReason},
    claim::{ClaimResult, ClaimScheduler},
    epoch::{EpochCommitment, EpochParticipationEngine},
    error::{CycleStep, StepError},
};
use crate::periodic::{PeriodicTask, run_with_shutdown};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FarmerState {
    Idle,
    CheckingBalance,
    Burning,
    Participating,
    ClaimingIfDue,
    Sleeping,
    Stopped,
}

impl FarmerState {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            FarmerState::Idle => "idle",
            FarmerState::CheckingBalance => "checking_balance",
            FarmerState::Burning => "burning",
            FarmerState::Participating => "participating",
            FarmerState::ClaimingIfDue => "claiming_if_due",
            FarmerState::Sleeping => "sleeping",
            FarmerState::Stopped => "stopped",
        }
    }
}

/// Per-wallet knobs resolved from configuration.
#[derive(Debug, Clone)]
pub(crate) struct FarmerSettings {
    pub budget: FarmingBudget,
    pub burn_fee: U256,
    /// Native balance kept back for gas after a burn.
    pub min_gas_reserve: U256,
    /// BETH allowance granted per approval.
    pub approval_amount: U256,
    pub already_burned: U256,
    pub loop_interval: Duration,
    pub max_consecutive_failures: u32,
    pub claim_on_shutdown: bool,
    pub shutdown_claim_timeout: Duration,
}

/// Services shared by every wallet.
#[derive(Clone)]
pub(crate) struct SharedServices {
    pub pool: Arc<ProverFailoverPool>,
    pub gas: Arc<GasPriceGuard>,
    pub network: String,
    pub pow_zero_bytes: usize,
}

/// Counters reported at shutdown.
#[derive(Debug, Clone)]
pub(crate) struct WalletSummary {
    pub ordinal: usize,
    pub label: String,
    pub state: FarmerState,
    pub cycles: u64,
    pub burns: u64,
    pub participations: u64,
    pub claims: u64,
    pub cumulative_burned: U256,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub last_cycle_at: Option<DateTime<Utc>>,
}

/// Read side of a farmer's counters, shared with the runtime.
pub(crate) type SummaryHandle = Arc<Mutex<WalletSummary>>;

pub(crate) fn read_summary(handle: &SummaryHandle) -> WalletSummary {
    handle.lock().unwrap_or_else(|e| e.into_inner()).clone()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeferReason {
    /// The gas guard rejected the quote for `step`.
    GasRejected(CycleStep),
    /// Native balance would drop below the gas reserve.
    InsufficientEth { needed: U256, available: U256 },
    /// Not enough BETH for one epoch and nothing was burned.
    InsufficientBeth { needed: U256, available: U256 },
}

impl fmt::Display for DeferReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeferReason::GasRejected(step) => write!(f, "gas rejected at {step} step"),
            DeferReason::InsufficientEth { needed, available } => write!(
                f,
                "ETH balance {} below burn plus gas reserve {}",
                format_ether_trimmed(*available),
                format_ether_trimmed(*needed)
            ),
            DeferReason::InsufficientBeth { needed, available } => write!(
                f,
                "BETH balance {} below one epoch {}",
                format_ether_trimmed(*available),
                format_ether_trimmed(*needed)
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CycleReport {
    pub burned: Option<U256>,
    pub commitment: Option<EpochCommitment>,
    pub claim: Option<ClaimResult>,
}

#[derive(Debug)]
pub(crate) enum CycleOutcome {
    Completed(CycleReport),
    Deferred(DeferReason),
    Failed(StepError),
}

impl CycleOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::Completed(_) => "success",
            CycleOutcome::Deferred(_) => "deferred",
            CycleOutcome::Failed(_) => "failed",
        }
    }
}

enum Interrupt {
    Deferred(DeferReason),
    Failed(StepError),
}

impl From<StepError> for Interrupt {
    fn from(err: StepError) -> Self {
        if err.error.is_deferral() {
            Interrupt::Deferred(DeferReason::GasRejected(err.step))
        } else {
            Interrupt::Failed(err)
        }
    }
}

/// One wallet's farming loop.
pub(crate) struct WalletFarmer {
    ordinal: usize,
    label: String,
    chain: Arc<dyn FarmChain>,
    settings: FarmerSettings,

    balances: BalanceTracker,
    burn_engine: BurnDecisionEngine,
    burner: BurnExecutor,
    epochs: EpochParticipationEngine,
    claims: ClaimScheduler,

    ledger: BurnLedger,
    consecutive_failures: u32,
    summary: SummaryHandle,
}

impl WalletFarmer {
    pub(crate) fn new(
        ordinal: usize,
        chain: Arc<dyn FarmChain>,
        settings: FarmerSettings,
        services: SharedServices,
    ) -> Self {
        let label = short_address(&chain.address());
        let ledger = BurnLedger {
            cumulative_burned: settings.already_burned,
            pending_mint: None,
        };
        let summary = Arc::new(Mutex::new(WalletSummary {
            ordinal,
            label: label.clone(),
            state: FarmerState::Idle,
            cycles: 0,
            burns: 0,
            participations: 0,
            claims: 0,
            cumulative_burned: ledger.cumulative_burned,
            consecutive_failures: 0,
            last_error: None,
            last_cycle_at: None,
        }));

        Self {
            ordinal,
            label,
            balances: BalanceTracker::new(Arc::clone(&chain)),
            burn_engine: BurnDecisionEngine::new(
                settings.budget.beth_per_epoch,
                settings.burn_fee,
            ),
            burner: BurnExecutor::new(
                services.pool,
                Arc::clone(&services.gas),
                services.network,
                services.pow_zero_bytes,
            ),
            epochs: EpochParticipationEngine::new(
                Arc::clone(&services.gas),
                settings.approval_amount,
            ),
            claims: ClaimScheduler::new(settings.budget.claim_interval, services.gas),
            chain,
            settings,
            ledger,
            consecutive_failures: 0,
            summary,
        }
    }

    pub(crate) fn summary_handle(&self) -> SummaryHandle {
        Arc::clone(&self.summary)
    }

    /// Cycles until `shutdown` fires (or `max_cycles` ran), then claims once more if
    /// configured to.
    pub(crate) async fn run(mut self, shutdown: CancellationToken, max_cycles: Option<u64>) {
        tracing::info!(
            wallet = self.ordinal,
            address = %self.label,
            interval_secs = self.settings.loop_interval.as_secs(),
            "Wallet farmer started"
        );
        run_with_shutdown(&mut self, &shutdown, max_cycles).await;

        if shutdown.is_cancelled() {
            self.claim_on_shutdown().await;
        }
        self.set_state(FarmerState::Stopped);
        tracing::info!(wallet = self.ordinal, address = %self.label, "Wallet farmer stopped");
    }

    async fn claim_on_shutdown(&mut self) {
        if !self.settings.claim_on_shutdown || !self.claims.has_unclaimed() {
            return;
        }
        self.set_state(FarmerState::ClaimingIfDue);
        tracing::info!(
            wallet = self.ordinal,
            address = %self.label,
            participations_since_claim = self.claims.participations_since_claim(),
            "Claiming before shutdown"
        );

        let timeout = self.settings.shutdown_claim_timeout;
        let claim = self.claims.claim_all(self.chain.as_ref(), &self.label);
        match tokio::time::timeout(timeout, claim).await {
            Ok(Ok(result)) => {
                if result.tx_hash.is_some() {
                    self.update_summary(|s| s.claims += 1);
                }
            }
            Ok(Err(err)) => {
                tracing::error!(
                    wallet = self.ordinal,
                    address = %self.label,
                    step = %err.step,
                    kind = err.error.kind(),
                    error = %err,
                    "Shutdown claim failed"
                );
                self.update_summary(|s| s.last_error = Some(err.to_string()));
            }
            Err(_) => tracing::warn!(
                wallet = self.ordinal,
                address = %self.label,
                timeout_secs = timeout.as_secs(),
                "Shutdown claim timed out"
            ),
        }
    }

    /// One pass of balance, burn, participate and claim. Never panics on step errors.
    #[tracing::instrument(
        name = "farmer.cycle",
        skip(self),
        fields(wallet = self.ordinal, address = %self.label)
    )]
    pub(crate) async fn run_cycle(&mut self) -> CycleOutcome {
        let started = Instant::now();
        let mut report = CycleReport::default();

        let mut result = self.cycle_steps(&mut report).await;
        // A due claim is retried every cycle, whether or not this cycle participated.
        if self.claims.is_due() {
            let claimed = self.claim_due(&mut report).await;
            if result.is_ok() {
                result = claimed;
            } else {
                match claimed {
                    Ok(()) => {}
                    Err(Interrupt::Deferred(reason)) => {
                        tracing::info!(reason = %reason, "Due claim deferred");
                    }
                    Err(Interrupt::Failed(err)) => tracing::error!(
                        step = %err.step,
                        kind = err.error.kind(),
                        error = %err,
                        "Due claim failed, retrying next cycle"
                    ),
                }
            }
        }

        let outcome = match result {
            Ok(()) => CycleOutcome::Completed(report),
            Err(Interrupt::Deferred(reason)) => CycleOutcome::Deferred(reason),
            Err(Interrupt::Failed(err)) => CycleOutcome::Failed(err),
        };
        self.finish_cycle(&outcome, started.elapsed());
        outcome
    }

    async fn cycle_steps(&mut self, report: &mut CycleReport) -> Result<(), Interrupt> {
        self.set_state(FarmerState::CheckingBalance);
        let mut balances = self.balances.refresh().await?;
        tracing::info!(
            eth = %format_ether_trimmed(balances.eth),
            beth = %format_ether_trimmed(balances.beth),
            worm = %format_ether_trimmed(balances.worm),
            "Balances"
        );

        if self.ledger.pending_mint.is_some() {
            self.set_state(FarmerState::Burning);
            tracing::info!("Retrying pending mint");
            self.burner
                .mint_pending(self.chain.as_ref(), &self.label, &mut self.ledger)
                .await?;
            balances = self.balances.refresh().await?;
        }

        self.set_state(FarmerState::Burning);
        if let Some(burned) = self.burn_if_needed(&balances).await? {
            report.burned = Some(burned);
            balances = self.balances.refresh().await?;
        }

        self.set_state(FarmerState::Participating);
        let per_epoch = self.settings.budget.beth_per_epoch;
        if balances.beth < per_epoch {
            return Err(Interrupt::Deferred(DeferReason::InsufficientBeth {
                needed: per_epoch,
                available: balances.beth,
            }));
        }
        let commitment = self
            .epochs
            .participate_one_epoch(self.chain.as_ref(), &self.label, per_epoch)
            .await?;
        self.claims.record_participation(commitment.epoch);
        self.update_summary(|s| s.participations += 1);
        report.commitment = Some(commitment);

        Ok(())
    }

    async fn claim_due(&mut self, report: &mut CycleReport) -> Result<(), Interrupt> {
        self.set_state(FarmerState::ClaimingIfDue);
        let claim = self.claims.claim_all(self.chain.as_ref(), &self.label).await?;
        if claim.tx_hash.is_some() {
            self.update_summary(|s| s.claims += 1);
        }
        report.claim = Some(claim);
        Ok(())
    }

    async fn burn_if_needed(&mut self, balances: &WalletBalances) -> Result<Option<U256>, Interrupt> {
        let remaining = self
            .settings
            .budget
            .remaining(self.ledger.cumulative_burned);
        let amount = match self.burn_engine.decide(balances.beth, remaining) {
            BurnDecision::Burn { amount } => amount,
            BurnDecision::Skip(SkipReason::SufficientBeth) => {
                tracing::info!("Sufficient BETH for this epoch, skipping burn");
                return Ok(None);
            }
            BurnDecision::Skip(SkipReason::BudgetExhausted) => {
                tracing::info!(
                    total_budget_eth = %format_ether_trimmed(self.settings.budget.total_eth_budget),
                    "Burn budget exhausted, participating on existing BETH only"
                );
                return Ok(None);
            }
            BurnDecision::Skip(SkipReason::BelowBurnFee) => {
                tracing::info!(
                    remaining_eth = %format_ether_trimmed(remaining),
                    "Remaining budget does not cover the burn fee, skipping burn"
                );
                return Ok(None);
            }
        };

        let needed = amount.saturating_add(self.settings.min_gas_reserve);
        if balances.eth < needed {
            return Err(Interrupt::Deferred(DeferReason::InsufficientEth {
                needed,
                available: balances.eth,
            }));
        }

        let spend = self.burn_engine.spend(amount);
        let burned_before = self.ledger.cumulative_burned;
        let result = self
            .burner
            .burn(self.chain.as_ref(), &self.label, &mut self.ledger, amount, spend)
            .await;
        // The transfer may have confirmed even when the mint failed.
        let cumulative = self.ledger.cumulative_burned;
        self.update_summary(|s| s.cumulative_burned = cumulative);
        if result.is_err() && cumulative == burned_before {
            observability::record_burn(&self.label, "failed", wei_to_eth_f64(amount));
        }
        result?;

        self.update_summary(|s| s.burns += 1);
        Ok(Some(amount))
    }

    fn finish_cycle(&mut self, outcome: &CycleOutcome, elapsed: Duration) {
        match outcome {
            CycleOutcome::Completed(report) => {
                self.consecutive_failures = 0;
                tracing::info!(
                    burned_eth = ?report.burned.map(format_ether_trimmed),
                    epoch = ?report.commitment.map(|c| c.epoch),
                    claimed_worm = ?report.claim.map(|c| format_ether_trimmed(c.amount_claimed)),
                    participations_since_claim = self.claims.participations_since_claim(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Cycle completed"
                );
            }
            CycleOutcome::Deferred(reason) => {
                tracing::info!(reason = %reason, "Cycle deferred, retrying next cycle");
            }
            CycleOutcome::Failed(err) => {
                self.consecutive_failures += 1;
                tracing::error!(
                    step = %err.step,
                    kind = err.error.kind(),
                    error = %err,
                    consecutive_failures = self.consecutive_failures,
                    "Cycle failed, retrying next cycle"
                );
                if self.consecutive_failures >= self.settings.max_consecutive_failures {
                    tracing::error!(
                        consecutive_failures = self.consecutive_failures,
                        threshold = self.settings.max_consecutive_failures,
                        "Wallet keeps failing; check RPC, prover and balances"
                    );
                }
            }
        }
        observability::record_cycle(&self.label, outcome.as_str(), elapsed);

        if let Some(balances) = self.balances.last() {
            observability::record_wallet_snapshot(
                &self.label,
                wei_to_eth_f64(balances.eth),
                wei_to_eth_f64(balances.beth),
                wei_to_eth_f64(balances.worm),
                wei_to_eth_f64(self.ledger.cumulative_burned),
                self.consecutive_failures,
            );
        }

        let consecutive_failures = self.consecutive_failures;
        let last_error = match outcome {
            CycleOutcome::Failed(err) => Some(err.to_string()),
            _ => None,
        };
        self.update_summary(|s| {
            s.cycles += 1;
            s.consecutive_failures = consecutive_failures;
            s.last_cycle_at = Some(Utc::now());
            if last_error.is_some() {
                s.last_error = last_error;
            }
        });
    }

    /// Whether an error from the last cycle can never clear up.
    fn is_stuck(outcome: &CycleOutcome) -> bool {
        matches!(outcome, CycleOutcome::Failed(err) if err.error.is_fatal())
    }

    fn set_state(&self, state: FarmerState) {
        tracing::trace!(state = state.as_str(), "Farmer state");
        self.update_summary(|s| s.state = state);
    }

    fn update_summary(&self, f: impl FnOnce(&mut WalletSummary)) {
        f(&mut self.summary.lock().unwrap_or_else(|e| e.into_inner()));
    }
}

impl PeriodicTask for WalletFarmer {
    fn name(&self) -> &'static str {
        "wallet_farmer"
    }

    async fn run_once(&mut self) -> Option<Duration> {
        let outcome = self.run_cycle().await;
        if Self::is_stuck(&outcome) {
            tracing::error!(
                wallet = self.ordinal,
                address = %self.label,
                "Unrecoverable error, stopping this wallet"
            );
            return None;
        }
        self.set_state(FarmerState::Sleeping);
        Some(self.settings.loop_interval)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use worm_blockchain::ChainCall;

    use super::*;
    use crate::farming::{
        error::CycleError,
        testing::{
            FakeChain, FakeFailure, FakeProver, gas_guard, milli_eth, pool_of, tenth_milli_eth,
        },
    };

    fn settings() -> FarmerSettings {
        FarmerSettings {
            budget: FarmingBudget {
                total_eth_budget: milli_eth(10),
                beth_per_epoch: milli_eth(1),
                claim_interval: 2,
            },
            burn_fee: U256::ZERO,
            min_gas_reserve: milli_eth(10),
            approval_amount: milli_eth(10),
            already_burned: U256::ZERO,
            loop_interval: Duration::from_secs(600),
            max_consecutive_failures: 3,
            claim_on_shutdown: true,
            shutdown_claim_timeout: Duration::from_secs(60),
        }
    }

    fn farmer(chain: &Arc<FakeChain>, settings: FarmerSettings) -> WalletFarmer {
        WalletFarmer::new(
            1,
            chain.clone(),
            settings,
            SharedServices {
                pool: pool_of(&[FakeProver::new("p", true)]),
                gas: gas_guard(),
                network: "sepolia".to_string(),
                pow_zero_bytes: 1,
            },
        )
    }

    fn balances(eth: U256, beth: U256) -> WalletBalances {
        WalletBalances {
            eth,
            beth,
            worm: U256::ZERO,
        }
    }

    #[tokio::test]
    async fn tops_up_then_participates() {
        let chain = FakeChain::new(balances(milli_eth(100), tenth_milli_eth(5)));
        let mut farmer = farmer(&chain, settings());

        let CycleOutcome::Completed(report) = farmer.run_cycle().await else {
            panic!("cycle did not complete");
        };

        assert_eq!(report.burned, Some(tenth_milli_eth(5)));
        assert_eq!(report.commitment.unwrap().epoch, 10);
        assert!(report.claim.is_none());
        assert_eq!(
            chain.submitted_operations(),
            vec!["burn_transfer", "mint_coin", "participate"]
        );
        assert_eq!(chain.balances_now().beth, U256::ZERO);
        let summary = read_summary(&farmer.summary_handle());
        assert_eq!((summary.burns, summary.participations), (1, 1));
        assert_eq!(summary.cumulative_burned, tenth_milli_eth(5));
    }

    #[tokio::test]
    async fn sufficient_beth_skips_the_burn() {
        let chain = FakeChain::new(balances(milli_eth(100), milli_eth(2)));
        let mut farmer = farmer(&chain, settings());

        assert!(matches!(
            farmer.run_cycle().await,
            CycleOutcome::Completed(CycleReport { burned: None, .. })
        ));
        assert_eq!(chain.submitted_operations(), vec!["participate"]);
    }

    #[tokio::test]
    async fn low_eth_defers_without_counting_a_failure() {
        let chain = FakeChain::new(balances(milli_eth(5), U256::ZERO));
        let mut farmer = farmer(&chain, settings());

        assert!(matches!(
            farmer.run_cycle().await,
            CycleOutcome::Deferred(DeferReason::InsufficientEth { .. })
        ));
        assert!(chain.submitted_operations().is_empty());
        assert_eq!(farmer.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn exhausted_budget_still_participates_on_existing_beth() {
        let chain = FakeChain::new(balances(milli_eth(100), milli_eth(1)));
        let mut settings = settings();
        settings.already_burned = milli_eth(10);
        let mut farmer = farmer(&chain, settings);

        assert!(matches!(farmer.run_cycle().await, CycleOutcome::Completed(_)));
        assert_eq!(chain.submitted_operations(), vec!["participate"]);

        // Without BETH and without budget the cycle defers.
        assert!(matches!(
            farmer.run_cycle().await,
            CycleOutcome::Deferred(DeferReason::InsufficientBeth { .. })
        ));
    }

    #[tokio::test]
    async fn claims_every_interval_participations() {
        let chain = FakeChain::new(balances(milli_eth(100), milli_eth(5)));
        let mut farmer = farmer(&chain, settings());

        farmer.run_cycle().await;
        chain.with(|s| s.epoch += 1);
        let CycleOutcome::Completed(report) = farmer.run_cycle().await else {
            panic!("cycle did not complete");
        };

        let claim = report.claim.unwrap();
        assert_eq!((claim.starting_epoch, claim.num_epochs), (10, 1));
        assert_eq!(
            chain.submitted_operations(),
            vec!["participate", "participate", "claim"]
        );
        assert_eq!(read_summary(&farmer.summary_handle()).claims, 1);
    }

    #[tokio::test]
    async fn due_claim_is_retried_when_participation_defers() {
        let chain = FakeChain::new(balances(milli_eth(100), milli_eth(2)));
        chain.fail_next("claim", FakeFailure::Revert);
        let mut settings = settings();
        settings.already_burned = settings.budget.total_eth_budget;
        let mut farmer = farmer(&chain, settings);

        assert!(matches!(farmer.run_cycle().await, CycleOutcome::Completed(_)));
        chain.with(|s| s.epoch += 1);
        let CycleOutcome::Failed(err) = farmer.run_cycle().await else {
            panic!("claim should fail");
        };
        assert_eq!(err.step, CycleStep::Claim);
        assert!(farmer.claims.is_due());

        // No BETH and no budget left: participation defers but the claim still goes out.
        chain.with(|s| s.epoch += 1);
        assert!(matches!(
            farmer.run_cycle().await,
            CycleOutcome::Deferred(DeferReason::InsufficientBeth { .. })
        ));
        assert_eq!(
            chain.submitted_operations(),
            vec!["participate", "participate", "claim"]
        );
        assert_eq!(
            chain.with(|s| s.submitted[2].clone()),
            ChainCall::Claim {
                starting_epoch: U256::from(10u64),
                num_epochs: U256::from(2u64)
            }
        );
        assert!(!farmer.claims.is_due());
        assert_eq!(read_summary(&farmer.summary_handle()).claims, 1);
    }

    #[tokio::test]
    async fn due_claim_is_retried_when_participation_reverts() {
        let chain = FakeChain::new(balances(milli_eth(100), milli_eth(5)));
        chain.fail_next("claim", FakeFailure::Revert);
        let mut farmer = farmer(&chain, settings());

        farmer.run_cycle().await;
        chain.with(|s| s.epoch += 1);
        assert!(matches!(farmer.run_cycle().await, CycleOutcome::Failed(_)));

        chain.fail_next("participate", FakeFailure::Revert);
        let CycleOutcome::Failed(err) = farmer.run_cycle().await else {
            panic!("participation should fail");
        };
        assert_eq!(err.step, CycleStep::Participate);
        assert_eq!(
            chain.submitted_operations(),
            vec!["participate", "participate", "claim"]
        );
        assert_eq!(farmer.claims.participations_since_claim(), 0);
    }

    #[tokio::test]
    async fn failures_are_counted_and_reset_on_success() {
        let chain = FakeChain::new(balances(milli_eth(100), milli_eth(5)));
        chain.with(|s| s.balance_failures = 2);
        let mut farmer = farmer(&chain, settings());

        for expected in 1..=2 {
            let CycleOutcome::Failed(err) = farmer.run_cycle().await else {
                panic!("cycle should fail");
            };
            assert_eq!(err.step, CycleStep::Balance);
            assert!(matches!(err.error, CycleError::NetworkTimeout(_)));
            assert_eq!(farmer.consecutive_failures, expected);
        }

        assert!(matches!(farmer.run_cycle().await, CycleOutcome::Completed(_)));
        let summary = read_summary(&farmer.summary_handle());
        assert_eq!(summary.consecutive_failures, 0);
        assert_eq!(summary.cycles, 3);
        assert!(summary.last_error.unwrap().contains("balance step failed"));
    }

    #[tokio::test]
    async fn epoch_revert_fails_the_cycle_only() {
        let chain = FakeChain::new(balances(milli_eth(100), milli_eth(5)));
        chain.fail_next("participate", FakeFailure::Revert);
        let mut farmer = farmer(&chain, settings());

        let CycleOutcome::Failed(err) = farmer.run_cycle().await else {
            panic!("cycle should fail");
        };
        assert!(matches!(err.error, CycleError::EpochReverted(_)));
        assert_eq!(farmer.claims.participations_since_claim(), 0);

        assert!(matches!(farmer.run_cycle().await, CycleOutcome::Completed(_)));
        assert_eq!(farmer.claims.participations_since_claim(), 1);
    }

    #[tokio::test]
    async fn gas_rejection_is_a_deferral() {
        let chain = FakeChain::new(balances(milli_eth(100), milli_eth(5)));
        chain.with(|s| s.fees.priority_fee_per_gas = 200 * worm_blockchain::WEI_PER_GWEI);
        let mut farmer = farmer(&chain, settings());

        assert!(matches!(
            farmer.run_cycle().await,
            CycleOutcome::Deferred(DeferReason::GasRejected(CycleStep::Participate))
        ));
        assert_eq!(farmer.consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn single_cycle_run_stops_without_shutdown_claim() {
        let chain = FakeChain::new(balances(milli_eth(100), milli_eth(5)));
        let farmer = farmer(&chain, settings());
        let summary = farmer.summary_handle();

        farmer.run(CancellationToken::new(), Some(1)).await;

        let summary = read_summary(&summary);
        assert_eq!(summary.cycles, 1);
        assert_eq!(summary.state, FarmerState::Stopped);
        assert_eq!(chain.submitted_operations(), vec!["participate"]);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_claims_completed_epochs() {
        let chain = FakeChain::new(balances(milli_eth(100), milli_eth(5)));
        let mut farmer = farmer(&chain, settings());
        farmer.run_cycle().await;
        chain.with(|s| s.epoch += 1);

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let summary = farmer.summary_handle();
        farmer.run(shutdown, None).await;

        assert_eq!(chain.submitted_operations(), vec!["participate", "claim"]);
        assert_eq!(read_summary(&summary).claims, 1);
    }
}
