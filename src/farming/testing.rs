//! Scripted chain and prover fakes shared by the farming tests.

#![allow(clippy::unwrap_used)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use worm_blockchain::{
    Address, B256, BlockchainError, ChainCall, EpochInfo, FarmChain, FeeEstimate, GasPolicy,
    GasPriceGuard, GasQuote, TxOutcome, U256, WEI_PER_GWEI, WalletBalances,
};
use worm_prover::{
    FieldElement, Groth16Proof, ProofArtifact, ProofBackend, ProofRequest, ProverError,
    ProverFailoverPool,
};

pub(crate) const WALLET: Address = Address::new([0xAA; 20]);
pub(crate) const BURN_ADDRESS: Address = Address::new([0xBB; 20]);

/// `value` thousandths of an ether, in wei.
pub(crate) fn milli_eth(value: u64) -> U256 {
    U256::from(value) * U256::from(1_000_000_000_000_000u64)
}

/// `value` tenths of a thousandth of an ether (0.0001 ETH units), in wei.
pub(crate) fn tenth_milli_eth(value: u64) -> U256 {
    U256::from(value) * U256::from(100_000_000_000_000u64)
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum FakeFailure {
    Revert,
    Timeout,
}

impl FakeFailure {
    fn into_error(self, operation: &'static str) -> BlockchainError {
        match self {
            FakeFailure::Revert => BlockchainError::Reverted {
                operation,
                tx_hash: Some(B256::repeat_byte(0xEE)),
                reason: Some("scripted revert".to_string()),
            },
            FakeFailure::Timeout => BlockchainError::Timeout {
                operation,
                timeout: Duration::from_secs(30),
            },
        }
    }
}

pub(crate) struct FakeState {
    pub balances: WalletBalances,
    pub allowance: U256,
    pub epoch: u64,
    pub fees: FeeEstimate,
    pub gas_estimate: u64,
    pub balance_failures: usize,
    pub submit_failures: HashMap<&'static str, VecDeque<FakeFailure>>,
    /// WORM credited per claimed epoch.
    pub reward_per_epoch: U256,
    pub submitted: Vec<ChainCall>,
}

/// In-memory chain that applies each confirmed call to its balances.
pub(crate) struct FakeChain {
    state: Mutex<FakeState>,
}

impl FakeChain {
    pub(crate) fn new(balances: WalletBalances) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                balances,
                allowance: U256::MAX,
                epoch: 10,
                fees: FeeEstimate {
                    base_fee_per_gas: Some(10 * WEI_PER_GWEI),
                    priority_fee_per_gas: 2 * WEI_PER_GWEI,
                },
                gas_estimate: 100_000,
                balance_failures: 0,
                submit_failures: HashMap::new(),
                reward_per_epoch: milli_eth(1),
                submitted: Vec::new(),
            }),
        })
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub(crate) fn fail_next(&self, operation: &'static str, failure: FakeFailure) {
        self.with(|s| {
            s.submit_failures
                .entry(operation)
                .or_default()
                .push_back(failure)
        });
    }

    pub(crate) fn submitted_operations(&self) -> Vec<&'static str> {
        self.with(|s| s.submitted.iter().map(ChainCall::operation).collect())
    }

    pub(crate) fn balances_now(&self) -> WalletBalances {
        self.with(|s| s.balances)
    }
}

#[async_trait]
impl FarmChain for FakeChain {
    fn address(&self) -> Address {
        WALLET
    }

    async fn balances(&self) -> Result<WalletBalances, BlockchainError> {
        self.with(|s| {
            if s.balance_failures > 0 {
                s.balance_failures -= 1;
                return Err(FakeFailure::Timeout.into_error("get_balance"));
            }
            Ok(s.balances)
        })
    }

    async fn worm_balance(&self) -> Result<U256, BlockchainError> {
        Ok(self.with(|s| s.balances.worm))
    }

    async fn beth_allowance(&self) -> Result<U256, BlockchainError> {
        Ok(self.with(|s| s.allowance))
    }

    async fn epoch_info(&self) -> Result<EpochInfo, BlockchainError> {
        Ok(self.with(|s| EpochInfo {
            current_epoch: s.epoch,
            remaining_secs: 300,
        }))
    }

    async fn fee_estimate(&self) -> Result<FeeEstimate, BlockchainError> {
        Ok(self.with(|s| s.fees))
    }

    async fn estimate_gas(&self, _call: &ChainCall) -> Result<u64, BlockchainError> {
        Ok(self.with(|s| s.gas_estimate))
    }

    async fn submit(
        &self,
        call: &ChainCall,
        _quote: &GasQuote,
    ) -> Result<TxOutcome, BlockchainError> {
        self.with(|s| {
            let operation = call.operation();
            if let Some(failure) = s
                .submit_failures
                .get_mut(operation)
                .and_then(VecDeque::pop_front)
            {
                return Err(failure.into_error(operation));
            }

            match call {
                ChainCall::BurnTransfer { amount, .. } => {
                    s.balances.eth = s.balances.eth.saturating_sub(*amount)
                }
                ChainCall::MintCoin(args) => s.balances.beth += args.revealed_amount,
                ChainCall::ApproveBeth { amount } => s.allowance = *amount,
                ChainCall::Participate {
                    amount_per_epoch,
                    num_epochs,
                } => {
                    let total = *amount_per_epoch * *num_epochs;
                    s.balances.beth = s.balances.beth.saturating_sub(total);
                    s.allowance = s.allowance.saturating_sub(total);
                }
                ChainCall::Claim { num_epochs, .. } => {
                    s.balances.worm += s.reward_per_epoch * *num_epochs
                }
            }
            s.submitted.push(call.clone());
            Ok(TxOutcome {
                tx_hash: B256::with_last_byte(s.submitted.len() as u8),
                block_number: Some(1),
                gas_used: 21_000,
            })
        })
    }
}

/// Prover that answers with a valid artifact revealing the requested spend.
pub(crate) struct FakeProver {
    endpoint: String,
    healthy: bool,
    calls: AtomicUsize,
}

impl FakeProver {
    pub(crate) fn new(endpoint: &str, healthy: bool) -> Arc<Self> {
        Arc::new(Self {
            endpoint: endpoint.to_string(),
            healthy,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProofBackend for FakeProver {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn generate_proof(&self, request: &ProofRequest) -> Result<ProofArtifact, ProverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.healthy {
            return Err(ProverError::Status {
                endpoint: self.endpoint.clone(),
                status: 503,
            });
        }
        Ok(artifact_for(request))
    }

    async fn check_health(&self) -> bool {
        self.healthy
    }
}

pub(crate) fn artifact_for(request: &ProofRequest) -> ProofArtifact {
    let element = |v: u64| FieldElement(U256::from(v));
    ProofArtifact {
        burn_address: BURN_ADDRESS,
        proof: Groth16Proof {
            pi_a: vec![element(1), element(2), element(1)],
            pi_b: vec![
                vec![element(3), element(4)],
                vec![element(5), element(6)],
                vec![element(1), element(0)],
            ],
            pi_c: vec![element(7), element(8), element(1)],
        },
        block_number: U256::from(42u64),
        nullifier: U256::from(99u64),
        remaining_coin: U256::ZERO,
        broadcaster_fee: U256::ZERO,
        prover_fee: U256::ZERO,
        prover: Address::repeat_byte(0xCC),
        reveal_amount: request.spend,
        wallet_address: request.wallet_address,
    }
}

pub(crate) fn pool_of(provers: &[Arc<FakeProver>]) -> Arc<ProverFailoverPool> {
    Arc::new(ProverFailoverPool::new(
        provers
            .iter()
            .map(|p| p.clone() as Arc<dyn ProofBackend>)
            .collect(),
        3,
    ))
}

pub(crate) fn gas_guard() -> Arc<GasPriceGuard> {
    Arc::new(GasPriceGuard::new(GasPolicy::default()))
}
