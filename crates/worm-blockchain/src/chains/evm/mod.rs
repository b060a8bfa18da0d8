mod contracts;
pub(crate) mod error_decode;
mod farm_chain;
mod provider;
mod rpc;

use std::{
    future::IntoFuture,
    time::{Duration, Instant},
};

use alloy::{
    network::TransactionBuilder,
    primitives::Address,
    providers::{PendingTransactionError, Provider, WatchTxError},
    rpc::types::TransactionRequest,
};
use tokio::sync::Mutex;
use worm_observability as observability;

use self::{contracts::Contracts, provider::BlockchainProvider};
use crate::{
    config::ChainConfig,
    error::BlockchainError,
    error_classification::should_bump_gas_price,
    gas::{GasPolicy, GasQuote},
    rpc_executor::{RetryPolicy, RetryableError, backoff_delay},
    rpc_rate_limiter::RpcRateLimiter,
    types::{ChainCall, TxOutcome},
    utils::short_address,
    wallets::{PrivateKey, wallet_from_private_key},
};

/// One wallet's signing connection to the chain.
///
/// Reads are rate limited, individually time-boxed and retried with backoff.
/// Submissions are serialized per wallet so nonces never race, and only return
/// once the receipt is in.
pub struct EvmChain {
    address: Address,
    label: String,
    provider: BlockchainProvider,
    contracts: Contracts,
    gas_policy: GasPolicy,
    rpc_timeout: Duration,
    tx_confirmations: u64,
    tx_receipt_timeout: Duration,
    rpc_rate_limiter: RpcRateLimiter,
    tx_mutex: Mutex<()>,
    rpc_retry_policy: RetryPolicy,
    tx_retry_policy: RetryPolicy,
}

impl EvmChain {
    /// Connects `private_key`'s wallet through `rpc_endpoints` (falling back to the
    /// shared endpoints when the wallet has no override).
    pub async fn connect(
        wallet_index: usize,
        config: &ChainConfig,
        rpc_endpoints: &[String],
        private_key: &PrivateKey,
    ) -> Result<Self, BlockchainError> {
        let wallet = wallet_from_private_key(wallet_index, private_key)?;
        let address = wallet.default_signer().address();
        let label = short_address(&address);

        let endpoints = if rpc_endpoints.is_empty() {
            config.rpc_endpoints.as_slice()
        } else {
            rpc_endpoints
        };
        let provider = provider::initialize_provider_with_wallet(endpoints, wallet).await?;
        let contracts = Contracts::new(
            &provider,
            config.beth_contract_address,
            config.worm_contract_address,
        );

        let rpc_rate_limiter = RpcRateLimiter::new(config.max_rpc_requests_per_second);
        tracing::info!(
            wallet = %label,
            wallet_index,
            rate_limited = rpc_rate_limiter.is_enabled(),
            max_fee_gwei = config.gas.max_fee_per_gas_gwei,
            "Chain connection ready"
        );

        Ok(Self {
            address,
            label,
            provider,
            contracts,
            gas_policy: config.gas.clone(),
            rpc_timeout: config.rpc_timeout(),
            tx_confirmations: config.tx_confirmations,
            tx_receipt_timeout: config.tx_receipt_timeout(),
            rpc_rate_limiter,
            tx_mutex: Mutex::new(()),
            rpc_retry_policy: RetryPolicy::reads(),
            tx_retry_policy: RetryPolicy::submissions(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Short address used in log lines and metric labels.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Execute a read with rate limiting, a per-attempt timeout and bounded retries.
    pub(crate) async fn rpc_call<T, E, F, O>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, BlockchainError>
    where
        E: RetryableError,
        F: FnMut() -> O,
        O: IntoFuture<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let mut attempt = 1;
        loop {
            self.rpc_rate_limiter.acquire().await;
            let (retryable, hint, error) =
                match tokio::time::timeout(self.rpc_timeout, call().into_future()).await {
                    Ok(Ok(value)) => {
                        observability::record_blockchain_rpc_call(
                            &self.label,
                            operation,
                            "ok",
                            started.elapsed(),
                        );
                        return Ok(value);
                    }
                    Ok(Err(err)) => (
                        err.is_retryable(),
                        err.backoff_hint(),
                        err.into_blockchain_error(operation),
                    ),
                    Err(_) => (
                        true,
                        None,
                        BlockchainError::Timeout {
                            operation,
                            timeout: self.rpc_timeout,
                        },
                    ),
                };

            if attempt >= self.rpc_retry_policy.max_attempts || !retryable {
                let status = if error.is_timeout() { "timeout" } else { "error" };
                observability::record_blockchain_rpc_call(
                    &self.label,
                    operation,
                    status,
                    started.elapsed(),
                );
                return Err(error);
            }

            let delay = backoff_delay(&self.rpc_retry_policy, attempt, hint);
            tracing::warn!(
                wallet = %self.label,
                operation,
                attempt,
                max_attempts = self.rpc_retry_policy.max_attempts,
                delay_ms = delay.as_millis(),
                error = %error,
                "RPC call failed; retrying"
            );
            observability::record_blockchain_rpc_retry(&self.label, operation);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Send `call` priced by `quote` and wait for its receipt.
    ///
    /// Underpriced rejections are resubmitted with a bumped fee as long as the bump
    /// stays under the policy ceiling. A send that times out is not resent, since it
    /// may already be in the mempool.
    pub(crate) async fn send_and_confirm(
        &self,
        call: &ChainCall,
        quote: &GasQuote,
    ) -> Result<TxOutcome, BlockchainError> {
        let operation = call.operation();
        let _guard = self.tx_mutex.lock().await;
        let started = Instant::now();

        let result = self.send_with_retry(call, *quote).await;
        let result = match result {
            Ok(pending) => self.await_receipt(operation, pending).await,
            Err(err) => Err(err),
        };

        let status = match &result {
            Ok(_) => "confirmed",
            Err(err) if err.is_revert() => "reverted",
            Err(err) if err.is_timeout() => "timeout",
            Err(_) => "error",
        };
        observability::record_blockchain_tx(&self.label, operation, status, started.elapsed());
        result
    }

    async fn send_with_retry(
        &self,
        call: &ChainCall,
        mut quote: GasQuote,
    ) -> Result<alloy::providers::PendingTransactionBuilder<alloy::network::Ethereum>, BlockchainError>
    {
        let operation = call.operation();
        let mut attempt = 1;
        loop {
            let request = priced_request(self.transaction_request(call), &quote);

            self.rpc_rate_limiter.acquire().await;
            let sent =
                tokio::time::timeout(self.rpc_timeout, self.provider.send_transaction(request))
                    .await;
            let err = match sent {
                Ok(Ok(pending)) => return Ok(pending),
                Ok(Err(err)) => err,
                Err(_) => {
                    return Err(BlockchainError::Timeout {
                        operation,
                        timeout: self.rpc_timeout,
                    });
                }
            };

            let bump_needed = should_bump_gas_price(&err);
            let retryable = err.is_retryable() || bump_needed;
            if attempt >= self.tx_retry_policy.max_attempts || !retryable {
                return Err(err.into_blockchain_error(operation));
            }

            if bump_needed {
                match quote.bumped(&self.gas_policy) {
                    Some(bumped) => quote = bumped,
                    None => {
                        tracing::warn!(
                            wallet = %self.label,
                            operation,
                            max_fee_gwei = quote.max_fee_gwei(),
                            "Fee bump would exceed the gas ceiling; giving up"
                        );
                        return Err(err.into_blockchain_error(operation));
                    }
                }
            }

            let delay = backoff_delay(&self.tx_retry_policy, attempt, err.backoff_hint());
            tracing::warn!(
                wallet = %self.label,
                operation,
                attempt,
                max_attempts = self.tx_retry_policy.max_attempts,
                delay_ms = delay.as_millis(),
                bumped = bump_needed,
                error = %err,
                "Transaction submission failed; retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn await_receipt(
        &self,
        operation: &'static str,
        pending: alloy::providers::PendingTransactionBuilder<alloy::network::Ethereum>,
    ) -> Result<TxOutcome, BlockchainError> {
        let tx_hash = *pending.tx_hash();
        tracing::info!(wallet = %self.label, operation, tx_hash = %tx_hash, "Transaction sent");

        let receipt = pending
            .with_required_confirmations(self.tx_confirmations)
            .with_timeout(Some(self.tx_receipt_timeout))
            .get_receipt()
            .await
            .map_err(|err| match err {
                PendingTransactionError::TxWatcher(WatchTxError::Timeout) => {
                    BlockchainError::Timeout {
                        operation,
                        timeout: self.tx_receipt_timeout,
                    }
                }
                other => BlockchainError::ReceiptFailed {
                    operation,
                    reason: other.to_string(),
                },
            })?;

        if !receipt.status() {
            return Err(BlockchainError::Reverted {
                operation,
                tx_hash: Some(tx_hash),
                reason: None,
            });
        }

        Ok(TxOutcome {
            tx_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        })
    }

    /// Unpriced request for `call`, sent from this wallet.
    pub(crate) fn transaction_request(&self, call: &ChainCall) -> TransactionRequest {
        let request = match call {
            ChainCall::BurnTransfer {
                burn_address,
                amount,
            } => TransactionRequest::default()
                .with_to(*burn_address)
                .with_value(*amount),
            ChainCall::MintCoin(args) => self
                .contracts
                .beth()
                .mintCoin(
                    args.p_a,
                    args.p_b,
                    args.p_c,
                    args.block_number,
                    args.nullifier,
                    args.remaining_coin,
                    args.broadcaster_fee,
                    args.revealed_amount,
                    args.revealed_amount_receiver,
                    args.prover_fee,
                    args.prover,
                    args.receiver_post_mint_hook.clone(),
                    args.broadcaster_fee_post_mint_hook.clone(),
                )
                .into_transaction_request(),
            ChainCall::ApproveBeth { amount } => self
                .contracts
                .beth()
                .approve(*self.contracts.worm().address(), *amount)
                .into_transaction_request(),
            ChainCall::Participate {
                amount_per_epoch,
                num_epochs,
            } => self
                .contracts
                .worm()
                .participate(*amount_per_epoch, *num_epochs)
                .into_transaction_request(),
            ChainCall::Claim {
                starting_epoch,
                num_epochs,
            } => self
                .contracts
                .worm()
                .claim(*starting_epoch, *num_epochs)
                .into_transaction_request(),
        };

        request.with_from(self.address)
    }
}

fn priced_request(request: TransactionRequest, quote: &GasQuote) -> TransactionRequest {
    let request = request.with_gas_limit(quote.gas_limit);
    if quote.is_legacy() {
        request.with_gas_price(quote.max_fee_per_gas)
    } else {
        request
            .with_max_fee_per_gas(quote.max_fee_per_gas)
            .with_max_priority_fee_per_gas(quote.max_priority_fee_per_gas)
    }
}
