use worm_blockchain::{ChainCall, FarmChain, GasAdmission, GasPriceGuard, TxOutcome};
use worm_observability as observability;

use super::error::{CycleError, CycleStep};

/// Quote, admit and submit one transaction. A rejected quote is returned as
/// [`CycleError::GasRejected`] without anything being signed.
pub(crate) async fn submit_guarded(
    chain: &dyn FarmChain,
    gas: &GasPriceGuard,
    wallet: &str,
    step: CycleStep,
    call: &ChainCall,
) -> Result<TxOutcome, CycleError> {
    let operation = call.operation();
    let quote = gas
        .quote(chain, call)
        .await
        .map_err(|e| CycleError::from_chain(step, e))?;

    if let GasAdmission::Rejected(rejection) = gas.admit(&quote) {
        observability::record_gas_admission(wallet, operation, "rejected", quote.max_fee_gwei());
        tracing::warn!(
            step = %step,
            operation,
            max_fee_gwei = quote.max_fee_gwei(),
            gas_limit = quote.gas_limit,
            reason = %rejection,
            "Gas guard deferred transaction"
        );
        return Err(CycleError::GasRejected {
            operation,
            rejection,
        });
    }
    observability::record_gas_admission(wallet, operation, "allowed", quote.max_fee_gwei());

    let outcome = chain
        .submit(call, &quote)
        .await
        .map_err(|e| CycleError::from_chain(step, e))?;
    tracing::info!(
        step = %step,
        operation,
        tx_hash = %outcome.tx_hash,
        block_number = ?outcome.block_number,
        gas_used = outcome.gas_used,
        "Transaction confirmed"
    );
    Ok(outcome)
}
