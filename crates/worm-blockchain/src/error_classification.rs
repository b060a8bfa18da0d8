use std::time::Duration;

use alloy::{
    contract::Error as ContractError,
    primitives::Bytes,
    transports::{RpcError, TransportErrorKind},
};

const BUMP_GAS_PATTERNS: [&str; 8] = [
    "replacement transaction underpriced",
    "transaction underpriced",
    "fee too low",
    "max fee per gas less than block base fee",
    "max fee per gas less than block basefee",
    "priority fee too low",
    "nonce too low",
    "already known",
];

pub(crate) fn is_retryable_rpc_error(err: &RpcError<TransportErrorKind>) -> bool {
    if revert_data(err).is_some() {
        return false;
    }

    match err {
        RpcError::Transport(kind) => match kind {
            TransportErrorKind::MissingBatchResponse(_) | TransportErrorKind::BackendGone => true,
            TransportErrorKind::HttpError(http) => {
                http.is_rate_limit_err() || http.is_temporarily_unavailable()
            }
            TransportErrorKind::Custom(custom) => {
                let msg = custom.to_string().to_ascii_lowercase();
                msg.contains("too many requests")
                    || msg.contains("rate limit")
                    || msg.contains("timed out")
                    || msg.contains("connection")
            }
            _ => false,
        },
        RpcError::ErrorResp(payload) => payload.is_retry_err(),
        RpcError::NullResp => true,
        RpcError::DeserError { text, .. } => {
            let lowered = text.to_ascii_lowercase();
            lowered.contains("rate limit") || lowered.contains("too many requests")
        }
        _ => false,
    }
}

pub(crate) fn rpc_backoff_hint(err: &RpcError<TransportErrorKind>) -> Option<Duration> {
    let RpcError::ErrorResp(payload) = err else {
        return None;
    };

    let Ok(data) = payload.try_data_as::<serde_json::Value>()? else {
        return None;
    };

    let backoff_seconds = data["rate"]["backoff_seconds"].as_f64()?;
    Some(Duration::from_secs(backoff_seconds.ceil() as u64))
}

pub(crate) fn is_retryable_contract_error(err: &ContractError) -> bool {
    if err.as_revert_data().is_some() {
        return false;
    }

    match err {
        ContractError::TransportError(inner) => is_retryable_rpc_error(inner),
        _ => false,
    }
}

pub(crate) fn contract_error_backoff_hint(err: &ContractError) -> Option<Duration> {
    match err {
        ContractError::TransportError(inner) => rpc_backoff_hint(inner),
        _ => None,
    }
}

/// Revert payload carried by a JSON-RPC error, if the node reported one.
pub(crate) fn revert_data(err: &RpcError<TransportErrorKind>) -> Option<Bytes> {
    err.as_error_resp()?.as_revert_data()
}

/// Node responses that mean "execution reverted" without returning revert data.
pub(crate) fn is_execution_revert(err: &RpcError<TransportErrorKind>) -> bool {
    if revert_data(err).is_some() {
        return true;
    }
    let Some(payload) = err.as_error_resp() else {
        return false;
    };
    let message = payload.message.to_ascii_lowercase();
    message.contains("execution reverted") || message.contains("revert")
}

pub(crate) fn should_bump_gas_price(err: &RpcError<TransportErrorKind>) -> bool {
    if is_execution_revert(err) {
        return false;
    }

    let message = rpc_error_message(err).to_ascii_lowercase();
    BUMP_GAS_PATTERNS
        .iter()
        .any(|pattern| message.contains(pattern))
}

fn rpc_error_message(err: &RpcError<TransportErrorKind>) -> String {
    match err {
        RpcError::ErrorResp(payload) => payload.to_string(),
        RpcError::Transport(TransportErrorKind::HttpError(http)) => http.body.clone(),
        RpcError::Transport(TransportErrorKind::Custom(custom)) => custom.to_string(),
        RpcError::DeserError { text, .. } => text.clone(),
        _ => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use alloy::rpc::json_rpc::ErrorPayload;

    use super::*;

    fn error_response(code: i64, message: &str) -> RpcError<TransportErrorKind> {
        RpcError::ErrorResp(ErrorPayload {
            code,
            message: message.to_string().into(),
            data: None,
        })
    }

    #[test]
    fn underpriced_responses_request_a_bump() {
        let err = error_response(-32000, "replacement transaction underpriced");
        assert!(should_bump_gas_price(&err));
        assert!(!is_execution_revert(&err));
    }

    #[test]
    fn reverts_are_neither_bumped_nor_retried() {
        let err = error_response(3, "execution reverted: epoch closed");
        assert!(is_execution_revert(&err));
        assert!(!should_bump_gas_price(&err));
    }

    #[test]
    fn null_response_is_retryable() {
        assert!(is_retryable_rpc_error(&RpcError::NullResp));
    }
}
