//! Client-side burn-key search.
//!
//! The burn address a prover derives is bound to a burn key the farmer picks. The
//! protocol requires the key to pass a small proof of work over the revealed amount
//! and the extra commitment (fees, receiver and hook), so the search runs here before
//! any prover is contacted.

use alloy::primitives::{Address, U256, keccak256, uint};
use rand::{RngCore, rngs::OsRng};

use crate::error::ProverError;

/// BN254 scalar field modulus; burn keys are field elements.
pub const BN254_PRIME: U256 =
    uint!(21888242871839275222246405745257275088548364400416034343698204186575808495617_U256);

pub const POW_DOMAIN: &[u8] = b"EIP-7503";

pub const MAX_ITERATIONS: u64 = 10_000_000;

/// `keccak256(broadcasterFee ‖ proverFee ‖ receiver ‖ hook) >> 8`, matching the
/// contract's `abi.encodePacked` layout.
pub fn burn_extra_commitment(
    broadcaster_fee: U256,
    prover_fee: U256,
    receiver: Address,
    receiver_hook: &[u8],
) -> U256 {
    let mut packed = Vec::with_capacity(32 + 32 + 20 + receiver_hook.len());
    packed.extend_from_slice(&broadcaster_fee.to_be_bytes::<32>());
    packed.extend_from_slice(&prover_fee.to_be_bytes::<32>());
    packed.extend_from_slice(receiver.as_slice());
    packed.extend_from_slice(receiver_hook);
    U256::from_be_bytes(keccak256(&packed).0) >> 8
}

pub fn meets_difficulty(burn_key: U256, reveal: U256, extra: U256, zero_bytes: usize) -> bool {
    let mut input = [0u8; 32 * 3 + POW_DOMAIN.len()];
    input[..32].copy_from_slice(&burn_key.to_be_bytes::<32>());
    input[32..64].copy_from_slice(&reveal.to_be_bytes::<32>());
    input[64..96].copy_from_slice(&extra.to_be_bytes::<32>());
    input[96..].copy_from_slice(POW_DOMAIN);
    keccak256(input).iter().take_while(|b| **b == 0).count() >= zero_bytes
}

/// Walk keys upward from `start` (mod the field prime) until one passes.
pub(crate) fn search_from(
    start: U256,
    reveal: U256,
    extra: U256,
    zero_bytes: usize,
    max_iterations: u64,
) -> Result<U256, ProverError> {
    let mut candidate = start % BN254_PRIME;
    for _ in 0..max_iterations {
        if meets_difficulty(candidate, reveal, extra, zero_bytes) {
            return Ok(candidate);
        }
        candidate = candidate.add_mod(U256::from(1u8), BN254_PRIME);
    }
    Err(ProverError::BurnKeyExhausted {
        iterations: max_iterations,
    })
}

/// Find a burn key for `receiver` revealing `reveal` wei, with zero fees and no hook.
///
/// CPU bound, so the search runs on the blocking pool.
pub async fn generate_burn_key(
    receiver: Address,
    reveal: U256,
    zero_bytes: usize,
) -> Result<U256, ProverError> {
    let extra = burn_extra_commitment(U256::ZERO, U256::ZERO, receiver, &[]);
    let mut seed = [0u8; 32];
    OsRng.fill_bytes(&mut seed);
    let start = U256::from_be_bytes(seed);

    tokio::task::spawn_blocking(move || search_from(start, reveal, extra, zero_bytes, MAX_ITERATIONS))
        .await
        .map_err(|e| ProverError::BurnKeyTask(e.to_string()))?
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use alloy::primitives::address;

    use super::*;

    const RECEIVER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

    #[test]
    fn extra_commitment_fits_in_248_bits() {
        let extra = burn_extra_commitment(U256::ZERO, U256::ZERO, RECEIVER, &[]);
        assert!(extra < (U256::from(1u8) << 248));
        assert_eq!(
            extra,
            burn_extra_commitment(U256::ZERO, U256::ZERO, RECEIVER, &[])
        );
        assert_ne!(
            extra,
            burn_extra_commitment(U256::from(1u8), U256::ZERO, RECEIVER, &[])
        );
    }

    #[test]
    fn zero_difficulty_accepts_the_start() {
        let start = U256::from(5u8);
        assert_eq!(
            search_from(start, U256::ZERO, U256::ZERO, 0, 1).unwrap(),
            start
        );
    }

    #[test]
    fn start_is_reduced_into_the_field() {
        let start = BN254_PRIME + U256::from(3u8);
        assert_eq!(
            search_from(start, U256::ZERO, U256::ZERO, 0, 1).unwrap(),
            U256::from(3u8)
        );
    }

    #[test]
    fn search_finds_a_key_that_passes() {
        let extra = burn_extra_commitment(U256::ZERO, U256::ZERO, RECEIVER, &[]);
        let reveal = U256::from(500_000_000_000_000u64);
        let key = search_from(BN254_PRIME - U256::from(10u8), reveal, extra, 1, 100_000).unwrap();

        assert!(key < BN254_PRIME);
        assert!(meets_difficulty(key, reveal, extra, 1));
    }

    #[test]
    fn gives_up_after_the_iteration_limit() {
        let err = search_from(U256::ZERO, U256::ZERO, U256::ZERO, 32, 16).unwrap_err();
        assert!(matches!(
            err,
            ProverError::BurnKeyExhausted { iterations: 16 }
        ));
    }

    #[tokio::test]
    async fn generated_key_meets_default_difficulty() {
        let reveal = U256::from(1_000_000_000_000_000u64);
        let key = generate_burn_key(RECEIVER, reveal, 2).await.unwrap();
        let extra = burn_extra_commitment(U256::ZERO, U256::ZERO, RECEIVER, &[]);
        assert!(meets_difficulty(key, reveal, extra, 2));
    }
}
