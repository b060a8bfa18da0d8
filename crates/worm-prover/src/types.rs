use alloy::primitives::{Address, U256, utils::format_ether};
use serde::{Deserialize, Deserializer, Serialize, de};

/// One burn's proof request, scoped to a single (wallet, amount) pair.
///
/// Carries only public values; the signing key never leaves the farmer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofRequest {
    pub network: String,
    pub wallet_address: Address,
    /// Wei sent to the burn address.
    pub amount: U256,
    /// Wei minted as BETH (`amount` minus the burn fee).
    pub spend: U256,
    pub burn_key: U256,
}

/// JSON body of `POST /proof`. Fees and hook are fixed: the wallet pays its own gas.
#[derive(Debug, Serialize)]
pub(crate) struct ProofRequestBody<'a> {
    network: &'a str,
    amount: String,
    broadcaster_fee: &'static str,
    prover_fee: &'static str,
    spend: String,
    burn_key: String,
    wallet_address: String,
    receiver_hook: &'static str,
}

impl ProofRequest {
    pub(crate) fn body(&self) -> ProofRequestBody<'_> {
        ProofRequestBody {
            network: &self.network,
            amount: ether_decimal(self.amount),
            broadcaster_fee: "0",
            prover_fee: "0",
            spend: ether_decimal(self.spend),
            burn_key: self.burn_key.to_string(),
            wallet_address: self.wallet_address.to_checksum(None),
            receiver_hook: "0x",
        }
    }
}

/// Decimal ether without trailing zeros ("0.0005", "1").
fn ether_decimal(wei: U256) -> String {
    let formatted = format_ether(wei);
    match formatted.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                whole.to_string()
            } else {
                format!("{whole}.{fraction}")
            }
        }
        None => formatted,
    }
}

/// Groth16 proof as snarkjs emits it (projective coordinates, so `pi_a`/`pi_c` carry
/// a third element and `pi_b` a third pair).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Groth16Proof {
    pub pi_a: Vec<FieldElement>,
    pub pi_b: Vec<Vec<FieldElement>>,
    pub pi_c: Vec<FieldElement>,
}

impl Groth16Proof {
    pub fn a(&self) -> Option<[U256; 2]> {
        pair(&self.pi_a)
    }

    /// `pi_b` with each coordinate pair swapped, the order the on-chain verifier reads.
    pub fn b_for_verifier(&self) -> Option<[[U256; 2]; 2]> {
        let first = pair(self.pi_b.first()?)?;
        let second = pair(self.pi_b.get(1)?)?;
        Some([[first[1], first[0]], [second[1], second[0]]])
    }

    pub fn c(&self) -> Option<[U256; 2]> {
        pair(&self.pi_c)
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.a().is_some() && self.b_for_verifier().is_some() && self.c().is_some()
    }
}

fn pair(values: &[FieldElement]) -> Option<[U256; 2]> {
    match values {
        [x, y, ..] => Some([x.0, y.0]),
        _ => None,
    }
}

/// Field element encoded as a decimal string, a `0x` string or a JSON integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldElement(pub U256);

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lenient_u256(deserializer).map(FieldElement)
    }
}

/// A completed proof job. Consumed by one burn transfer and one mint, then dropped.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ProofArtifact {
    pub burn_address: Address,
    pub proof: Groth16Proof,
    #[serde(deserialize_with = "lenient_u256")]
    pub block_number: U256,
    #[serde(rename = "nullifier_u256", deserialize_with = "lenient_u256")]
    pub nullifier: U256,
    #[serde(deserialize_with = "lenient_u256")]
    pub remaining_coin: U256,
    #[serde(deserialize_with = "lenient_u256")]
    pub broadcaster_fee: U256,
    #[serde(deserialize_with = "lenient_u256")]
    pub prover_fee: U256,
    pub prover: Address,
    #[serde(deserialize_with = "lenient_u256")]
    pub reveal_amount: U256,
    pub wallet_address: Address,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    Text(String),
}

fn lenient_u256<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(value) => Ok(U256::from(value)),
        NumberOrString::Text(text) => text
            .trim()
            .parse::<U256>()
            .map_err(|e| de::Error::custom(format!("invalid uint256 '{text}': {e}"))),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use alloy::primitives::{address, utils::parse_ether};

    use super::*;

    #[test]
    fn request_body_uses_decimal_ether_and_zero_fees() {
        let request = ProofRequest {
            network: "sepolia".to_string(),
            wallet_address: address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            amount: parse_ether("0.0005").unwrap(),
            spend: parse_ether("0.0005").unwrap(),
            burn_key: U256::from(123_456_789u64),
        };

        let body = serde_json::to_value(request.body()).unwrap();
        assert_eq!(body["network"], "sepolia");
        assert_eq!(body["amount"], "0.0005");
        assert_eq!(body["spend"], "0.0005");
        assert_eq!(body["broadcaster_fee"], "0");
        assert_eq!(body["prover_fee"], "0");
        assert_eq!(body["burn_key"], "123456789");
        assert_eq!(
            body["wallet_address"],
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
        assert_eq!(body["receiver_hook"], "0x");
        assert_eq!(body.as_object().unwrap().len(), 8);
    }

    #[test]
    fn whole_ether_has_no_fraction() {
        assert_eq!(ether_decimal(parse_ether("1").unwrap()), "1");
        assert_eq!(ether_decimal(U256::ZERO), "0");
    }

    #[test]
    fn artifact_accepts_strings_and_numbers() {
        let artifact: ProofArtifact = serde_json::from_value(serde_json::json!({
            "burn_address": "0x1111111111111111111111111111111111111111",
            "proof": {
                "pi_a": ["1", "2", "1"],
                "pi_b": [["3", "4"], ["5", "6"], ["1", "0"]],
                "pi_c": ["0x07", 8, "1"]
            },
            "block_number": 7_000_000,
            "nullifier_u256": "42",
            "remaining_coin": "0",
            "broadcaster_fee": "0",
            "prover_fee": "0",
            "prover": "0x2222222222222222222222222222222222222222",
            "reveal_amount": "500000000000000",
            "wallet_address": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        }))
        .unwrap();

        assert_eq!(artifact.block_number, U256::from(7_000_000u64));
        assert_eq!(artifact.nullifier, U256::from(42u64));
        assert_eq!(artifact.proof.a(), Some([U256::from(1u64), U256::from(2u64)]));
        assert_eq!(artifact.proof.c(), Some([U256::from(7u64), U256::from(8u64)]));
        assert!(artifact.proof.is_complete());
    }

    #[test]
    fn pi_b_pairs_are_swapped_for_the_verifier() {
        let element = |v: u64| FieldElement(U256::from(v));
        let proof = Groth16Proof {
            pi_a: vec![element(1), element(2)],
            pi_b: vec![vec![element(3), element(4)], vec![element(5), element(6)]],
            pi_c: vec![element(7), element(8)],
        };

        assert_eq!(
            proof.b_for_verifier(),
            Some([
                [U256::from(4u64), U256::from(3u64)],
                [U256::from(6u64), U256::from(5u64)]
            ])
        );
    }

    #[test]
    fn short_proof_is_incomplete() {
        let proof = Groth16Proof {
            pi_a: vec![FieldElement(U256::from(1u64))],
            pi_b: vec![],
            pi_c: vec![],
        };
        assert!(!proof.is_complete());
        assert_eq!(proof.b_for_verifier(), None);
    }
}
