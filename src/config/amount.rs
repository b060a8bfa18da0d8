use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use worm_blockchain::{U256, format_ether_trimmed, parse_ether_amount};

/// An ether amount held in wei, written as a decimal ether string or TOML number.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct EtherAmount(pub U256);

impl EtherAmount {
    pub(crate) fn parse(text: &str) -> Result<Self, String> {
        let text = text.trim();
        if text.starts_with('-') {
            return Err(format!("ether amount '{text}' must not be negative"));
        }
        parse_ether_amount(text).map(Self)
    }

    pub(crate) fn wei(self) -> U256 {
        self.0
    }
}

impl fmt::Debug for EtherAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ETH", format_ether_trimmed(self.0))
    }
}

impl Serialize for EtherAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_ether_trimmed(self.0))
    }
}

impl<'de> Deserialize<'de> for EtherAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Integer(u64),
            Float(f64),
        }

        let text = match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text,
            Raw::Integer(value) => value.to_string(),
            Raw::Float(value) => value.to_string(),
        };
        Self::parse(&text).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        amount: EtherAmount,
    }

    fn from_toml(text: &str) -> Result<EtherAmount, String> {
        Figment::from(Toml::string(text))
            .extract::<Holder>()
            .map(|h| h.amount)
            .map_err(|e| e.to_string())
    }

    #[test]
    fn accepts_strings_and_numbers() {
        let expected = U256::from(1_000_000_000_000_000u64);
        assert_eq!(from_toml("amount = \"0.001\"").unwrap().wei(), expected);
        assert_eq!(from_toml("amount = 0.001").unwrap().wei(), expected);
        assert_eq!(
            from_toml("amount = 2").unwrap().wei(),
            U256::from(2_000_000_000_000_000_000u128)
        );
    }

    #[test]
    fn rejects_negative_and_garbage() {
        assert!(EtherAmount::parse("-0.1").is_err());
        assert!(EtherAmount::parse("abc").is_err());
    }

    #[test]
    fn serializes_as_trimmed_decimal() {
        let amount = EtherAmount::parse("0.0500").unwrap();
        assert_eq!(format!("{amount:?}"), "0.05 ETH");

        #[derive(Deserialize)]
        struct Text {
            amount: String,
        }
        let text: Text =
            Figment::from(Serialized::default("amount", amount))
                .extract()
                .unwrap();
        assert_eq!(text.amount, "0.05");
    }
}
