use std::fmt;

use alloy::{
    network::EthereumWallet,
    signers::local::{LocalSignerError, PrivateKeySigner},
};
use serde::Deserialize;

use crate::error::BlockchainError;

const REDACTED: &str = "[REDACTED]";

/// Hex-encoded signing key. Never printed; only [`PrivateKey::expose_secret`] reveals it.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    /// Trimmed, with the `0x` prefix added when it was left off.
    pub fn normalized(&self) -> Self {
        let trimmed = self.0.trim();
        if trimmed.starts_with("0x") || trimmed.is_empty() {
            Self(trimmed.to_string())
        } else {
            Self(format!("0x{trimmed}"))
        }
    }

    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// `0x` followed by exactly 64 hex digits.
    pub fn is_well_formed(&self) -> bool {
        self.0
            .strip_prefix("0x")
            .is_some_and(|hex| hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

pub fn signer_from_private_key(
    wallet_index: usize,
    private_key: &PrivateKey,
) -> Result<PrivateKeySigner, BlockchainError> {
    private_key
        .expose_secret()
        .parse()
        .map_err(|e: LocalSignerError| BlockchainError::InvalidPrivateKey {
            wallet_index,
            key_length: private_key.expose_secret().len(),
            source: e,
        })
}

pub fn wallet_from_private_key(
    wallet_index: usize,
    private_key: &PrivateKey,
) -> Result<EthereumWallet, BlockchainError> {
    Ok(EthereumWallet::from(signer_from_private_key(
        wallet_index,
        private_key,
    )?))
}
