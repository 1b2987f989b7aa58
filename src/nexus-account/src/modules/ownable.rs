//! Multi-owner threshold validator.
//!
//! Notes:
//! - Install data is `abi.encode(uint256 threshold, address[] owners)` with owners sorted
//!   ascending, the order the contract stores them in.
//! - Signatures are 65-byte ECDSA signatures concatenated in ascending signer order. Exactly
//!   `threshold` signers sign (the lowest addresses), matching the dummy signature length.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolValue;
use async_trait::async_trait;

use super::Validator;
use crate::{
    errors::{ConfigError, Result},
    nexus::constants::dummy_ecdsa_signature,
    signer::SharedSigner,
};

/// `abi.encode(threshold, owners)`.
pub fn ownable_init_data(threshold: usize, owners: &[Address]) -> Bytes {
    (U256::from(threshold), owners.to_vec()).abi_encode_params().into()
}

#[derive(Clone)]
pub struct OwnableValidator {
    address: Address,
    threshold: usize,
    owners: Vec<Address>,
    signers: Vec<SharedSigner>,
}

impl OwnableValidator {
    /// Validates the owner set against the signers that will produce signatures.
    pub fn new(
        address: Address,
        threshold: usize,
        owners: Vec<Address>,
        mut signers: Vec<SharedSigner>,
    ) -> Result<Self, ConfigError> {
        let mut sorted = owners.clone();
        sorted.sort();
        if let Some(dup) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(ConfigError::DuplicateOwner(dup[0]));
        }
        if threshold == 0 || threshold > sorted.len() {
            return Err(ConfigError::InvalidThreshold { threshold, owners: sorted.len() });
        }
        for signer in &signers {
            if sorted.binary_search(&signer.address()).is_err() {
                return Err(ConfigError::MissingOwner(signer.address()));
            }
        }
        signers.sort_by_key(|s| s.address());
        signers.dedup_by_key(|s| s.address());
        if signers.len() < threshold {
            return Err(ConfigError::InvalidThreshold { threshold, owners: signers.len() });
        }
        signers.truncate(threshold);
        Ok(Self { address, threshold, owners: sorted, signers })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    fn concat(parts: Vec<[u8; 65]>) -> Bytes {
        let mut buf = Vec::with_capacity(65 * parts.len());
        for part in parts {
            buf.extend_from_slice(&part);
        }
        buf.into()
    }
}

#[async_trait]
impl Validator for OwnableValidator {
    fn address(&self) -> Address {
        self.address
    }

    fn init_data(&self) -> Bytes {
        ownable_init_data(self.threshold, &self.owners)
    }

    fn dummy_signature(&self) -> Result<Bytes> {
        Ok(Self::concat(vec![dummy_ecdsa_signature(); self.threshold]))
    }

    async fn sign_user_op_hash(&self, hash: B256) -> Result<Bytes> {
        let mut parts = Vec::with_capacity(self.signers.len());
        for signer in &self.signers {
            parts.push(signer.sign_message(hash.as_slice()).await?);
        }
        Ok(Self::concat(parts))
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
        let mut parts = Vec::with_capacity(self.signers.len());
        for signer in &self.signers {
            parts.push(signer.sign_message(message).await?);
        }
        Ok(Self::concat(parts))
    }

    async fn sign_hash(&self, hash: B256) -> Result<Bytes> {
        let mut parts = Vec::with_capacity(self.signers.len());
        for signer in &self.signers {
            parts.push(signer.sign_hash(hash).await?);
        }
        Ok(Self::concat(parts))
    }
}
