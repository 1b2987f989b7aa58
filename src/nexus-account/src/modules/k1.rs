//! Single-owner ECDSA validator.

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;

use super::Validator;
use crate::{errors::Result, nexus::constants::dummy_ecdsa_signature, signer::SharedSigner};

#[derive(Clone)]
pub struct K1Validator {
    address: Address,
    owner: SharedSigner,
}

impl K1Validator {
    pub fn new(address: Address, owner: SharedSigner) -> Self {
        Self { address, owner }
    }

    pub fn owner(&self) -> Address {
        self.owner.address()
    }
}

#[async_trait]
impl Validator for K1Validator {
    fn address(&self) -> Address {
        self.address
    }

    /// The validator is installed by the factory with the owner as init data.
    fn init_data(&self) -> Bytes {
        Bytes::copy_from_slice(self.owner.address().as_slice())
    }

    fn dummy_signature(&self) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(&dummy_ecdsa_signature()))
    }

    async fn sign_user_op_hash(&self, hash: B256) -> Result<Bytes> {
        let sig = self.owner.sign_message(hash.as_slice()).await?;
        Ok(Bytes::copy_from_slice(&sig))
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
        let sig = self.owner.sign_message(message).await?;
        Ok(Bytes::copy_from_slice(&sig))
    }

    async fn sign_hash(&self, hash: B256) -> Result<Bytes> {
        let sig = self.owner.sign_hash(hash).await?;
        Ok(Bytes::copy_from_slice(&sig))
    }
}
