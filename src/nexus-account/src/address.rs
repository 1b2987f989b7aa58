//! Counterfactual account address resolution.
//!
//! Purpose:
//! - Derive the account address the K1 validator factory will deploy to, without a network
//!   round trip.
//! - Build the `factory` / `factoryData` pair used for deferred deployment.
//! - Interpret the EntryPoint's revert-based `getSenderAddress` simulation as a typed result.
//!
//! Notes:
//! - The salt is `keccak256(abi.encodePacked(owner, index, attesters, threshold))`, where
//!   packed `address[]` elements are padded to 32 bytes.
//! - The deployed contract is a Solady ERC-1967 proxy, so the init code hash depends only on
//!   the implementation address.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolError};
use nexus_account_types::ChainClient;
use tracing::debug;

use crate::{
    errors::{AccountError, ChainError, Result},
    nexus::{
        constants::{ERC1967_CREATION_PREFIX, ERC1967_CREATION_SUFFIX, ERC1967_RUNTIME},
        interfaces::{IEntryPoint, IK1ValidatorFactory},
    },
    utils::bytes::address_word,
};

/// Everything that determines an account's address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountIdentity {
    pub owner: Address,
    pub index: U256,
    pub factory: Address,
    pub implementation: Address,
    pub attesters: Vec<Address>,
    pub attester_threshold: u8,
}

impl AccountIdentity {
    pub fn salt(&self) -> B256 {
        let mut buf = Vec::with_capacity(20 + 32 + 32 * self.attesters.len() + 1);
        buf.extend_from_slice(self.owner.as_slice());
        buf.extend_from_slice(&self.index.to_be_bytes::<32>());
        for attester in &self.attesters {
            buf.extend_from_slice(&address_word(*attester));
        }
        buf.push(self.attester_threshold);
        keccak256(buf)
    }

    pub fn counterfactual_address(&self) -> Address {
        let init_code_hash = erc1967_init_code_hash(self.implementation);
        let address = self.factory.create2(self.salt(), init_code_hash);
        debug!(owner = %self.owner, index = %self.index, %address, "derived counterfactual address");
        address
    }

    /// `createAccount(owner, index, attesters, threshold)` calldata for the factory.
    pub fn factory_data(&self) -> Bytes {
        IK1ValidatorFactory::createAccountCall {
            eoaOwner: self.owner,
            index: self.index,
            attesters: self.attesters.clone(),
            threshold: self.attester_threshold,
        }
        .abi_encode()
        .into()
    }

    /// `factory || factoryData`.
    pub fn init_code(&self) -> Bytes {
        let data = self.factory_data();
        let mut buf = Vec::with_capacity(20 + data.len());
        buf.extend_from_slice(self.factory.as_slice());
        buf.extend_from_slice(&data);
        buf.into()
    }
}

/// Creation code of the ERC-1967 minimal proxy pointing at `implementation`.
pub fn erc1967_init_code(implementation: Address) -> Vec<u8> {
    let mut code = Vec::with_capacity(
        ERC1967_CREATION_PREFIX.len() + 20 + ERC1967_CREATION_SUFFIX.len() + ERC1967_RUNTIME.len(),
    );
    code.extend_from_slice(&ERC1967_CREATION_PREFIX);
    code.extend_from_slice(implementation.as_slice());
    code.extend_from_slice(&ERC1967_CREATION_SUFFIX);
    code.extend_from_slice(&ERC1967_RUNTIME);
    code
}

pub fn erc1967_init_code_hash(implementation: Address) -> B256 {
    keccak256(erc1967_init_code(implementation))
}

/// How an EntryPoint reports the simulated sender address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SenderAddressConvention {
    /// v0.7: the call reverts with `SenderAddressResult(address)`.
    #[default]
    EntryPointV07,
}

impl SenderAddressConvention {
    pub fn decode_revert(self, data: &[u8]) -> Result<Address> {
        match self {
            SenderAddressConvention::EntryPointV07 => {
                IEntryPoint::SenderAddressResult::abi_decode(data, true)
                    .map(|res| res.sender)
                    .map_err(|_| {
                        AccountError::ResolutionFailed(format!(
                            "unexpected getSenderAddress revert: 0x{}",
                            hex::encode(data)
                        ))
                    })
            }
        }
    }
}

/// Ask the EntryPoint which address `init_code` deploys to.
pub async fn simulate_sender_address(
    chain: &impl ChainClient,
    entry_point: Address,
    init_code: Bytes,
    convention: SenderAddressConvention,
) -> Result<Address> {
    debug!(%entry_point, init_code_len = init_code.len(), "simulating sender address");
    match chain.simulate_sender_address(entry_point, init_code).await {
        Err(ChainError::Reverted(data)) => convention.decode_revert(&data),
        Ok(_) => Err(AccountError::ResolutionFailed(
            "getSenderAddress returned without reverting".to_string(),
        )),
        Err(err) => Err(err.into()),
    }
}

/// Whether `address` has code. Callers cache only a positive answer.
pub async fn has_code(chain: &impl ChainClient, address: Address) -> Result<bool> {
    let code = chain.get_code(address).await?;
    Ok(!code.is_empty())
}
