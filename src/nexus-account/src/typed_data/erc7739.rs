//! ERC-7739 nested typed-data signatures (`TypedDataSign`).
//!
//! The application's struct hash is re-hashed inside a `TypedDataSign` struct bound to the
//! account's own EIP-712 domain, under the application's domain separator. The account
//! rebuilds the same hash from the fields appended to the signature:
//! `sig || appDomainSeparator || contentsHash || contentsType || uint16(len(contentsType))`.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use super::eip712::{typed_data_digest, TypedData};
use crate::{
    errors::DecodeError,
    utils::bytes::{address_word, read_fixed, read_slice},
};

/// The account's own EIP-712 domain (`eip712Domain()` of the smart account).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
    #[serde(default)]
    pub salt: B256,
}

/// Application typed data reduced to what the nested scheme needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NestedContents {
    pub app_domain_separator: B256,
    pub contents_hash: B256,
    pub contents_name: String,
    pub contents_type: String,
}

impl NestedContents {
    pub fn from_typed_data(typed_data: &TypedData) -> Result<Self, DecodeError> {
        Ok(Self {
            app_domain_separator: typed_data.domain_separator()?,
            contents_hash: typed_data.hash_struct()?,
            contents_name: typed_data.primary_type.clone(),
            contents_type: typed_data.encode_type()?,
        })
    }
}

pub fn typed_data_sign_typehash(contents_name: &str, contents_type: &str) -> B256 {
    let mut s = String::with_capacity(160 + contents_type.len());
    s.push_str("TypedDataSign(");
    s.push_str(contents_name);
    s.push_str(" contents,string name,string version,uint256 chainId,address verifyingContract,bytes32 salt)");
    s.push_str(contents_type);
    keccak256(s)
}

pub fn typed_data_sign_struct_hash(contents: &NestedContents, account: &AccountDomain) -> B256 {
    let mut buf = Vec::with_capacity(32 * 7);
    buf.extend_from_slice(typed_data_sign_typehash(&contents.contents_name, &contents.contents_type).as_slice());
    buf.extend_from_slice(contents.contents_hash.as_slice());
    buf.extend_from_slice(keccak256(account.name.as_bytes()).as_slice());
    buf.extend_from_slice(keccak256(account.version.as_bytes()).as_slice());
    buf.extend_from_slice(&U256::from(account.chain_id).to_be_bytes::<32>());
    buf.extend_from_slice(&address_word(account.verifying_contract));
    buf.extend_from_slice(account.salt.as_slice());
    keccak256(buf)
}

/// Digest the validator signs.
pub fn typed_data_sign_hash(contents: &NestedContents, account: &AccountDomain) -> B256 {
    typed_data_digest(contents.app_domain_separator, typed_data_sign_struct_hash(contents, account))
}

pub fn encode_nested_signature(sig: &[u8], contents: &NestedContents) -> Result<Bytes, DecodeError> {
    let type_bytes = contents.contents_type.as_bytes();
    let len = u16::try_from(type_bytes.len()).map_err(|_| {
        DecodeError::TypedData(format!("contents type too long: {} bytes", type_bytes.len()))
    })?;
    let mut buf = Vec::with_capacity(sig.len() + 64 + type_bytes.len() + 2);
    buf.extend_from_slice(sig);
    buf.extend_from_slice(contents.app_domain_separator.as_slice());
    buf.extend_from_slice(contents.contents_hash.as_slice());
    buf.extend_from_slice(type_bytes);
    buf.extend_from_slice(&len.to_be_bytes());
    Ok(buf.into())
}

/// Split a nested signature back into `(innerSig, appDomainSeparator, contentsHash, contentsType)`.
pub fn decode_nested_signature(data: &[u8]) -> Result<(Bytes, B256, B256, String), DecodeError> {
    if data.len() < 66 {
        return Err(DecodeError::Truncated);
    }
    let type_len = usize::from(u16::from_be_bytes([data[data.len() - 2], data[data.len() - 1]]));
    let body_len = data.len() - 2;
    let tail_start = body_len.checked_sub(64 + type_len).ok_or(DecodeError::Truncated)?;

    let mut i = tail_start;
    let app: B256 = read_fixed(data, &mut i)?;
    let contents: B256 = read_fixed(data, &mut i)?;
    let ty = read_slice(data, &mut i, type_len)?;
    let contents_type = String::from_utf8(ty.to_vec()).map_err(|e| DecodeError::TypedData(e.to_string()))?;
    Ok((Bytes::copy_from_slice(&data[..tail_start]), app, contents, contents_type))
}
