//! Typed-data signing for the smart account.

pub mod eip712;
pub mod erc7739;

use tracing::debug;

use crate::{
    errors::Result,
    modules::{ModuleManager, Validator},
    signature::{finalize_erc1271_signature, Deployment},
};
pub use eip712::{Eip712Domain, TypedData, TypedField, Types};
pub use erc7739::{AccountDomain, NestedContents};

/// ERC-1271 signature for `typed_data`, verified by the account through ERC-7739.
pub async fn sign_typed_data(
    modules: &ModuleManager,
    typed_data: &TypedData,
    account: &AccountDomain,
    deployment: &Deployment,
) -> Result<alloy_primitives::Bytes> {
    let contents = NestedContents::from_typed_data(typed_data)?;
    let hash = erc7739::typed_data_sign_hash(&contents, account);
    debug!(%hash, primary = %typed_data.primary_type, "signing nested typed data");

    let module = modules.active();
    let sig = module.sign_hash(hash).await?;
    let nested = erc7739::encode_nested_signature(&sig, &contents)?;
    Ok(finalize_erc1271_signature(module.address(), &nested, deployment))
}
