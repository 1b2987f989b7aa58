//! Operation and message signatures.
//!
//! Purpose:
//! - Sign user operations through the active validation module.
//! - Produce ERC-1271 message signatures: validator-prefixed, and ERC-6492 wrapped while the
//!   account is not yet deployed.
//!
//! Notes:
//! - The account routes `isValidSignature` by the first 20 bytes of the signature.
//! - ERC-6492: `abi.encode(factory, factoryData, signature) || 0x6492…6492`.

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::SolValue;
use nexus_account_types::UserOperation;
use tracing::debug;

use crate::{
    errors::{DecodeError, Result},
    modules::{ModuleManager, Validator},
    nexus::constants::ERC6492_MAGIC,
    user_op::user_op_hash,
};

/// Deployment state of the signing account, resolved by the caller per signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Deployment {
    Deployed,
    Counterfactual { factory: Address, factory_data: Bytes },
}

pub fn prefix_validator(validator: Address, sig: &[u8]) -> Bytes {
    let mut buf = Vec::with_capacity(20 + sig.len());
    buf.extend_from_slice(validator.as_slice());
    buf.extend_from_slice(sig);
    buf.into()
}

pub fn wrap_erc6492(factory: Address, factory_data: &[u8], sig: &[u8]) -> Bytes {
    let mut buf = (factory, Bytes::copy_from_slice(factory_data), Bytes::copy_from_slice(sig)).abi_encode_params();
    buf.extend_from_slice(ERC6492_MAGIC.as_slice());
    buf.into()
}

pub fn is_erc6492(sig: &[u8]) -> bool {
    sig.len() >= 32 && sig[sig.len() - 32..] == ERC6492_MAGIC[..]
}

/// `(factory, factoryData, innerSignature)` of a wrapped signature.
pub fn unwrap_erc6492(sig: &[u8]) -> Result<(Address, Bytes, Bytes), DecodeError> {
    if !is_erc6492(sig) {
        return Err(DecodeError::NotWrapped);
    }
    let body = &sig[..sig.len() - 32];
    Ok(<(Address, Bytes, Bytes)>::abi_decode_params(body, true)?)
}

/// Validator prefix, then the ERC-6492 wrapper when undeployed.
pub fn finalize_erc1271_signature(validator: Address, module_sig: &[u8], deployment: &Deployment) -> Bytes {
    let prefixed = prefix_validator(validator, module_sig);
    match deployment {
        Deployment::Deployed => prefixed,
        Deployment::Counterfactual { factory, factory_data } => {
            debug!(%factory, "wrapping signature for undeployed account");
            wrap_erc6492(*factory, factory_data, &prefixed)
        }
    }
}

pub async fn sign_user_op(
    modules: &ModuleManager,
    op: &UserOperation,
    entry_point: Address,
    chain_id: u64,
) -> Result<(B256, Bytes)> {
    let hash = user_op_hash(op, entry_point, chain_id);
    let sig = modules.active().sign_user_op_hash(hash).await?;
    debug!(%hash, module = %modules.active().address(), "signed user operation");
    Ok((hash, sig))
}

/// ERC-1271 signature over a personal message.
pub async fn sign_message(modules: &ModuleManager, message: &[u8], deployment: &Deployment) -> Result<Bytes> {
    let module = modules.active();
    let sig = module.sign_message(message).await?;
    Ok(finalize_erc1271_signature(module.address(), &sig, deployment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_then_unwrap_recovers_parts() {
        let factory = Address::repeat_byte(0xfa);
        let data = vec![0xc0, 0xde];
        let sig = vec![0x11; 85];
        let wrapped = wrap_erc6492(factory, &data, &sig);
        assert!(is_erc6492(&wrapped));
        assert_eq!(&wrapped[wrapped.len() - 32..], ERC6492_MAGIC.as_slice());

        let (f, d, s) = unwrap_erc6492(&wrapped).unwrap();
        assert_eq!(f, factory);
        assert_eq!(d.to_vec(), data);
        assert_eq!(s.to_vec(), sig);
    }

    #[test]
    fn unwrap_rejects_plain_signature() {
        assert_eq!(unwrap_erc6492(&[0u8; 65]), Err(DecodeError::NotWrapped));
        assert_eq!(unwrap_erc6492(&[]), Err(DecodeError::NotWrapped));
    }

    #[test]
    fn deployed_accounts_get_prefix_only() {
        let validator = Address::repeat_byte(0x0b);
        let sig = [0x22u8; 65];
        let deployed = finalize_erc1271_signature(validator, &sig, &Deployment::Deployed);
        assert_eq!(&deployed[..20], validator.as_slice());
        assert_eq!(&deployed[20..], &sig);

        let undeployed = finalize_erc1271_signature(
            validator,
            &sig,
            &Deployment::Counterfactual { factory: Address::repeat_byte(0xfa), factory_data: Bytes::from(vec![1]) },
        );
        assert_ne!(undeployed, deployed);
        let (_, _, inner) = unwrap_erc6492(&undeployed).unwrap();
        assert_eq!(inner, deployed);
    }
}
