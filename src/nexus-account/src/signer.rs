//! Owner / session key signers.
//!
//! Validation modules hold signers behind [`AccountSigner`] so hardware or remote signers can
//! stand in for the local key.

use std::sync::Arc;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;

use crate::{
    errors::{AccountError, Result},
    utils::crypto::{address_from_verifying_key, personal_message_hash},
};

#[async_trait]
pub trait AccountSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Sign a 32-byte digest as-is. Returns `r || s || v` with `v ∈ {27, 28}`.
    async fn sign_hash(&self, hash: B256) -> Result<[u8; 65]>;

    /// EIP-191 `personal_sign` over `message`.
    async fn sign_message(&self, message: &[u8]) -> Result<[u8; 65]> {
        self.sign_hash(personal_message_hash(message)).await
    }
}

pub type SharedSigner = Arc<dyn AccountSigner>;

/// In-process secp256k1 key.
#[derive(Clone)]
pub struct LocalSigner {
    key: SigningKey,
    address: Address,
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner").field("address", &self.address).finish_non_exhaustive()
    }
}

impl LocalSigner {
    pub fn from_bytes(secret: &[u8]) -> Result<Self> {
        let key = SigningKey::from_slice(secret)
            .map_err(|e| AccountError::Signing(format!("invalid private key: {e}")))?;
        let address = address_from_verifying_key(key.verifying_key());
        Ok(Self { key, address })
    }

    /// Parse a hex private key, with or without `0x`.
    pub fn from_hex(secret: &str) -> Result<Self> {
        let raw = hex::decode(secret.trim().trim_start_matches("0x"))
            .map_err(|e| AccountError::Signing(format!("invalid private key hex: {e}")))?;
        Self::from_bytes(&raw)
    }

    pub fn shared(self) -> SharedSigner {
        Arc::new(self)
    }

    fn sign_prehash(&self, hash: B256) -> Result<[u8; 65]> {
        let (sig, recid) = self
            .key
            .sign_prehash_recoverable(hash.as_slice())
            .map_err(|e| AccountError::Signing(e.to_string()))?;
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&sig.to_bytes());
        out[64] = 27 + recid.to_byte();
        Ok(out)
    }
}

#[async_trait]
impl AccountSigner for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_hash(&self, hash: B256) -> Result<[u8; 65]> {
        self.sign_prehash(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::crypto::recover_address;
    use alloy_primitives::{address, keccak256};

    const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn derives_well_known_address() {
        let signer = LocalSigner::from_hex(ANVIL_KEY).unwrap();
        assert_eq!(signer.address(), address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"));
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!(LocalSigner::from_hex("0x1234").is_err());
        assert!(LocalSigner::from_hex("zz").is_err());
        assert!(LocalSigner::from_bytes(&[0u8; 32]).is_err());
    }

    #[tokio::test]
    async fn signatures_recover_to_signer() {
        let signer = LocalSigner::from_hex(ANVIL_KEY).unwrap();
        let digest = keccak256(b"digest");

        let raw = signer.sign_hash(digest).await.unwrap();
        assert!(raw[64] == 27 || raw[64] == 28);
        assert_eq!(recover_address(digest, &raw), Ok(signer.address()));

        let personal = signer.sign_message(digest.as_slice()).await.unwrap();
        assert_eq!(
            recover_address(personal_message_hash(digest.as_slice()), &personal),
            Ok(signer.address())
        );
        assert_ne!(raw, personal);
    }
}
