//! Cryptographic helpers shared by the signer and the tests.
//!
//! Signatures are 65 bytes `r || s || v` with `v ∈ {27, 28}`, the form every validator in the
//! account stack accepts.

use alloy_primitives::{eip191_hash_message, keccak256, Address, B256};
use k256::{
    ecdsa::{RecoveryId, Signature, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
};

/// Ethereum address of a secp256k1 public key: `keccak256(x || y)[12..]`.
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..32])
}

/// EIP-191 `personal_sign` digest over raw bytes (a 32-byte hash is signed as raw bytes).
pub fn personal_message_hash(message: &[u8]) -> B256 {
    eip191_hash_message(message)
}

/// Recover the signer of a 65-byte signature over `digest`.
///
/// Accepts `v` in `{0, 1, 27, 28}`.
pub fn recover_address(digest: B256, sig: &[u8]) -> Result<Address, ()> {
    if sig.len() != 65 {
        return Err(());
    }
    let signature = Signature::from_slice(&sig[..64]).map_err(|_| ())?;
    let v = match sig[64] {
        27 | 28 => sig[64] - 27,
        0 | 1 => sig[64],
        _ => return Err(()),
    };
    let recovery_id = RecoveryId::from_byte(v).ok_or(())?;
    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery_id)
        .map_err(|_| ())?;
    Ok(address_from_verifying_key(&key))
}
