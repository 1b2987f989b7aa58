//! Composite nonce keys.
//!
//! Layout (24 bytes, the EntryPoint's `uint192` key space):
//! `0x000000 || mode(1) || validator(20)`.
//! The account reads the validator back out of the nonce to route validation, so the key
//! must round-trip exactly.

use alloy_primitives::{aliases::U192, Address, U256};
use nexus_account_types::{ChainClient, ValidationMode};
use tracing::{debug, warn};

use crate::{
    errors::DecodeError,
    utils::bytes::{read_address, read_slice, read_u8},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NonceKey {
    pub mode: ValidationMode,
    pub module: Address,
}

impl NonceKey {
    pub fn new(mode: ValidationMode, module: Address) -> Self {
        Self { mode, module }
    }

    pub fn to_bytes(&self) -> [u8; 24] {
        let mut out = [0u8; 24];
        out[3] = self.mode as u8;
        out[4..24].copy_from_slice(self.module.as_slice());
        out
    }

    pub fn encode(&self) -> U192 {
        U192::from_be_bytes(self.to_bytes())
    }

    pub fn decode(key: U192) -> Result<Self, DecodeError> {
        let bytes = key.to_be_bytes::<24>();
        let mut i = 0usize;
        if read_slice(&bytes, &mut i, 3)? != [0u8; 3] {
            return Err(DecodeError::ReservedBitsSet);
        }
        let mode_byte = read_u8(&bytes, &mut i)?;
        let mode = ValidationMode::try_from(mode_byte)
            .map_err(|_| DecodeError::UnknownValidationMode(mode_byte))?;
        let module = read_address(&bytes, &mut i)?;
        Ok(Self { mode, module })
    }

    /// Key part of a full nonce (its upper 192 bits).
    pub fn from_nonce(nonce: U256) -> Result<Self, DecodeError> {
        Self::decode(key_of(nonce))
    }
}

/// Upper 192 bits of a full EntryPoint nonce.
pub fn key_of(nonce: U256) -> U192 {
    U192::from_be_slice(&nonce.to_be_bytes::<32>()[..24])
}

/// Full nonce from a key and a 64-bit sequence number.
pub fn compose_nonce(key: U192, sequence: u64) -> U256 {
    let mut bytes = [0u8; 32];
    bytes[..24].copy_from_slice(&key.to_be_bytes::<24>());
    bytes[24..].copy_from_slice(&sequence.to_be_bytes());
    U256::from_be_bytes(bytes)
}

/// Caller overrides for nonce key selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NonceOptions {
    /// Used verbatim when set.
    pub key: Option<U192>,
    pub mode: Option<ValidationMode>,
}

impl NonceOptions {
    pub fn resolve_key(&self, active_module: Address) -> U192 {
        if let Some(key) = self.key {
            return key;
        }
        NonceKey::new(self.mode.unwrap_or_default(), active_module).encode()
    }
}

/// `EntryPoint.getNonce(sender, key)`. Any failure reads as nonce 0.
pub async fn fetch_nonce(
    chain: &impl ChainClient,
    entry_point: Address,
    sender: Address,
    key: U192,
) -> U256 {
    match chain.read_nonce(entry_point, sender, key).await {
        Ok(nonce) => {
            debug!(%sender, %key, %nonce, "read account nonce");
            nonce
        }
        Err(err) => {
            warn!(%sender, %key, error = %err, "nonce lookup failed, using 0");
            U256::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_key_is_zero_padded_module() {
        let module = Address::repeat_byte(0xab);
        let bytes = NonceKey::new(ValidationMode::Default, module).to_bytes();
        assert_eq!(&bytes[..4], &[0, 0, 0, 0]);
        assert_eq!(&bytes[4..], module.as_slice());
    }

    #[test]
    fn keys_round_trip_for_every_mode() {
        for mode in [ValidationMode::Default, ValidationMode::ModuleEnable] {
            for module in [Address::ZERO, Address::repeat_byte(0x01), Address::repeat_byte(0xff)] {
                let key = NonceKey::new(mode, module);
                assert_eq!(NonceKey::decode(key.encode()), Ok(key));
                let nonce = compose_nonce(key.encode(), 42);
                assert_eq!(NonceKey::from_nonce(nonce), Ok(key));
            }
        }
    }

    #[test]
    fn decode_rejects_reserved_bytes_and_unknown_modes() {
        let mut bytes = NonceKey::new(ValidationMode::Default, Address::ZERO).to_bytes();
        bytes[0] = 1;
        assert_eq!(NonceKey::decode(U192::from_be_bytes(bytes)), Err(DecodeError::ReservedBitsSet));

        let mut bytes = [0u8; 24];
        bytes[3] = 0x07;
        assert_eq!(
            NonceKey::decode(U192::from_be_bytes(bytes)),
            Err(DecodeError::UnknownValidationMode(0x07))
        );
    }

    #[test]
    fn explicit_key_overrides_mode() {
        let module = Address::repeat_byte(0x22);
        let custom = U192::from(77u64);
        let opts = NonceOptions { key: Some(custom), mode: Some(ValidationMode::ModuleEnable) };
        assert_eq!(opts.resolve_key(module), custom);

        let opts = NonceOptions { key: None, mode: Some(ValidationMode::ModuleEnable) };
        assert_eq!(
            opts.resolve_key(module),
            NonceKey::new(ValidationMode::ModuleEnable, module).encode()
        );
        assert_eq!(
            NonceOptions::default().resolve_key(module),
            NonceKey::new(ValidationMode::Default, module).encode()
        );
    }
}
