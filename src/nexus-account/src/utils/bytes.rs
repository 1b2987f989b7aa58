//! Minimal big-endian parsing and padding helpers.
//!
//! Used by the decoders for packed layouts (nonce keys, execution modes, packed single
//! executions, session signatures) where the ABI decoder does not apply.

use alloy_primitives::{Address, FixedBytes, U256};

use crate::errors::DecodeError;

pub fn read_u8(bytes: &[u8], i: &mut usize) -> Result<u8, DecodeError> {
    if bytes.len() <= *i {
        return Err(DecodeError::Truncated);
    }
    let b = bytes[*i];
    *i += 1;
    Ok(b)
}

pub fn read_slice<'a>(bytes: &'a [u8], i: &mut usize, len: usize) -> Result<&'a [u8], DecodeError> {
    if bytes.len() < *i + len {
        return Err(DecodeError::Truncated);
    }
    let out = &bytes[*i..*i + len];
    *i += len;
    Ok(out)
}

pub fn read_fixed<const N: usize>(bytes: &[u8], i: &mut usize) -> Result<FixedBytes<N>, DecodeError> {
    let slice = read_slice(bytes, i, N)?;
    Ok(FixedBytes::from_slice(slice))
}

pub fn read_u256_be(bytes: &[u8], i: &mut usize) -> Result<U256, DecodeError> {
    let slice = read_slice(bytes, i, 32)?;
    Ok(U256::from_be_slice(slice))
}

pub fn read_address(bytes: &[u8], i: &mut usize) -> Result<Address, DecodeError> {
    let slice = read_slice(bytes, i, 20)?;
    Ok(Address::from_slice(slice))
}

/// Remaining bytes after the cursor.
pub fn read_rest<'a>(bytes: &'a [u8], i: &mut usize) -> &'a [u8] {
    let start = (*i).min(bytes.len());
    *i = bytes.len();
    &bytes[start..]
}

/// Address left-padded into a 32-byte ABI word.
pub fn address_word(address: Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..32].copy_from_slice(address.as_slice());
    word
}

pub fn u64_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..32].copy_from_slice(&value.to_be_bytes());
    word
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_advance_cursor_and_detect_truncation() {
        let data = [0x01u8, 0x02, 0x03];
        let mut i = 0;
        assert_eq!(read_u8(&data, &mut i), Ok(0x01));
        assert_eq!(read_slice(&data, &mut i, 2), Ok(&data[1..3]));
        assert_eq!(read_u8(&data, &mut i), Err(DecodeError::Truncated));
        assert!(read_rest(&data, &mut i).is_empty());
    }

    #[test]
    fn address_word_is_left_padded() {
        let word = address_word(Address::repeat_byte(0xab));
        assert_eq!(&word[..12], &[0u8; 12]);
        assert_eq!(&word[12..], &[0xab; 20]);
    }
}
