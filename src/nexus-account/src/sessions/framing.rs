//! Smart Sessions signature framing.
//!
//! `mode(1) || permissionId(32) || payload`, where the payload is the session key signature
//! (USE) or `abi.encode(EnableSession, signature)` (ENABLE / UNSAFE_ENABLE), optionally
//! FastLZ-compressed.

use alloy_primitives::{Bytes, B256};
use alloy_sol_types::SolValue;
use nexus_account_types::SmartSessionMode;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{ConfigError, DecodeError},
    nexus::interfaces::EnableSession,
    utils::{
        bytes::{read_fixed, read_rest, read_u8},
        flz::{flz_compress, flz_decompress},
    },
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    #[default]
    Raw,
    Compressed,
}

impl PayloadEncoding {
    fn encode(self, payload: Vec<u8>) -> Vec<u8> {
        match self {
            PayloadEncoding::Raw => payload,
            PayloadEncoding::Compressed => flz_compress(&payload),
        }
    }

    fn decode(self, payload: &[u8]) -> Result<Vec<u8>, DecodeError> {
        match self {
            PayloadEncoding::Raw => Ok(payload.to_vec()),
            PayloadEncoding::Compressed => flz_decompress(payload),
        }
    }
}

/// Parsed session signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSignature {
    pub mode: SmartSessionMode,
    pub permission_id: B256,
    pub signature: Bytes,
    pub enable: Option<EnableSession>,
}

/// Fail fast when enable framing has nothing to enable. Called before any signing.
pub fn check_enable_data(mode: SmartSessionMode, enable: Option<&EnableSession>) -> Result<(), ConfigError> {
    if mode.is_enable() && enable.is_none() {
        return Err(ConfigError::MissingEnableData);
    }
    Ok(())
}

pub fn encode_session_signature(
    mode: SmartSessionMode,
    permission_id: B256,
    signature: &[u8],
    enable: Option<&EnableSession>,
    encoding: PayloadEncoding,
) -> Result<Bytes, ConfigError> {
    check_enable_data(mode, enable)?;
    let payload = match (mode, enable) {
        (SmartSessionMode::Use, _) => signature.to_vec(),
        (_, Some(enable)) => (enable.clone(), Bytes::copy_from_slice(signature)).abi_encode_params(),
        (_, None) => return Err(ConfigError::MissingEnableData),
    };
    let payload = encoding.encode(payload);

    let mut buf = Vec::with_capacity(1 + 32 + payload.len());
    buf.push(mode as u8);
    buf.extend_from_slice(permission_id.as_slice());
    buf.extend_from_slice(&payload);
    Ok(buf.into())
}

pub fn decode_session_signature(data: &[u8], encoding: PayloadEncoding) -> Result<SessionSignature, DecodeError> {
    let mut i = 0usize;
    let mode_byte = read_u8(data, &mut i)?;
    let mode = SmartSessionMode::try_from(mode_byte).map_err(|_| DecodeError::UnknownSessionMode(mode_byte))?;
    let permission_id: B256 = read_fixed(data, &mut i)?;
    let payload = encoding.decode(read_rest(data, &mut i))?;

    if !mode.is_enable() {
        return Ok(SessionSignature { mode, permission_id, signature: payload.into(), enable: None });
    }
    let (enable, signature) = <(EnableSession, Bytes)>::abi_decode_params(&payload, true)?;
    Ok(SessionSignature { mode, permission_id, signature, enable: Some(enable) })
}
