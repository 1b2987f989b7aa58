//! ERC-7579 execution encoding.
//!
//! Purpose:
//! - Encode call lists into `execute(bytes32 mode, bytes executionCalldata)`.
//! - Decode the same payloads the way the account does, for verification and tests.
//!
//! Notes:
//! - Mode word: `callType(1) || execType(1) || unused(4) || selector(4) || payload(22)`.
//! - Single: `target(20) || value(32) || data`; batch: `abi.encode(Execution[])`;
//!   delegatecall: `target(20) || data`.

use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::{SolCall, SolValue};
use nexus_account_types::{CallType, ExecType};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{ConfigError, DecodeError},
    nexus::interfaces::{Execution, INexus},
    utils::bytes::{read_address, read_fixed, read_rest, read_u256_be, read_u8},
};

/// One call made by the account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub to: Address,
    #[serde(default)]
    pub value: U256,
    #[serde(default)]
    pub data: Bytes,
}

impl From<Execution> for Call {
    fn from(exec: Execution) -> Self {
        Self { to: exec.target, value: exec.value, data: exec.callData }
    }
}

impl From<&Call> for Execution {
    fn from(call: &Call) -> Self {
        Self { target: call.to, value: call.value, callData: call.data.clone() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionMode {
    pub call_type: CallType,
    pub exec_type: ExecType,
    pub selector: FixedBytes<4>,
    pub payload: FixedBytes<22>,
}

impl ExecutionMode {
    pub fn new(call_type: CallType, exec_type: ExecType) -> Self {
        Self { call_type, exec_type, selector: FixedBytes::ZERO, payload: FixedBytes::ZERO }
    }

    pub fn encode(&self) -> B256 {
        let mut word = [0u8; 32];
        word[0] = self.call_type as u8;
        word[1] = self.exec_type as u8;
        word[6..10].copy_from_slice(self.selector.as_slice());
        word[10..32].copy_from_slice(self.payload.as_slice());
        B256::from(word)
    }

    pub fn decode(word: B256) -> Result<Self, DecodeError> {
        let bytes = word.as_slice();
        let mut i = 0usize;
        let ct = read_u8(bytes, &mut i)?;
        let call_type = CallType::try_from(ct).map_err(|_| DecodeError::UnknownCallType(ct))?;
        let et = read_u8(bytes, &mut i)?;
        let exec_type = ExecType::try_from(et).map_err(|_| DecodeError::UnknownExecType(et))?;
        let unused: FixedBytes<4> = read_fixed(bytes, &mut i)?;
        if unused != FixedBytes::<4>::ZERO {
            return Err(DecodeError::ReservedBitsSet);
        }
        let selector = read_fixed(bytes, &mut i)?;
        let payload = read_fixed(bytes, &mut i)?;
        Ok(Self { call_type, exec_type, selector, payload })
    }
}

pub fn encode_single(call: &Call) -> Vec<u8> {
    let mut buf = Vec::with_capacity(20 + 32 + call.data.len());
    buf.extend_from_slice(call.to.as_slice());
    buf.extend_from_slice(&call.value.to_be_bytes::<32>());
    buf.extend_from_slice(&call.data);
    buf
}

pub fn encode_batch(calls: &[Call]) -> Vec<u8> {
    let executions: Vec<Execution> = calls.iter().map(Execution::from).collect();
    executions.abi_encode()
}

/// Delegatecalls carry no value.
pub fn encode_delegate_call(call: &Call) -> Vec<u8> {
    let mut buf = Vec::with_capacity(20 + call.data.len());
    buf.extend_from_slice(call.to.as_slice());
    buf.extend_from_slice(&call.data);
    buf
}

fn wrap_execute(mode: ExecutionMode, execution_calldata: Vec<u8>) -> Bytes {
    INexus::executeCall { mode: mode.encode(), executionCalldata: execution_calldata.into() }
        .abi_encode()
        .into()
}

/// Account call data for `calls`: single-call encoding for one call, batch for more.
pub fn encode_execute(calls: &[Call], exec_type: ExecType) -> Result<Bytes, ConfigError> {
    match calls {
        [] => Err(ConfigError::MissingTarget),
        [call] => Ok(wrap_execute(ExecutionMode::new(CallType::Single, exec_type), encode_single(call))),
        many => Ok(wrap_execute(ExecutionMode::new(CallType::Batch, exec_type), encode_batch(many))),
    }
}

pub fn encode_execute_delegate(call: &Call, exec_type: ExecType) -> Bytes {
    wrap_execute(ExecutionMode::new(CallType::DelegateCall, exec_type), encode_delegate_call(call))
}

pub fn decode_single(data: &[u8]) -> Result<Call, DecodeError> {
    let mut i = 0usize;
    let to = read_address(data, &mut i)?;
    let value = read_u256_be(data, &mut i)?;
    let rest = read_rest(data, &mut i);
    Ok(Call { to, value, data: Bytes::copy_from_slice(rest) })
}

pub fn decode_batch(data: &[u8]) -> Result<Vec<Call>, DecodeError> {
    let executions = <Vec<Execution>>::abi_decode(data, true)?;
    Ok(executions.into_iter().map(Call::from).collect())
}

pub fn decode_delegate_call(data: &[u8]) -> Result<Call, DecodeError> {
    let mut i = 0usize;
    let to = read_address(data, &mut i)?;
    let rest = read_rest(data, &mut i);
    Ok(Call { to, value: U256::ZERO, data: Bytes::copy_from_slice(rest) })
}

/// Inverse of [`encode_execute`] / [`encode_execute_delegate`].
pub fn decode_execute(calldata: &[u8]) -> Result<(ExecutionMode, Vec<Call>), DecodeError> {
    let selector = calldata.get(..4).ok_or(DecodeError::Truncated)?;
    if selector != INexus::executeCall::SELECTOR.as_slice() {
        return Err(DecodeError::UnexpectedSelector(hex::encode(selector)));
    }
    let call = INexus::executeCall::abi_decode(calldata, true)?;
    let mode = ExecutionMode::decode(call.mode)?;
    let calls = match mode.call_type {
        CallType::Single => vec![decode_single(&call.executionCalldata)?],
        CallType::Batch => decode_batch(&call.executionCalldata)?,
        CallType::DelegateCall => vec![decode_delegate_call(&call.executionCalldata)?],
    };
    Ok((mode, calls))
}
