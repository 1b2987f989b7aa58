use alloy_primitives::{aliases::U128, aliases::U192, Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::user_op::UserOperation;

/// Errors surfaced by chain / bundler collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Used by offline mocks or partially implemented clients.
    #[error("not implemented")]
    NotImplemented,
    /// The transport failed (connection, timeout, malformed response).
    #[error("transport error: {0}")]
    Transport(String),
    /// A call reverted; carries the raw revert data.
    #[error("execution reverted: {0}")]
    Reverted(Bytes),
    /// The node answered with a JSON-RPC error.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
}

/// EIP-1559 fee suggestion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasFees {
    pub max_fee_per_gas: U128,
    pub max_priority_fee_per_gas: U128,
}

/// Bundler gas estimate for a user operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEstimate {
    pub pre_verification_gas: U256,
    pub verification_gas_limit: U128,
    pub call_gas_limit: U128,
    #[serde(default)]
    pub paymaster_verification_gas_limit: Option<U128>,
    #[serde(default)]
    pub paymaster_post_op_gas_limit: Option<U128>,
}

/// Receipt returned once the bundler has included an operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    pub user_op_hash: B256,
    pub sender: Address,
    pub success: bool,
    pub actual_gas_used: U256,
    pub transaction_hash: B256,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Chain RPC abstraction (code, nonce, fee and call queries).
///
/// Every method defaults to `NotImplemented` so mocks only provide what a test exercises.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_code(&self, _address: Address) -> Result<Bytes, ChainError> {
        Err(ChainError::NotImplemented)
    }

    async fn estimate_fees(&self) -> Result<GasFees, ChainError> {
        Err(ChainError::NotImplemented)
    }

    /// `EntryPoint.getNonce(sender, key)`.
    async fn read_nonce(
        &self,
        _entry_point: Address,
        _sender: Address,
        _key: U192,
    ) -> Result<U256, ChainError> {
        Err(ChainError::NotImplemented)
    }

    /// `EntryPoint.getSenderAddress(initCode)`.
    ///
    /// This call always reverts on-chain; implementations hand back the revert data as
    /// `Err(ChainError::Reverted(data))` and the engine decodes it.
    async fn simulate_sender_address(
        &self,
        _entry_point: Address,
        _init_code: Bytes,
    ) -> Result<Bytes, ChainError> {
        Err(ChainError::NotImplemented)
    }

    /// Read-only `eth_call`.
    async fn call(&self, _to: Address, _data: Bytes) -> Result<Bytes, ChainError> {
        Err(ChainError::NotImplemented)
    }
}

/// Relayer (bundler) abstraction: estimation, broadcast and receipt polling.
///
/// Polling cadence and timeouts belong to the implementation, never to the engine.
#[async_trait]
pub trait Bundler: Send + Sync {
    async fn estimate_user_operation_gas(
        &self,
        _op: &UserOperation,
        _entry_point: Address,
    ) -> Result<GasEstimate, ChainError> {
        Err(ChainError::NotImplemented)
    }

    /// Broadcast a signed operation; returns the user operation hash.
    async fn send_user_operation(
        &self,
        _op: &UserOperation,
        _entry_point: Address,
    ) -> Result<B256, ChainError> {
        Err(ChainError::NotImplemented)
    }

    async fn wait_for_receipt(&self, _hash: B256) -> Result<UserOperationReceipt, ChainError> {
        Err(ChainError::NotImplemented)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_error_messages() {
        assert_eq!(ChainError::NotImplemented.to_string(), "not implemented");
        assert_eq!(ChainError::Reverted(Bytes::from(vec![0xde, 0xad])).to_string(), "execution reverted: 0xdead");
        let rpc = ChainError::Rpc { code: -32500, message: "AA25 invalid account nonce".into() };
        assert_eq!(rpc.to_string(), "rpc error -32500: AA25 invalid account nonce");
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(ChainError::Transport("timeout".into()));
        assert_eq!(boxed.to_string(), "transport error: timeout");
    }
}
