//! Scripted collaborators for tests and offline tooling.
//!
//! `MockChain` answers code, nonce, fee, call and sender-simulation queries from tables the
//! test fills in; `MockBundler` records submitted operations and hands back their hashes.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use alloy_primitives::{aliases::U128, aliases::U192, Address, Bytes, B256, U256};
use alloy_sol_types::SolError;
use async_trait::async_trait;
use nexus_account_types::{
    Bundler, ChainClient, ChainError, GasEstimate, GasFees, UserOperation, UserOperationReceipt,
};

use crate::{nexus::interfaces::IEntryPoint, user_op::user_op_hash};

fn poisoned() -> ChainError {
    ChainError::Transport("mock state poisoned".into())
}

pub struct MockChain {
    code: Mutex<HashMap<Address, Bytes>>,
    nonces: Mutex<HashMap<(Address, U192), U256>>,
    responses: Mutex<HashMap<(Address, [u8; 4]), Bytes>>,
    exact_responses: Mutex<HashMap<(Address, Bytes), Bytes>>,
    sender_revert: Mutex<Option<Bytes>>,
    fees: GasFees,
    fail_nonce: AtomicBool,
    code_queries: AtomicUsize,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            code: Mutex::default(),
            nonces: Mutex::default(),
            responses: Mutex::default(),
            exact_responses: Mutex::default(),
            sender_revert: Mutex::default(),
            fees: GasFees {
                max_fee_per_gas: U128::from(1_500_000_000u64),
                max_priority_fee_per_gas: U128::from(1_000_000u64),
            },
            fail_nonce: AtomicBool::new(false),
            code_queries: AtomicUsize::new(0),
        }
    }
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_code(&self, address: Address, code: Bytes) {
        if let Ok(mut map) = self.code.lock() {
            map.insert(address, code);
        }
    }

    pub fn set_nonce(&self, sender: Address, key: U192, nonce: U256) {
        if let Ok(mut map) = self.nonces.lock() {
            map.insert((sender, key), nonce);
        }
    }

    /// Make every `read_nonce` fail with a transport error.
    pub fn fail_nonce_reads(&self) {
        self.fail_nonce.store(true, Ordering::SeqCst);
    }

    /// Answer `eth_call`s to `to` whose selector is `selector`.
    pub fn set_call_response(&self, to: Address, selector: [u8; 4], response: Bytes) {
        if let Ok(mut map) = self.responses.lock() {
            map.insert((to, selector), response);
        }
    }

    /// Answer `eth_call`s to `to` with exactly `data`; takes precedence over selector matches.
    pub fn set_call_data_response(&self, to: Address, data: Bytes, response: Bytes) {
        if let Ok(mut map) = self.exact_responses.lock() {
            map.insert((to, data), response);
        }
    }

    /// `getSenderAddress` reverts with `SenderAddressResult(sender)`.
    pub fn set_sender_result(&self, sender: Address) {
        self.set_sender_revert(IEntryPoint::SenderAddressResult { sender }.abi_encode().into());
    }

    pub fn set_sender_revert(&self, data: Bytes) {
        if let Ok(mut slot) = self.sender_revert.lock() {
            *slot = Some(data);
        }
    }

    pub fn code_queries(&self) -> usize {
        self.code_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_code(&self, address: Address) -> Result<Bytes, ChainError> {
        self.code_queries.fetch_add(1, Ordering::SeqCst);
        let map = self.code.lock().map_err(|_| poisoned())?;
        Ok(map.get(&address).cloned().unwrap_or_default())
    }

    async fn estimate_fees(&self) -> Result<GasFees, ChainError> {
        Ok(self.fees)
    }

    async fn read_nonce(&self, _entry_point: Address, sender: Address, key: U192) -> Result<U256, ChainError> {
        if self.fail_nonce.load(Ordering::SeqCst) {
            return Err(ChainError::Transport("nonce endpoint unavailable".into()));
        }
        let map = self.nonces.lock().map_err(|_| poisoned())?;
        Ok(map.get(&(sender, key)).copied().unwrap_or_default())
    }

    async fn simulate_sender_address(&self, _entry_point: Address, _init_code: Bytes) -> Result<Bytes, ChainError> {
        let slot = self.sender_revert.lock().map_err(|_| poisoned())?;
        match slot.as_ref() {
            Some(data) => Err(ChainError::Reverted(data.clone())),
            None => Err(ChainError::NotImplemented),
        }
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        if let Some(response) = self.exact_responses.lock().map_err(|_| poisoned())?.get(&(to, data.clone())) {
            return Ok(response.clone());
        }
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| ChainError::Transport("call data shorter than a selector".into()))?;
        let map = self.responses.lock().map_err(|_| poisoned())?;
        map.get(&(to, selector)).cloned().ok_or(ChainError::Reverted(Bytes::new()))
    }
}

pub struct MockBundler {
    chain_id: u64,
    estimate: GasEstimate,
    sent: Mutex<Vec<(B256, UserOperation)>>,
    send_error: Mutex<Option<ChainError>>,
}

impl MockBundler {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            estimate: GasEstimate {
                pre_verification_gas: U256::from(60_000u64),
                verification_gas_limit: U128::from(150_000u64),
                call_gas_limit: U128::from(80_000u64),
                paymaster_verification_gas_limit: None,
                paymaster_post_op_gas_limit: None,
            },
            sent: Mutex::default(),
            send_error: Mutex::default(),
        }
    }

    /// Reject the next submissions with `err` (e.g. an RPC error carrying an `AAxx` code).
    pub fn fail_sends_with(&self, err: ChainError) {
        if let Ok(mut slot) = self.send_error.lock() {
            *slot = Some(err);
        }
    }

    pub fn sent(&self) -> Vec<UserOperation> {
        self.sent.lock().map(|ops| ops.iter().map(|(_, op)| op.clone()).collect()).unwrap_or_default()
    }
}

#[async_trait]
impl Bundler for MockBundler {
    async fn estimate_user_operation_gas(
        &self,
        _op: &UserOperation,
        _entry_point: Address,
    ) -> Result<GasEstimate, ChainError> {
        Ok(self.estimate)
    }

    async fn send_user_operation(&self, op: &UserOperation, entry_point: Address) -> Result<B256, ChainError> {
        if let Some(err) = self.send_error.lock().map_err(|_| poisoned())?.clone() {
            return Err(err);
        }
        let hash = user_op_hash(op, entry_point, self.chain_id);
        self.sent.lock().map_err(|_| poisoned())?.push((hash, op.clone()));
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<UserOperationReceipt, ChainError> {
        let sent = self.sent.lock().map_err(|_| poisoned())?;
        let (_, op) = sent
            .iter()
            .find(|(h, _)| *h == hash)
            .ok_or_else(|| ChainError::Transport(format!("unknown user operation {hash}")))?;
        Ok(UserOperationReceipt {
            user_op_hash: hash,
            sender: op.sender,
            success: true,
            actual_gas_used: U256::from(op.call_gas_limit) + U256::from(op.verification_gas_limit),
            transaction_hash: B256::from(U256::from_be_bytes(hash.0).wrapping_add(U256::from(1u8))),
            reason: None,
        })
    }
}
