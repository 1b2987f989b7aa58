//! EntryPoint v0.7 packing and the user operation hash.

use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_sol_types::SolValue;
use nexus_account_types::UserOperation;

fn pack_u128_pair(high: [u8; 16], low: [u8; 16]) -> B256 {
    let mut word = [0u8; 32];
    word[..16].copy_from_slice(&high);
    word[16..].copy_from_slice(&low);
    B256::from(word)
}

/// `verificationGasLimit(16) || callGasLimit(16)`.
pub fn account_gas_limits(op: &UserOperation) -> B256 {
    pack_u128_pair(op.verification_gas_limit.to_be_bytes(), op.call_gas_limit.to_be_bytes())
}

/// `maxPriorityFeePerGas(16) || maxFeePerGas(16)`.
pub fn gas_fees(op: &UserOperation) -> B256 {
    pack_u128_pair(op.max_priority_fee_per_gas.to_be_bytes(), op.max_fee_per_gas.to_be_bytes())
}

/// Hash the EntryPoint and validators sign over.
pub fn user_op_hash(op: &UserOperation, entry_point: Address, chain_id: u64) -> B256 {
    let packed = (
        op.sender,
        op.nonce,
        keccak256(op.init_code()),
        keccak256(&op.call_data),
        account_gas_limits(op),
        op.pre_verification_gas,
        gas_fees(op),
        keccak256(op.paymaster_and_data()),
    )
        .abi_encode();
    keccak256((keccak256(packed), entry_point, U256::from(chain_id)).abi_encode())
}
