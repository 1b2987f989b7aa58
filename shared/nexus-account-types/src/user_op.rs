use alloy_primitives::{aliases::U128, Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// ERC-4337 v0.7 user operation in its unpacked (bundler RPC) form.
///
/// Gas fields are 128-bit because the EntryPoint packs them in pairs into 32-byte words.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory_data: Option<Bytes>,
    pub call_data: Bytes,
    pub call_gas_limit: U128,
    pub verification_gas_limit: U128,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U128,
    pub max_priority_fee_per_gas: U128,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_verification_gas_limit: Option<U128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_post_op_gas_limit: Option<U128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_data: Option<Bytes>,
    pub signature: Bytes,
}

impl UserOperation {
    /// `factory || factoryData`, or empty when the account already exists.
    pub fn init_code(&self) -> Vec<u8> {
        match (self.factory, &self.factory_data) {
            (Some(factory), data) => {
                let data: &[u8] = match data {
                    Some(d) => d,
                    None => &[],
                };
                let mut buf = Vec::with_capacity(20 + data.len());
                buf.extend_from_slice(factory.as_slice());
                buf.extend_from_slice(data);
                buf
            }
            (None, _) => Vec::new(),
        }
    }

    /// `paymaster || verificationGas(16) || postOpGas(16) || paymasterData`, or empty.
    pub fn paymaster_and_data(&self) -> Vec<u8> {
        let Some(paymaster) = self.paymaster else {
            return Vec::new();
        };
        let verification = self.paymaster_verification_gas_limit.unwrap_or_default();
        let post_op = self.paymaster_post_op_gas_limit.unwrap_or_default();
        let data: &[u8] = match &self.paymaster_data {
            Some(d) => d,
            None => &[],
        };

        let mut buf = Vec::with_capacity(20 + 16 + 16 + data.len());
        buf.extend_from_slice(paymaster.as_slice());
        buf.extend_from_slice(&verification.to_be_bytes::<16>());
        buf.extend_from_slice(&post_op.to_be_bytes::<16>());
        buf.extend_from_slice(data);
        buf
    }

    pub fn has_factory(&self) -> bool {
        self.factory.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_code_is_empty_without_factory() {
        let op = UserOperation::default();
        assert!(op.init_code().is_empty());
        assert!(op.paymaster_and_data().is_empty());
    }

    #[test]
    fn init_code_concatenates_factory_and_data() {
        let op = UserOperation {
            factory: Some(Address::repeat_byte(0x11)),
            factory_data: Some(Bytes::from(vec![0xaa, 0xbb])),
            ..Default::default()
        };
        let init = op.init_code();
        assert_eq!(init.len(), 22);
        assert_eq!(&init[..20], Address::repeat_byte(0x11).as_slice());
        assert_eq!(&init[20..], &[0xaa, 0xbb]);
    }

    #[test]
    fn paymaster_and_data_layout() {
        let op = UserOperation {
            paymaster: Some(Address::repeat_byte(0x22)),
            paymaster_verification_gas_limit: Some(U128::from(7u64)),
            paymaster_post_op_gas_limit: Some(U128::from(9u64)),
            paymaster_data: Some(Bytes::from(vec![0x01])),
            ..Default::default()
        };
        let pmd = op.paymaster_and_data();
        assert_eq!(pmd.len(), 20 + 16 + 16 + 1);
        assert_eq!(pmd[35], 7);
        assert_eq!(pmd[51], 9);
        assert_eq!(pmd[52], 1);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(UserOperation::default()).unwrap();
        assert!(json.get("callData").is_some());
        assert!(json.get("maxPriorityFeePerGas").is_some());
        assert!(json.get("factory").is_none());
    }
}
