//! Smart Sessions: delegated, policy-scoped session keys.
//!
//! Purpose:
//! - Build canonical `Session` values from a session key and per-action policies.
//! - Produce permission ids, enable digests and the owner's enable signature.
//! - Frame session key signatures for USE / ENABLE / UNSAFE_ENABLE.
//!
//! Notes:
//! - The session validator is the ownable validator with a single owner (the session key)
//!   and threshold 1.
//! - Rule-count limits are checked for every action before anything is built or signed.

pub mod framing;
pub mod permission;
pub mod policies;

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolCall;
use nexus_account_types::{ChainClient, SmartSessionMode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    errors::{ConfigError, DecodeError, Result},
    modules::{ownable::ownable_init_data, Validator},
    nexus::interfaces::{ChainDigest, ERC7739Data, EnableSession, ISmartSession, Session},
    signature::prefix_validator,
};
use permission::{enable_session, multichain_digest, session_digest};
use policies::{action_data, sort_actions, ActionPolicyData, PolicyContracts};

pub use framing::{decode_session_signature, encode_session_signature, PayloadEncoding, SessionSignature};
pub use permission::permission_id;

/// Smart Sessions module and policy addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContracts {
    pub smart_sessions: Address,
    pub ownable_validator: Address,
    pub sudo_policy: Address,
    pub time_frame_policy: Address,
    pub universal_action_policy: Address,
}

impl SessionContracts {
    pub fn policy_contracts(&self) -> PolicyContracts {
        PolicyContracts {
            sudo_policy: self.sudo_policy,
            time_frame_policy: self.time_frame_policy,
            universal_action_policy: self.universal_action_policy,
        }
    }
}

/// What a session key may do.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub session_public_key: Address,
    pub actions: Vec<ActionPolicyData>,
    #[serde(default)]
    pub salt: B256,
}

pub fn build_session(request: &SessionRequest, contracts: &SessionContracts) -> Result<Session, ConfigError> {
    for action in &request.actions {
        action.validate()?;
    }
    let policy_contracts = contracts.policy_contracts();
    let mut actions = request
        .actions
        .iter()
        .map(|action| action_data(action, &policy_contracts))
        .collect::<Result<Vec<_>, _>>()?;
    sort_actions(&mut actions);

    Ok(Session {
        sessionValidator: contracts.ownable_validator,
        sessionValidatorInitData: ownable_init_data(1, &[request.session_public_key]),
        salt: request.salt,
        userOpPolicies: Vec::new(),
        erc7739Policies: ERC7739Data::default(),
        actions,
    })
}

/// Per-chain session binding used when collecting an enable signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionChainContext {
    pub chain_id: u64,
    pub account: Address,
    pub nonce: U256,
}

/// Sign the multichain enable digest with the owner's module and assemble the enable payload
/// for the chain at `chain_index`.
pub async fn prepare_enable_session(
    owner: &impl Validator,
    session: Session,
    smart_sessions: Address,
    mode: SmartSessionMode,
    chains: &[SessionChainContext],
    chain_index: u8,
) -> Result<EnableSession> {
    if !mode.is_enable() {
        return Err(ConfigError::InvalidConfig(format!("{mode:?} mode does not enable a session")).into());
    }
    if usize::from(chain_index) >= chains.len() {
        return Err(ConfigError::InvalidConfig(format!(
            "chain index {chain_index} out of range for {} chains",
            chains.len()
        ))
        .into());
    }
    let digests: Vec<ChainDigest> = chains
        .iter()
        .map(|ctx| ChainDigest {
            chainId: ctx.chain_id,
            sessionDigest: session_digest(&session, ctx.account, smart_sessions, mode, ctx.nonce),
        })
        .collect();
    let digest = multichain_digest(&digests);
    debug!(%digest, chains = digests.len(), "signing session enable digest");

    let sig = owner.sign_message(digest.as_slice()).await?;
    let enable_sig = prefix_validator(owner.address(), &sig);
    Ok(enable_session(session, digests, chain_index, enable_sig))
}

pub async fn is_permission_enabled(
    chain: &impl ChainClient,
    smart_sessions: Address,
    permission_id: B256,
    account: Address,
) -> Result<bool> {
    let data = ISmartSession::isPermissionEnabledCall { permissionId: permission_id, account }.abi_encode();
    let out = chain.call(smart_sessions, data.into()).await?;
    let ret = ISmartSession::isPermissionEnabledCall::abi_decode_returns(&out, true).map_err(DecodeError::from)?;
    Ok(ret._0)
}

pub async fn session_nonce(
    chain: &impl ChainClient,
    smart_sessions: Address,
    permission_id: B256,
    account: Address,
) -> Result<U256> {
    let data = ISmartSession::getNonceCall { permissionId: permission_id, account }.abi_encode();
    let out = chain.call(smart_sessions, data.into()).await?;
    let ret = ISmartSession::getNonceCall::abi_decode_returns(&out, true).map_err(DecodeError::from)?;
    Ok(ret._0)
}

/// USE when the permission is already enabled on-chain, otherwise ENABLE.
pub async fn select_mode(
    chain: &impl ChainClient,
    smart_sessions: Address,
    permission_id: B256,
    account: Address,
) -> Result<SmartSessionMode> {
    let enabled = is_permission_enabled(chain, smart_sessions, permission_id, account).await?;
    let mode = if enabled { SmartSessionMode::Use } else { SmartSessionMode::Enable };
    info!(%permission_id, %account, ?mode, "selected session mode");
    Ok(mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::policies::ParamRuleInput;
    use alloy_primitives::FixedBytes;
    use nexus_account_types::ParamCondition;

    fn contracts() -> SessionContracts {
        SessionContracts {
            smart_sessions: Address::repeat_byte(0x50),
            ownable_validator: Address::repeat_byte(0x51),
            sudo_policy: Address::repeat_byte(0x52),
            time_frame_policy: Address::repeat_byte(0x53),
            universal_action_policy: Address::repeat_byte(0x54),
        }
    }

    fn action(target: u8, rules: usize) -> ActionPolicyData {
        ActionPolicyData {
            target: Address::repeat_byte(target),
            selector: FixedBytes::from([0xa9, 0x05, 0x9c, 0xbb]),
            valid_until: Some(1_900_000_000),
            valid_after: None,
            value_limit_per_use: U256::ZERO,
            rules: (0..rules)
                .map(|i| ParamRuleInput {
                    condition: ParamCondition::Equal,
                    offset: 32 * i as u64,
                    reference: B256::ZERO,
                    usage: None,
                })
                .collect(),
        }
    }

    #[test]
    fn session_validator_is_single_owner_ownable() {
        let key = Address::repeat_byte(0x99);
        let request = SessionRequest { session_public_key: key, actions: vec![action(1, 0)], salt: B256::ZERO };
        let session = build_session(&request, &contracts()).unwrap();
        assert_eq!(session.sessionValidator, contracts().ownable_validator);
        assert_eq!(session.sessionValidatorInitData, ownable_init_data(1, &[key]));
        assert_eq!(session.actions.len(), 1);
    }

    #[test]
    fn action_order_does_not_change_session() {
        let key = Address::repeat_byte(0x99);
        let a = SessionRequest { session_public_key: key, actions: vec![action(1, 1), action(2, 0)], salt: B256::ZERO };
        let b = SessionRequest { session_public_key: key, actions: vec![action(2, 0), action(1, 1)], salt: B256::ZERO };
        assert_eq!(build_session(&a, &contracts()).unwrap(), build_session(&b, &contracts()).unwrap());
    }

    #[test]
    fn same_target_actions_are_ordered_by_rule_contents() {
        let with_reference = |byte: u8| {
            let mut a = action(1, 1);
            a.rules[0].reference = B256::with_last_byte(byte);
            a
        };
        let key = Address::repeat_byte(0x99);
        let forward = SessionRequest {
            session_public_key: key,
            actions: vec![with_reference(1), with_reference(2)],
            salt: B256::ZERO,
        };
        let reverse = SessionRequest {
            session_public_key: key,
            actions: vec![with_reference(2), with_reference(1)],
            salt: B256::ZERO,
        };
        let (x, y) = (build_session(&forward, &contracts()).unwrap(), build_session(&reverse, &contracts()).unwrap());
        assert_eq!(x, y);
        let account = Address::repeat_byte(0xac);
        assert_eq!(
            permission::session_digest(&x, account, contracts().smart_sessions, SmartSessionMode::Enable, U256::ZERO),
            permission::session_digest(&y, account, contracts().smart_sessions, SmartSessionMode::Enable, U256::ZERO),
        );
    }

    #[test]
    fn rule_limit_checked_for_every_action() {
        let request = SessionRequest {
            session_public_key: Address::ZERO,
            actions: vec![action(1, 16), action(2, 17)],
            salt: B256::ZERO,
        };
        assert_eq!(
            build_session(&request, &contracts()),
            Err(ConfigError::TooManyParamRules { count: 17, max: 16 })
        );
    }
}
