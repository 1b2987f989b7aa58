//! Permission ids and session enable digests.
//!
//! Notes:
//! - The permission id covers only the session validator, its init data and the salt, so
//!   reordering policies or actions never changes it.
//! - Enable digests are EIP-712 struct hashes under the fixed `SmartSession` domain; the
//!   owner signs the multichain digest over every `(chainId, sessionDigest)` pair.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolValue;
use nexus_account_types::SmartSessionMode;

use crate::{
    nexus::interfaces::{ActionData, ChainDigest, ERC7739Data, EnableSession, PolicyData, Session},
    utils::bytes::{address_word, u64_word},
};

const POLICY_DATA_TYPE: &str = "PolicyData(address policy,bytes initData)";
const ACTION_DATA_TYPE: &str =
    "ActionData(bytes4 actionTargetSelector,address actionTarget,PolicyData[] actionPolicies)";
const ERC7739_DATA_TYPE: &str = "ERC7739Data(string[] allowedERC7739Content,PolicyData[] erc1271Policies)";
const SESSION_TYPE: &str = "SessionEIP712(address account,address smartSession,uint8 mode,address sessionValidator,bytes32 salt,bytes sessionValidatorInitData,PolicyData[] userOpPolicies,ERC7739Data erc7739Policies,ActionData[] actions,uint256 nonce)";
const CHAIN_SESSION_TYPE: &str = "ChainSession(uint64 chainId,SessionEIP712 session)";
const MULTI_CHAIN_SESSION_TYPE: &str = "MultiChainSession(ChainSession[] sessionsAndChainIds)";

const SMART_SESSION_DOMAIN_TYPE: &str = "EIP712Domain(string name,string version)";
const SMART_SESSION_DOMAIN_NAME: &str = "SmartSession";
const SMART_SESSION_DOMAIN_VERSION: &str = "1";

fn type_hash(parts: &[&str]) -> B256 {
    keccak256(parts.concat())
}

pub fn permission_id(session: &Session) -> B256 {
    let encoded = (
        session.sessionValidator,
        session.sessionValidatorInitData.clone(),
        session.salt,
    )
        .abi_encode_params();
    keccak256(encoded)
}

fn hash_policy(policy: &PolicyData) -> B256 {
    let mut buf = Vec::with_capacity(96);
    buf.extend_from_slice(type_hash(&[POLICY_DATA_TYPE]).as_slice());
    buf.extend_from_slice(&address_word(policy.policy));
    buf.extend_from_slice(keccak256(&policy.initData).as_slice());
    keccak256(buf)
}

fn hash_words(items: impl Iterator<Item = B256>) -> B256 {
    let mut buf = Vec::new();
    for item in items {
        buf.extend_from_slice(item.as_slice());
    }
    keccak256(buf)
}

fn hash_policies(policies: &[PolicyData]) -> B256 {
    hash_words(policies.iter().map(hash_policy))
}

fn hash_action(action: &ActionData) -> B256 {
    let mut selector_word = [0u8; 32];
    selector_word[..4].copy_from_slice(action.actionTargetSelector.as_slice());

    let mut buf = Vec::with_capacity(128);
    buf.extend_from_slice(type_hash(&[ACTION_DATA_TYPE, POLICY_DATA_TYPE]).as_slice());
    buf.extend_from_slice(&selector_word);
    buf.extend_from_slice(&address_word(action.actionTarget));
    buf.extend_from_slice(hash_policies(&action.actionPolicies).as_slice());
    keccak256(buf)
}

fn hash_erc7739(data: &ERC7739Data) -> B256 {
    let contents = hash_words(data.allowedERC7739Content.iter().map(|s| keccak256(s.as_bytes())));
    let mut buf = Vec::with_capacity(96);
    buf.extend_from_slice(type_hash(&[ERC7739_DATA_TYPE, POLICY_DATA_TYPE]).as_slice());
    buf.extend_from_slice(contents.as_slice());
    buf.extend_from_slice(hash_policies(&data.erc1271Policies).as_slice());
    keccak256(buf)
}

/// Per-chain digest of a session bound to an account, its mode and the session nonce.
pub fn session_digest(
    session: &Session,
    account: Address,
    smart_session: Address,
    mode: SmartSessionMode,
    nonce: U256,
) -> B256 {
    let typehash = type_hash(&[SESSION_TYPE, ACTION_DATA_TYPE, ERC7739_DATA_TYPE, POLICY_DATA_TYPE]);
    let mut mode_word = [0u8; 32];
    mode_word[31] = mode as u8;

    let mut buf = Vec::with_capacity(32 * 11);
    buf.extend_from_slice(typehash.as_slice());
    buf.extend_from_slice(&address_word(account));
    buf.extend_from_slice(&address_word(smart_session));
    buf.extend_from_slice(&mode_word);
    buf.extend_from_slice(&address_word(session.sessionValidator));
    buf.extend_from_slice(session.salt.as_slice());
    buf.extend_from_slice(keccak256(&session.sessionValidatorInitData).as_slice());
    buf.extend_from_slice(hash_policies(&session.userOpPolicies).as_slice());
    buf.extend_from_slice(hash_erc7739(&session.erc7739Policies).as_slice());
    buf.extend_from_slice(hash_words(session.actions.iter().map(hash_action)).as_slice());
    buf.extend_from_slice(&nonce.to_be_bytes::<32>());
    keccak256(buf)
}

fn smart_session_domain_separator() -> B256 {
    let mut buf = Vec::with_capacity(96);
    buf.extend_from_slice(type_hash(&[SMART_SESSION_DOMAIN_TYPE]).as_slice());
    buf.extend_from_slice(keccak256(SMART_SESSION_DOMAIN_NAME).as_slice());
    buf.extend_from_slice(keccak256(SMART_SESSION_DOMAIN_VERSION).as_slice());
    keccak256(buf)
}

fn hash_chain_digest(digest: &ChainDigest) -> B256 {
    let typehash = type_hash(&[
        CHAIN_SESSION_TYPE,
        ACTION_DATA_TYPE,
        ERC7739_DATA_TYPE,
        POLICY_DATA_TYPE,
        SESSION_TYPE,
    ]);
    let mut buf = Vec::with_capacity(96);
    buf.extend_from_slice(typehash.as_slice());
    buf.extend_from_slice(&u64_word(digest.chainId));
    buf.extend_from_slice(digest.sessionDigest.as_slice());
    keccak256(buf)
}

/// EIP-712 digest the owner signs to authorize a session on every listed chain.
pub fn multichain_digest(digests: &[ChainDigest]) -> B256 {
    let typehash = type_hash(&[
        MULTI_CHAIN_SESSION_TYPE,
        ACTION_DATA_TYPE,
        CHAIN_SESSION_TYPE,
        ERC7739_DATA_TYPE,
        POLICY_DATA_TYPE,
        SESSION_TYPE,
    ]);
    let mut struct_buf = Vec::with_capacity(64);
    struct_buf.extend_from_slice(typehash.as_slice());
    struct_buf.extend_from_slice(hash_words(digests.iter().map(hash_chain_digest)).as_slice());
    let struct_hash = keccak256(struct_buf);

    let mut buf = Vec::with_capacity(66);
    buf.extend_from_slice(&[0x19, 0x01]);
    buf.extend_from_slice(smart_session_domain_separator().as_slice());
    buf.extend_from_slice(struct_hash.as_slice());
    keccak256(buf)
}

/// Enable payload for `session` on the chain at `chain_index`, carrying the owner's
/// (validator-prefixed) signature over [`multichain_digest`].
pub fn enable_session(
    session: Session,
    hashes_and_chain_ids: Vec<ChainDigest>,
    chain_index: u8,
    permission_enable_sig: Bytes,
) -> EnableSession {
    EnableSession {
        chainDigestIndex: chain_index,
        hashesAndChainIds: hashes_and_chain_ids,
        sessionToEnable: session,
        permissionEnableSig: permission_enable_sig,
    }
}
