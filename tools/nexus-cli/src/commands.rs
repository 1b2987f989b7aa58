use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy_primitives::{aliases::U192, Address, Bytes, FixedBytes, U256};
use alloy_sol_types::SolValue;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use clap::{Subcommand, ValueEnum};
use nexus_account::{
    execution::{encode_execute, encode_execute_delegate},
    modules::{
        install::{encode_install, encode_uninstall, ModuleRequest},
        K1Validator,
    },
    nexus::constants::SENTINEL_ADDRESS,
    nonce::compose_nonce,
    sessions::{
        build_session, permission::session_digest, permission_id, prepare_enable_session, SessionChainContext,
        SessionRequest,
    },
    AccountConfig, AccountSigner, Call, CallType, ChainClient, ChainError, ExecType, ModuleManager, ModuleType,
    NexusAccount, NonceKey, SmartSessionMode, TypedData, ValidationMode,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::Cli;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Counterfactual account address and its deployment payload.
    Address {
        /// Owner address; defaults to the address of the owner key.
        #[arg(long)]
        owner: Option<Address>,
    },
    /// Nonce key (and full nonce) for a validator.
    NonceKey {
        #[arg(long, value_enum, default_value_t = ModeArg::Default)]
        mode: ModeArg,
        /// Validator address; defaults to the configured K1 validator.
        #[arg(long)]
        module: Option<Address>,
        #[arg(long, default_value_t = 0)]
        sequence: u64,
    },
    /// `execute(mode, executionCalldata)` for a JSON list of calls.
    Execute {
        /// JSON array of `{ "to", "value", "data" }`, inline or as a file path.
        calls: String,
        /// Keep going when a call reverts.
        #[arg(long = "try")]
        try_mode: bool,
        /// Encode the single call as a delegatecall.
        #[arg(long, conflicts_with = "try_mode")]
        delegate: bool,
    },
    /// `installModule` / `uninstallModule` self-call.
    InstallModule {
        /// ERC-7579 module type id (1 validator, 2 executor, 3 fallback, 4 hook).
        #[arg(long = "type")]
        type_id: u8,
        #[arg(long)]
        module: Address,
        #[arg(long, default_value = "0x")]
        data: Bytes,
        /// Fallback selector.
        #[arg(long)]
        selector: Option<FixedBytes<4>>,
        #[arg(long)]
        uninstall: bool,
        /// Previous list entry; required when uninstalling a validator or executor.
        #[arg(long)]
        prev: Option<Address>,
    },
    /// Build a session from a JSON request and, with an owner key, its enable payload.
    Session {
        /// Session request JSON file.
        request: PathBuf,
        /// Smart Sessions nonce for the account.
        #[arg(long, default_value_t = 0)]
        nonce: u64,
        /// Sign the enable digest with the owner key.
        #[arg(long)]
        enable: bool,
        /// Use UNSAFE_ENABLE framing for the digest.
        #[arg(long, requires = "enable")]
        unsafe_enable: bool,
    },
    /// ERC-1271 signature over a personal message.
    SignMessage {
        message: String,
        /// Treat `message` as hex bytes.
        #[arg(long)]
        hex: bool,
        /// Account is already deployed (no ERC-6492 wrapping).
        #[arg(long)]
        deployed: bool,
    },
    /// ERC-1271 signature over EIP-712 typed data (ERC-7739 nested).
    SignTypedData {
        /// Typed data JSON file.
        file: PathBuf,
        #[arg(long)]
        deployed: bool,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Address { .. } => "address",
            Command::NonceKey { .. } => "nonce-key",
            Command::Execute { .. } => "execute",
            Command::InstallModule { .. } => "install-module",
            Command::Session { .. } => "session",
            Command::SignMessage { .. } => "sign-message",
            Command::SignTypedData { .. } => "sign-typed-data",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Default,
    ModuleEnable,
}

impl From<ModeArg> for ValidationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Default => ValidationMode::Default,
            ModeArg::ModuleEnable => ValidationMode::ModuleEnable,
        }
    }
}

/// Answers only the deployment check, from a flag.
struct OfflineChain {
    deployed: bool,
}

#[async_trait]
impl ChainClient for OfflineChain {
    async fn get_code(&self, _address: Address) -> Result<Bytes, ChainError> {
        Ok(if self.deployed { Bytes::from_static(&[0xef]) } else { Bytes::new() })
    }
}

pub async fn run(cli: &Cli, config: AccountConfig) -> Result<Value> {
    match &cli.command {
        Command::Address { owner } => {
            let owner = match owner {
                Some(owner) => *owner,
                None => cli.owner_key()?.address(),
            };
            let mut account = NexusAccount::new(config, owner, U256::from(cli.index))?;
            let identity = account.identity().clone();
            Ok(json!({
                "owner": owner,
                "index": cli.index,
                "address": account.address(),
                "salt": identity.salt(),
                "factory": identity.factory,
                "factoryData": identity.factory_data(),
                "initCode": identity.init_code(),
            }))
        }
        Command::NonceKey { mode, module, sequence } => {
            let key = NonceKey::new((*mode).into(), module.unwrap_or(config.k1_validator));
            let encoded: U192 = key.encode();
            Ok(json!({
                "key": format!("0x{}", hex::encode(key.to_bytes())),
                "nonce": compose_nonce(encoded, *sequence),
            }))
        }
        Command::Execute { calls, try_mode, delegate } => {
            let calls = read_calls(calls)?;
            let exec_type = if *try_mode { ExecType::Try } else { ExecType::Default };
            let call_data = if *delegate {
                let [call] = calls.as_slice() else {
                    return Err(anyhow!("delegatecall takes exactly one call, got {}", calls.len()));
                };
                encode_execute_delegate(call, exec_type)
            } else {
                encode_execute(&calls, exec_type)?
            };
            Ok(json!({ "calls": calls.len(), "callData": call_data }))
        }
        Command::InstallModule { type_id, module, data, selector, uninstall, prev } => {
            let module_type =
                ModuleType::try_from(*type_id).map_err(|_| anyhow!("unknown module type id {type_id}"))?;
            let request = match (module_type, selector) {
                (ModuleType::Fallback, Some(selector)) => {
                    ModuleRequest::fallback(*module, *selector, CallType::Single, data.clone())
                }
                _ => ModuleRequest::new(module_type, *module, data.clone()),
            };
            let call_data = if *uninstall {
                encode_uninstall(&request, uninstall_prev(module_type, *prev)?)?
            } else {
                encode_install(&request)?
            };
            Ok(json!({ "moduleType": *type_id, "module": module, "uninstall": uninstall, "callData": call_data }))
        }
        Command::Session { request, nonce, enable, unsafe_enable } => {
            session(cli, config, request, U256::from(*nonce), *enable, *unsafe_enable).await
        }
        Command::SignMessage { message, hex: is_hex, deployed } => {
            let bytes = if *is_hex {
                hex::decode(message.trim_start_matches("0x")).context("message is not valid hex")?
            } else {
                message.as_bytes().to_vec()
            };
            let (mut account, modules) = owner_account(cli, config)?;
            let chain = OfflineChain { deployed: *deployed };
            let signature = account.sign_message(&chain, &modules, &bytes).await?;
            Ok(json!({ "account": account.address(), "signature": signature }))
        }
        Command::SignTypedData { file, deployed } => {
            let raw = fs::read_to_string(file).with_context(|| format!("failed reading {}", file.display()))?;
            let typed = TypedData::from_json(&raw)?;
            let (mut account, modules) = owner_account(cli, config)?;
            let chain = OfflineChain { deployed: *deployed };
            let signature = account.sign_typed_data(&chain, &modules, &typed).await?;
            Ok(json!({
                "account": account.address(),
                "primaryType": typed.primary_type,
                "signature": signature,
            }))
        }
    }
}

fn owner_account(cli: &Cli, config: AccountConfig) -> Result<(NexusAccount, ModuleManager)> {
    let owner = cli.owner_key()?.shared();
    let validator = config.k1_validator;
    let account = NexusAccount::new(config, owner.address(), U256::from(cli.index))?;
    Ok((account, ModuleManager::new(K1Validator::new(validator, owner))))
}

async fn session(
    cli: &Cli,
    config: AccountConfig,
    request: &Path,
    nonce: U256,
    enable: bool,
    unsafe_enable: bool,
) -> Result<Value> {
    let contracts = config.session_contracts()?;
    let raw = fs::read_to_string(request).with_context(|| format!("failed reading {}", request.display()))?;
    let request: SessionRequest =
        serde_json::from_str(&raw).with_context(|| format!("failed parsing session request {}", request.display()))?;
    let session = build_session(&request, &contracts)?;
    let id = permission_id(&session);
    debug!(%id, actions = session.actions.len(), "built session");

    let mut out = json!({
        "permissionId": id,
        "session": Bytes::from(session.abi_encode()),
    });
    if !enable {
        return Ok(out);
    }

    let mode = if unsafe_enable { SmartSessionMode::UnsafeEnable } else { SmartSessionMode::Enable };
    let chain_id = config.chain_id;
    let (mut account, modules) = owner_account(cli, config)?;
    let ctx = SessionChainContext { chain_id, account: account.address(), nonce };
    let digest = session_digest(&session, ctx.account, contracts.smart_sessions, mode, nonce);
    let enable_session =
        prepare_enable_session(modules.active(), session, contracts.smart_sessions, mode, &[ctx], 0).await?;

    out["account"] = json!(ctx.account);
    out["sessionDigest"] = json!(digest);
    out["enableSession"] = json!(Bytes::from(enable_session.abi_encode()));
    Ok(out)
}

/// Validators and executors sit in a linked list, so their predecessor must be given.
fn uninstall_prev(module_type: ModuleType, prev: Option<Address>) -> Result<Address> {
    match (module_type, prev) {
        (ModuleType::Validator | ModuleType::Executor, Some(prev)) => Ok(prev),
        (ModuleType::Validator | ModuleType::Executor, None) => Err(anyhow!(
            "--prev is required to uninstall a {module_type:?}: pass the preceding list entry, or {SENTINEL_ADDRESS} if it is first"
        )),
        (ModuleType::Fallback | ModuleType::Hook, _) => Ok(SENTINEL_ADDRESS),
    }
}

fn read_calls(arg: &str) -> Result<Vec<Call>> {
    let raw = if arg.trim_start().starts_with('[') {
        arg.to_string()
    } else {
        fs::read_to_string(arg).with_context(|| format!("failed reading calls file {arg}"))?
    };
    serde_json::from_str(&raw).context("calls must be a JSON array of { to, value, data }")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_inline_calls() {
        let calls = read_calls(r#"[{"to":"0x4242424242424242424242424242424242424242","value":"0x3e8"}]"#).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].value, U256::from(1000u64));
        assert!(calls[0].data.is_empty());
    }

    #[test]
    fn test_uninstall_requires_prev_for_linked_modules() {
        let prev = Address::repeat_byte(0x0a);
        assert!(uninstall_prev(ModuleType::Validator, None).is_err());
        assert!(uninstall_prev(ModuleType::Executor, None).is_err());
        assert_eq!(uninstall_prev(ModuleType::Validator, Some(prev)).unwrap(), prev);
        assert_eq!(uninstall_prev(ModuleType::Hook, None).unwrap(), SENTINEL_ADDRESS);
    }

    #[tokio::test]
    async fn test_offline_chain_reports_flagged_deployment() {
        assert!(OfflineChain { deployed: false }.get_code(Address::ZERO).await.unwrap().is_empty());
        assert!(!OfflineChain { deployed: true }.get_code(Address::ZERO).await.unwrap().is_empty());
        assert_eq!(OfflineChain { deployed: true }.estimate_fees().await, Err(ChainError::NotImplemented));
    }

    #[test]
    fn test_command_names_match_subcommands() {
        use clap::CommandFactory;
        let cmd = crate::Cli::command();
        for sub in cmd.get_subcommands() {
            let name = sub.get_name();
            assert!(
                ["address", "nonce-key", "execute", "install-module", "session", "sign-message", "sign-typed-data"]
                    .contains(&name)
            );
        }
    }
}
