//! Module install / uninstall call data and installed-module queries.
//!
//! Notes:
//! - Fallback install data is `selector(4) || callType(1) || handlerInit`.
//! - Validators and executors live in on-chain linked lists; uninstalling needs the
//!   previous entry (`SENTINEL` for the head) encoded as `abi.encode(prev, deinit)`.
//! - Fallback uninstall data is `selector(4) || deinit`; hooks take `deinit` unchanged.

use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use alloy_sol_types::{SolCall, SolValue};
use nexus_account_types::{CallType, ChainClient, ModuleType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    errors::{AccountError, ConfigError, DecodeError, Result},
    nexus::{
        constants::{MAX_MODULE_PAGES, MODULE_PAGE_SIZE, SENTINEL_ADDRESS},
        interfaces::INexus,
    },
};

/// One module to install or uninstall.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRequest {
    pub type_id: U256,
    pub module: Address,
    /// Install init data or uninstall deinit data.
    #[serde(default)]
    pub data: Bytes,
    /// Fallback handlers only.
    #[serde(default)]
    pub selector: Option<FixedBytes<4>>,
    #[serde(default = "default_call_type")]
    pub call_type: CallType,
}

fn default_call_type() -> CallType {
    CallType::Single
}

impl ModuleRequest {
    pub fn new(module_type: ModuleType, module: Address, data: Bytes) -> Self {
        Self { type_id: module_type.id(), module, data, selector: None, call_type: CallType::Single }
    }

    pub fn fallback(module: Address, selector: FixedBytes<4>, call_type: CallType, data: Bytes) -> Self {
        Self { type_id: ModuleType::Fallback.id(), module, data, selector: Some(selector), call_type }
    }

    pub fn module_type(&self) -> Result<ModuleType, ConfigError> {
        ModuleType::try_from(self.type_id).map_err(|_| ConfigError::UnknownModuleType(self.type_id))
    }

    fn selector(&self) -> Result<FixedBytes<4>, ConfigError> {
        self.selector.ok_or(ConfigError::MissingSelector)
    }
}

pub fn encode_install(request: &ModuleRequest) -> Result<Bytes, ConfigError> {
    let module_type = request.module_type()?;
    let init = match module_type {
        ModuleType::Fallback => {
            let mut buf = Vec::with_capacity(5 + request.data.len());
            buf.extend_from_slice(request.selector()?.as_slice());
            buf.push(request.call_type as u8);
            buf.extend_from_slice(&request.data);
            Bytes::from(buf)
        }
        _ => request.data.clone(),
    };
    debug!(?module_type, module = %request.module, "encoding module install");
    Ok(INexus::installModuleCall { moduleTypeId: module_type.id(), module: request.module, initData: init }
        .abi_encode()
        .into())
}

pub fn encode_uninstall(request: &ModuleRequest, prev: Address) -> Result<Bytes, ConfigError> {
    let module_type = request.module_type()?;
    let deinit = match module_type {
        ModuleType::Validator | ModuleType::Executor => {
            Bytes::from((prev, request.data.clone()).abi_encode_params())
        }
        ModuleType::Fallback => {
            let mut buf = Vec::with_capacity(4 + request.data.len());
            buf.extend_from_slice(request.selector()?.as_slice());
            buf.extend_from_slice(&request.data);
            Bytes::from(buf)
        }
        ModuleType::Hook => request.data.clone(),
    };
    debug!(?module_type, module = %request.module, %prev, "encoding module uninstall");
    Ok(INexus::uninstallModuleCall { moduleTypeId: module_type.id(), module: request.module, deInitData: deinit }
        .abi_encode()
        .into())
}

/// Entry preceding `target` in an installed-module list, or the sentinel for the head.
pub fn previous_module(installed: &[Address], target: Address) -> Result<Address> {
    match installed.iter().position(|m| *m == target) {
        Some(0) => Ok(SENTINEL_ADDRESS),
        Some(i) => Ok(installed[i - 1]),
        None => Err(AccountError::ModuleNotInstalled(target)),
    }
}

/// Installed validators or executors, in linked-list order.
///
/// A cursor that does not advance, a repeated entry or more than [`MAX_MODULE_PAGES`] pages
/// is reported as [`AccountError::InvalidModuleList`].
pub async fn installed_modules(
    chain: &impl ChainClient,
    account: Address,
    module_type: ModuleType,
) -> Result<Vec<Address>> {
    let mut out: Vec<Address> = Vec::new();
    let mut cursor = SENTINEL_ADDRESS;
    let size = U256::from(MODULE_PAGE_SIZE);
    for _ in 0..MAX_MODULE_PAGES {
        let (page, next) = match module_type {
            ModuleType::Validator => {
                let data = INexus::getValidatorsPaginatedCall { cursor, size }.abi_encode();
                let raw = chain.call(account, data.into()).await?;
                let ret = INexus::getValidatorsPaginatedCall::abi_decode_returns(&raw, true)
                    .map_err(DecodeError::from)?;
                (ret.array, ret.next)
            }
            ModuleType::Executor => {
                let data = INexus::getExecutorsPaginatedCall { cursor, size }.abi_encode();
                let raw = chain.call(account, data.into()).await?;
                let ret = INexus::getExecutorsPaginatedCall::abi_decode_returns(&raw, true)
                    .map_err(DecodeError::from)?;
                (ret.array, ret.next)
            }
            other => {
                return Err(ConfigError::InvalidConfig(format!("{other:?} modules are not listed on-chain")).into())
            }
        };
        if let Some(dup) = page.iter().find(|m| out.contains(m)) {
            return Err(AccountError::InvalidModuleList(format!("{dup} listed twice")));
        }
        let done = page.is_empty() || next == SENTINEL_ADDRESS || next == Address::ZERO;
        out.extend(page);
        if done {
            debug!(%account, ?module_type, count = out.len(), "read installed modules");
            return Ok(out);
        }
        if next == cursor {
            return Err(AccountError::InvalidModuleList(format!("cursor {cursor} did not advance")));
        }
        cursor = next;
    }
    Err(AccountError::InvalidModuleList(format!("more than {MAX_MODULE_PAGES} pages")))
}

/// Read the installed list and locate the entry preceding `target`.
pub async fn previous_installed(
    chain: &impl ChainClient,
    account: Address,
    module_type: ModuleType,
    target: Address,
) -> Result<Address> {
    let installed = installed_modules(chain, account, module_type).await?;
    previous_module(&installed, target)
}

pub async fn is_module_installed(
    chain: &impl ChainClient,
    account: Address,
    module_type: ModuleType,
    module: Address,
    context: Bytes,
) -> Result<bool> {
    let data = INexus::isModuleInstalledCall {
        moduleTypeId: module_type.id(),
        module,
        additionalContext: context,
    }
    .abi_encode();
    let raw = chain.call(account, data.into()).await?;
    let ret = INexus::isModuleInstalledCall::abi_decode_returns(&raw, true).map_err(DecodeError::from)?;
    Ok(ret._0)
}
