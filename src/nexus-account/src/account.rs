//! Per-account handle.
//!
//! Purpose:
//! - Own the account identity, its cached address and its deployment flag.
//! - Assemble, sign and submit user operations through the chain and bundler collaborators.
//! - Sign ERC-1271 messages and typed data with the deployment-aware wrapping.
//!
//! Notes:
//! - Only a positive deployment check is cached; an undeployed account is re-queried on each
//!   call because it may be deployed in between.
//! - Configuration errors (empty call lists, bad module requests) are raised before any
//!   collaborator is contacted.

use alloy_primitives::{Address, Bytes, B256, U256};
use nexus_account_types::{Bundler, ChainClient, ExecType, ModuleType, UserOperation, UserOperationReceipt};
use tracing::{debug, info};

use crate::{
    address::{has_code, simulate_sender_address, AccountIdentity, SenderAddressConvention},
    config::AccountConfig,
    errors::{AccountError, ConfigError, Result},
    execution::{encode_execute, Call},
    modules::{
        install::{encode_install, encode_uninstall, previous_installed, ModuleRequest},
        ModuleManager, Validator,
    },
    nexus::constants::SENTINEL_ADDRESS,
    nonce::{fetch_nonce, NonceOptions},
    relayer::classify_chain_error,
    signature::{self, Deployment},
    typed_data::{self, TypedData},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrepareOptions {
    pub nonce: NonceOptions,
    pub exec_type: ExecType,
}

#[derive(Debug, Clone)]
pub struct NexusAccount {
    config: AccountConfig,
    identity: AccountIdentity,
    address: Option<Address>,
    deployed: bool,
}

impl NexusAccount {
    pub fn new(config: AccountConfig, owner: Address, index: U256) -> Result<Self, ConfigError> {
        config.validate()?;
        let identity = config.identity(owner, index);
        Ok(Self { config, identity, address: None, deployed: false })
    }

    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    pub fn identity(&self) -> &AccountIdentity {
        &self.identity
    }

    /// Configured override, else the derived counterfactual address. Cached.
    pub fn address(&mut self) -> Address {
        if let Some(address) = self.address {
            return address;
        }
        let address = self.config.account_address.unwrap_or_else(|| self.identity.counterfactual_address());
        self.address = Some(address);
        address
    }

    /// Resolve the sender through `EntryPoint.getSenderAddress` and cache it. A configured
    /// address override is returned as-is without querying the chain.
    pub async fn resolve_address_onchain(&mut self, chain: &impl ChainClient) -> Result<Address> {
        if let Some(address) = self.config.account_address {
            debug!(%address, "using configured account address");
            self.address = Some(address);
            return Ok(address);
        }
        let address = simulate_sender_address(
            chain,
            self.config.entry_point,
            self.identity.init_code(),
            SenderAddressConvention::EntryPointV07,
        )
        .await?;
        if address != self.identity.counterfactual_address() {
            debug!(%address, "entry point resolved a different sender than local derivation");
        }
        self.address = Some(address);
        Ok(address)
    }

    pub async fn is_deployed(&mut self, chain: &impl ChainClient) -> Result<bool> {
        if self.deployed {
            return Ok(true);
        }
        let address = self.address();
        if has_code(chain, address).await? {
            info!(%address, "account is deployed");
            self.deployed = true;
        }
        Ok(self.deployed)
    }

    pub async fn deployment(&mut self, chain: &impl ChainClient) -> Result<Deployment> {
        if self.is_deployed(chain).await? {
            return Ok(Deployment::Deployed);
        }
        Ok(Deployment::Counterfactual {
            factory: self.identity.factory,
            factory_data: self.identity.factory_data(),
        })
    }

    pub async fn get_nonce(&mut self, chain: &impl ChainClient, modules: &ModuleManager, opts: &NonceOptions) -> U256 {
        let key = opts.resolve_key(modules.active().address());
        let sender = self.address();
        fetch_nonce(chain, self.config.entry_point, sender, key).await
    }

    /// Unsigned operation with nonce, fees and gas limits filled in.
    pub async fn prepare_user_op(
        &mut self,
        chain: &impl ChainClient,
        bundler: &impl Bundler,
        modules: &ModuleManager,
        calls: &[Call],
        opts: &PrepareOptions,
    ) -> Result<UserOperation> {
        let call_data = encode_execute(calls, opts.exec_type)?;
        let dummy = modules.active().dummy_signature()?;

        let sender = self.address();
        let (factory, factory_data) = match self.deployment(chain).await? {
            Deployment::Deployed => (None, None),
            Deployment::Counterfactual { factory, factory_data } => (Some(factory), Some(factory_data)),
        };
        let nonce = self.get_nonce(chain, modules, &opts.nonce).await;
        let fees = chain.estimate_fees().await?;

        let mut op = UserOperation {
            sender,
            nonce,
            factory,
            factory_data,
            call_data,
            max_fee_per_gas: fees.max_fee_per_gas,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            signature: dummy,
            ..Default::default()
        };

        let estimate = bundler
            .estimate_user_operation_gas(&op, self.config.entry_point)
            .await
            .map_err(|e| AccountError::Relayer(classify_chain_error(&e)))?;
        op.call_gas_limit = estimate.call_gas_limit;
        op.verification_gas_limit = estimate.verification_gas_limit;
        op.pre_verification_gas = estimate.pre_verification_gas;
        op.paymaster_verification_gas_limit = estimate.paymaster_verification_gas_limit;
        op.paymaster_post_op_gas_limit = estimate.paymaster_post_op_gas_limit;

        debug!(%sender, %nonce, calls = calls.len(), "prepared user operation");
        Ok(op)
    }

    /// Sign `op` in place with the active module; returns the user operation hash.
    pub async fn sign_user_op(&self, modules: &ModuleManager, op: &mut UserOperation) -> Result<B256> {
        let (hash, sig) = signature::sign_user_op(modules, op, self.config.entry_point, self.config.chain_id).await?;
        op.signature = sig;
        Ok(hash)
    }

    pub async fn send_user_op(
        &mut self,
        chain: &impl ChainClient,
        bundler: &impl Bundler,
        modules: &ModuleManager,
        calls: &[Call],
        opts: &PrepareOptions,
    ) -> Result<B256> {
        let mut op = self.prepare_user_op(chain, bundler, modules, calls, opts).await?;
        self.sign_user_op(modules, &mut op).await?;
        let hash = bundler
            .send_user_operation(&op, self.config.entry_point)
            .await
            .map_err(|e| AccountError::Relayer(classify_chain_error(&e)))?;
        info!(sender = %op.sender, %hash, "submitted user operation");
        Ok(hash)
    }

    /// Poll the bundler for inclusion. Timeouts belong to the bundler implementation.
    pub async fn wait_for_receipt(&self, bundler: &impl Bundler, hash: B256) -> Result<UserOperationReceipt> {
        let receipt = bundler
            .wait_for_receipt(hash)
            .await
            .map_err(|e| AccountError::Relayer(classify_chain_error(&e)))?;
        if receipt.success {
            info!(%hash, tx = %receipt.transaction_hash, "user operation included");
        } else {
            info!(%hash, reason = ?receipt.reason, "user operation reverted");
        }
        Ok(receipt)
    }

    pub async fn sign_message(
        &mut self,
        chain: &impl ChainClient,
        modules: &ModuleManager,
        message: &[u8],
    ) -> Result<Bytes> {
        let deployment = self.deployment(chain).await?;
        signature::sign_message(modules, message, &deployment).await
    }

    pub async fn sign_typed_data(
        &mut self,
        chain: &impl ChainClient,
        modules: &ModuleManager,
        typed: &TypedData,
    ) -> Result<Bytes> {
        let account = self.address();
        let domain = self.config.account_domain(account);
        let deployment = self.deployment(chain).await?;
        typed_data::sign_typed_data(modules, typed, &domain, &deployment).await
    }

    /// Self-call installing a module.
    pub fn install_module_call(&mut self, request: &ModuleRequest) -> Result<Call, ConfigError> {
        let data = encode_install(request)?;
        Ok(Call { to: self.address(), value: U256::ZERO, data })
    }

    /// Self-call uninstalling a module; validators and executors read the linked list for
    /// the previous entry.
    pub async fn uninstall_module_call(&mut self, chain: &impl ChainClient, request: &ModuleRequest) -> Result<Call> {
        let module_type = request.module_type()?;
        let account = self.address();
        let prev = match module_type {
            ModuleType::Validator | ModuleType::Executor => {
                previous_installed(chain, account, module_type, request.module).await?
            }
            ModuleType::Fallback | ModuleType::Hook => SENTINEL_ADDRESS,
        };
        let data = encode_uninstall(request, prev)?;
        Ok(Call { to: account, value: U256::ZERO, data })
    }

    pub async fn install_module(
        &mut self,
        chain: &impl ChainClient,
        bundler: &impl Bundler,
        modules: &ModuleManager,
        request: &ModuleRequest,
    ) -> Result<B256> {
        let call = self.install_module_call(request)?;
        self.send_user_op(chain, bundler, modules, &[call], &PrepareOptions::default()).await
    }

    pub async fn uninstall_module(
        &mut self,
        chain: &impl ChainClient,
        bundler: &impl Bundler,
        modules: &ModuleManager,
        request: &ModuleRequest,
    ) -> Result<B256> {
        let call = self.uninstall_module_call(chain, request).await?;
        self.send_user_op(chain, bundler, modules, &[call], &PrepareOptions::default()).await
    }
}
