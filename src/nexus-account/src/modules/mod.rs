//! Validation modules and the active-module manager.
//!
//! Every validator exposes the same capabilities through [`Validator`]; [`ValidationModule`]
//! is the closed set the engine ships with. The active module is held by a
//! [`ModuleManager`] that callers pass to signing and nonce-key selection explicitly.

pub mod install;
pub mod k1;
pub mod ownable;
pub mod session;

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use nexus_account_types::ModuleType;
use tracing::info;

use crate::errors::Result;
pub use k1::K1Validator;
pub use ownable::OwnableValidator;
pub use session::SmartSessionValidator;

#[async_trait]
pub trait Validator: Send + Sync {
    fn address(&self) -> Address;

    fn module_type(&self) -> ModuleType {
        ModuleType::Validator
    }

    fn init_data(&self) -> Bytes;

    /// Placeholder with the final signature's shape, for gas estimation.
    fn dummy_signature(&self) -> Result<Bytes>;

    async fn sign_user_op_hash(&self, hash: B256) -> Result<Bytes>;

    async fn sign_message(&self, message: &[u8]) -> Result<Bytes>;

    /// Sign an already-final digest (EIP-712 / ERC-7739) without a personal-message prefix.
    async fn sign_hash(&self, hash: B256) -> Result<Bytes>;
}

#[derive(Clone)]
pub enum ValidationModule {
    K1(K1Validator),
    Ownable(OwnableValidator),
    Session(SmartSessionValidator),
}

impl ValidationModule {
    fn inner(&self) -> &dyn Validator {
        match self {
            ValidationModule::K1(m) => m,
            ValidationModule::Ownable(m) => m,
            ValidationModule::Session(m) => m,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ValidationModule::K1(_) => "k1",
            ValidationModule::Ownable(_) => "ownable",
            ValidationModule::Session(_) => "session",
        }
    }
}

impl std::fmt::Debug for ValidationModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationModule")
            .field("kind", &self.kind())
            .field("address", &self.address())
            .finish()
    }
}

#[async_trait]
impl Validator for ValidationModule {
    fn address(&self) -> Address {
        self.inner().address()
    }

    fn module_type(&self) -> ModuleType {
        self.inner().module_type()
    }

    fn init_data(&self) -> Bytes {
        self.inner().init_data()
    }

    fn dummy_signature(&self) -> Result<Bytes> {
        self.inner().dummy_signature()
    }

    async fn sign_user_op_hash(&self, hash: B256) -> Result<Bytes> {
        self.inner().sign_user_op_hash(hash).await
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
        self.inner().sign_message(message).await
    }

    async fn sign_hash(&self, hash: B256) -> Result<Bytes> {
        self.inner().sign_hash(hash).await
    }
}

impl From<K1Validator> for ValidationModule {
    fn from(m: K1Validator) -> Self {
        ValidationModule::K1(m)
    }
}

impl From<OwnableValidator> for ValidationModule {
    fn from(m: OwnableValidator) -> Self {
        ValidationModule::Ownable(m)
    }
}

impl From<SmartSessionValidator> for ValidationModule {
    fn from(m: SmartSessionValidator) -> Self {
        ValidationModule::Session(m)
    }
}

/// Holds the validator that signs for the account.
#[derive(Debug, Clone)]
pub struct ModuleManager {
    active: ValidationModule,
}

impl ModuleManager {
    pub fn new(active: impl Into<ValidationModule>) -> Self {
        Self { active: active.into() }
    }

    pub fn active(&self) -> &ValidationModule {
        &self.active
    }

    pub fn active_mut(&mut self) -> &mut ValidationModule {
        &mut self.active
    }

    /// Replace the active module, returning the previous one.
    pub fn set_active(&mut self, module: impl Into<ValidationModule>) -> ValidationModule {
        let module = module.into();
        info!(kind = module.kind(), address = %module.address(), "switching active validation module");
        std::mem::replace(&mut self.active, module)
    }
}
