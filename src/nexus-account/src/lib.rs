//! Client engine for Nexus smart accounts (ERC-4337 v0.7 / ERC-7579).
//!
//! Builds byte-exact payloads the account, the EntryPoint and the Smart Sessions module
//! verify: counterfactual addresses, nonce keys, execution call data, module management
//! calls, user operation and ERC-1271 signatures (ERC-6492, ERC-7739) and session-key
//! signatures. Chain and bundler access go through the traits in `nexus-account-types`.

pub mod account;
pub mod address;
pub mod config;
pub mod errors;
pub mod execution;
pub mod mock;
pub mod modules;
pub mod nexus;
pub mod nonce;
pub mod relayer;
pub mod sessions;
pub mod signature;
pub mod signer;
pub mod typed_data;
pub mod user_op;
pub mod utils;

mod tests;

pub use account::{NexusAccount, PrepareOptions};
pub use address::{AccountIdentity, SenderAddressConvention};
pub use config::AccountConfig;
pub use errors::{AccountError, ConfigError, DecodeError, RelayerError, Result};
pub use execution::Call;
pub use modules::{ModuleManager, ValidationModule, Validator};
pub use nexus_account_types::{
    Bundler, CallType, ChainClient, ChainError, ExecType, GasEstimate, GasFees, ModuleType, ParamCondition,
    SmartSessionMode, UserOperation, UserOperationReceipt, ValidationMode,
};
pub use nonce::{NonceKey, NonceOptions};
pub use signature::Deployment;
pub use signer::{AccountSigner, LocalSigner, SharedSigner};
pub use typed_data::TypedData;
