use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Errors from collaborators, re-exported from the shared crate.
pub use nexus_account_types::ChainError;

/// Configuration errors. Raised synchronously, before any network interaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("signer {0} is not an owner of the threshold set")]
    MissingOwner(Address),
    #[error("owner {0} appears more than once")]
    DuplicateOwner(Address),
    #[error("threshold {threshold} is invalid for {owners} owners")]
    InvalidThreshold { threshold: usize, owners: usize },
    #[error("action policy has {count} rules; at most {max} are allowed")]
    TooManyParamRules { count: usize, max: usize },
    #[error("enable framing requested without session enable data")]
    MissingEnableData,
    #[error("no call target supplied")]
    MissingTarget,
    #[error("fallback module requires a function selector")]
    MissingSelector,
    #[error("unknown module type id {0}")]
    UnknownModuleType(U256),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors while decoding engine payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("input truncated")]
    Truncated,
    #[error("expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
    #[error("reserved bytes are not zero")]
    ReservedBitsSet,
    #[error("unknown call type 0x{0:02x}")]
    UnknownCallType(u8),
    #[error("unknown exec type 0x{0:02x}")]
    UnknownExecType(u8),
    #[error("unknown validation mode 0x{0:02x}")]
    UnknownValidationMode(u8),
    #[error("unknown session mode 0x{0:02x}")]
    UnknownSessionMode(u8),
    #[error("unexpected selector 0x{0}")]
    UnexpectedSelector(String),
    #[error("signature is not ERC-6492 wrapped")]
    NotWrapped,
    #[error("malformed compressed payload")]
    InvalidCompression,
    #[error("abi decoding failed: {0}")]
    Abi(String),
    #[error("typed data error: {0}")]
    TypedData(String),
}

impl From<alloy_sol_types::Error> for DecodeError {
    fn from(err: alloy_sol_types::Error) -> Self {
        DecodeError::Abi(err.to_string())
    }
}

/// Relayer / verifier rejections, classified by the diagnostic catalog in [`crate::relayer`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayerError {
    #[error("execution reverted: {reason}")]
    ExecutionReverted { reason: String },
    #[error("insufficient funds to pay for the operation: {cause}")]
    InsufficientFunds { cause: String },
    #[error("invalid account nonce: {cause}")]
    InvalidNonce { cause: String },
    #[error("signature validation failed: {cause}")]
    InvalidSignature { cause: String },
    #[error("sender already deployed but init code supplied: {cause}")]
    SenderAlreadyConstructed { cause: String },
    #[error("account deployment failed: {cause}")]
    InitCodeFailed { cause: String },
    #[error("sender has no code and no init code: {cause}")]
    SenderNotDeployed { cause: String },
    #[error("paymaster rejected the operation: {cause}")]
    PaymasterRejected { cause: String },
    #[error("gas limits too low: {cause}")]
    GasTooLow { cause: String },
    #[error("unknown node error: {cause}")]
    UnknownNode { cause: String },
}

/// Umbrella error for account-level operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Relayer(#[from] RelayerError),
    #[error("counterfactual address resolution failed: {0}")]
    ResolutionFailed(String),
    #[error("module {0} is not installed")]
    ModuleNotInstalled(Address),
    #[error("installed-module list is malformed: {0}")]
    InvalidModuleList(String),
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("chain query failed: {0}")]
    Chain(#[from] ChainError),
}

pub type Result<T, E = AccountError> = std::result::Result<T, E>;
