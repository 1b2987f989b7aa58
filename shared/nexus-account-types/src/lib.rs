//! Shared types for the Nexus account engine (wire tags, user operations, collaborators).
//!
//! Everything in here is either a fixed protocol tag or a plain record; the encoders and
//! signers that consume these types live in `nexus-account`.

pub mod chain;
pub mod modes;
pub mod user_op;

pub use chain::{Bundler, ChainClient, ChainError, GasEstimate, GasFees, UserOperationReceipt};
pub use modes::{
    CallType, ExecType, ModuleType, ParamCondition, SmartSessionMode, ValidationMode,
};
pub use user_op::UserOperation;
