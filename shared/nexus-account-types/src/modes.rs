use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// ERC-7579 call type (first byte of the execution mode).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CallType {
    Single = 0x00,
    Batch = 0x01,
    DelegateCall = 0xff,
}

/// ERC-7579 exec type (second byte of the execution mode).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ExecType {
    /// Revert the whole operation if any call reverts.
    #[default]
    Default = 0x00,
    /// Keep going and emit an event for failed calls.
    Try = 0x01,
}

/// ERC-7579 module type ids. Contract-fixed, never configurable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ModuleType {
    Validator = 1,
    Executor = 2,
    Fallback = 3,
    Hook = 4,
}

/// Validation mode tag embedded in the nonce key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ValidationMode {
    #[default]
    Default = 0x00,
    /// Install-and-use a validator in the same operation.
    ModuleEnable = 0x01,
}

/// Smart Sessions signature mode (first byte of a session signature).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SmartSessionMode {
    Use = 0x00,
    Enable = 0x01,
    UnsafeEnable = 0x02,
}

/// Comparison applied by the universal action policy to one calldata word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum ParamCondition {
    Equal = 0,
    GreaterThan = 1,
    LessThan = 2,
    GreaterThanOrEqual = 3,
    LessThanOrEqual = 4,
    NotEqual = 5,
}

impl TryFrom<u8> for CallType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(CallType::Single),
            0x01 => Ok(CallType::Batch),
            0xff => Ok(CallType::DelegateCall),
            _ => Err(()),
        }
    }
}

impl TryFrom<u8> for ExecType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(ExecType::Default),
            0x01 => Ok(ExecType::Try),
            _ => Err(()),
        }
    }
}

impl TryFrom<u8> for ModuleType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use ModuleType::*;
        let ty = match value {
            1 => Validator,
            2 => Executor,
            3 => Fallback,
            4 => Hook,
            _ => return Err(()),
        };
        Ok(ty)
    }
}

impl TryFrom<U256> for ModuleType {
    type Error = ();

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        if value > U256::from(u8::MAX) {
            return Err(());
        }
        ModuleType::try_from(value.to::<u8>())
    }
}

impl ModuleType {
    pub fn id(self) -> U256 {
        U256::from(self as u8)
    }
}

impl TryFrom<u8> for ValidationMode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(ValidationMode::Default),
            0x01 => Ok(ValidationMode::ModuleEnable),
            _ => Err(()),
        }
    }
}

impl TryFrom<u8> for SmartSessionMode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(SmartSessionMode::Use),
            0x01 => Ok(SmartSessionMode::Enable),
            0x02 => Ok(SmartSessionMode::UnsafeEnable),
            _ => Err(()),
        }
    }
}

impl SmartSessionMode {
    /// Whether the signature carries the full session to enable.
    pub fn is_enable(self) -> bool {
        !matches!(self, SmartSessionMode::Use)
    }
}

impl TryFrom<u8> for ParamCondition {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use ParamCondition::*;
        let cond = match value {
            0 => Equal,
            1 => GreaterThan,
            2 => LessThan,
            3 => GreaterThanOrEqual,
            4 => LessThanOrEqual,
            5 => NotEqual,
            _ => return Err(()),
        };
        Ok(cond)
    }
}
