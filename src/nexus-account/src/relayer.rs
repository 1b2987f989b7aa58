//! Bundler diagnostic catalog.
//!
//! Bundlers report EntryPoint failures as free text carrying `AAxx` codes. The catalog maps
//! those onto [`RelayerError`]; unmatched text becomes `UnknownNode` with the text kept.

use std::sync::OnceLock;

use regex::Regex;

use crate::errors::{ChainError, RelayerError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    SenderAlreadyConstructed,
    InitCodeFailed,
    SenderNotDeployed,
    InsufficientFunds,
    InvalidSignature,
    InvalidNonce,
    PaymasterRejected,
    GasTooLow,
}

impl Kind {
    fn into_error(self, cause: String) -> RelayerError {
        match self {
            Kind::SenderAlreadyConstructed => RelayerError::SenderAlreadyConstructed { cause },
            Kind::InitCodeFailed => RelayerError::InitCodeFailed { cause },
            Kind::SenderNotDeployed => RelayerError::SenderNotDeployed { cause },
            Kind::InsufficientFunds => RelayerError::InsufficientFunds { cause },
            Kind::InvalidSignature => RelayerError::InvalidSignature { cause },
            Kind::InvalidNonce => RelayerError::InvalidNonce { cause },
            Kind::PaymasterRejected => RelayerError::PaymasterRejected { cause },
            Kind::GasTooLow => RelayerError::GasTooLow { cause },
        }
    }
}

pub struct RelayerErrorCatalog {
    rules: Vec<(Regex, Kind)>,
    reverted: Regex,
}

impl RelayerErrorCatalog {
    pub fn new() -> Result<Self, regex::Error> {
        let table = [
            (r"\bAA10\b", Kind::SenderAlreadyConstructed),
            (r"\bAA1[345]\b", Kind::InitCodeFailed),
            (r"\bAA20\b", Kind::SenderNotDeployed),
            (r"\bAA21\b|(?i)insufficient funds", Kind::InsufficientFunds),
            (r"\bAA2[234]\b|(?i)invalid signature", Kind::InvalidSignature),
            (r"\bAA25\b|(?i)invalid (account )?nonce", Kind::InvalidNonce),
            (r"\bAA3\d\b", Kind::PaymasterRejected),
            (r"\bAA(4[01]|51)\b|(?i)gas (limit )?too low|pre-?verification ?gas", Kind::GasTooLow),
        ];
        let rules = table
            .into_iter()
            .map(|(pattern, kind)| Regex::new(pattern).map(|re| (re, kind)))
            .collect::<Result<Vec<_>, _>>()?;
        let reverted = Regex::new(r"(?i)^\s*execution reverted(?::\s*(.*))?")?;
        Ok(Self { rules, reverted })
    }

    /// A leading `execution reverted` wins over any code or keyword in the revert reason.
    pub fn classify(&self, diagnostic: &str) -> RelayerError {
        if let Some(caps) = self.reverted.captures(diagnostic) {
            let reason = caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
            return RelayerError::ExecutionReverted { reason };
        }
        for (re, kind) in &self.rules {
            if re.is_match(diagnostic) {
                return kind.into_error(diagnostic.to_string());
            }
        }
        RelayerError::UnknownNode { cause: diagnostic.to_string() }
    }
}

fn catalog() -> Option<&'static RelayerErrorCatalog> {
    static CATALOG: OnceLock<Option<RelayerErrorCatalog>> = OnceLock::new();
    CATALOG.get_or_init(|| RelayerErrorCatalog::new().ok()).as_ref()
}

/// Classify a bundler diagnostic string.
pub fn classify(diagnostic: &str) -> RelayerError {
    match catalog() {
        Some(catalog) => catalog.classify(diagnostic),
        None => RelayerError::UnknownNode { cause: diagnostic.to_string() },
    }
}

/// Classify a collaborator failure raised while talking to the bundler.
pub fn classify_chain_error(err: &ChainError) -> RelayerError {
    match err {
        ChainError::Rpc { message, .. } => classify(message),
        ChainError::Reverted(data) => RelayerError::ExecutionReverted { reason: data.to_string() },
        other => RelayerError::UnknownNode { cause: other.to_string() },
    }
}
