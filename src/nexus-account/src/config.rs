//! Account configuration: contract address book and account parameters.
//!
//! Loaded from JSON, e.g.
//!
//! ```json
//! {
//!   "chain_id": 84532,
//!   "factory": "0x…",
//!   "implementation": "0x…",
//!   "k1_validator": "0x…",
//!   "attesters": ["0x…"],
//!   "attester_threshold": 1,
//!   "sessions": { "smart_sessions": "0x…", "ownable_validator": "0x…", … }
//! }
//! ```

use std::path::Path;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    address::AccountIdentity,
    errors::ConfigError,
    nexus::constants::{ACCOUNT_DOMAIN_NAME, ACCOUNT_DOMAIN_VERSION, ENTRY_POINT_V07},
    sessions::SessionContracts,
    typed_data::AccountDomain,
};

fn default_entry_point() -> Address {
    ENTRY_POINT_V07
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainConfig {
    pub name: String,
    pub version: String,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self { name: ACCOUNT_DOMAIN_NAME.to_string(), version: ACCOUNT_DOMAIN_VERSION.to_string() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub chain_id: u64,
    #[serde(default = "default_entry_point")]
    pub entry_point: Address,
    pub factory: Address,
    pub implementation: Address,
    pub k1_validator: Address,
    #[serde(default)]
    pub attesters: Vec<Address>,
    #[serde(default)]
    pub attester_threshold: u8,
    #[serde(default)]
    pub account_domain: DomainConfig,
    #[serde(default)]
    pub sessions: Option<SessionContracts>,
    /// Skip derivation and use this address.
    #[serde(default)]
    pub account_address: Option<Address>,
}

impl AccountConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::InvalidConfig(format!("reading {}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain_id == 0 {
            return Err(ConfigError::InvalidConfig("chain_id must be non-zero".into()));
        }
        for (name, addr) in [
            ("entry_point", self.entry_point),
            ("factory", self.factory),
            ("implementation", self.implementation),
            ("k1_validator", self.k1_validator),
        ] {
            if addr.is_zero() {
                return Err(ConfigError::InvalidConfig(format!("{name} must be set")));
            }
        }
        if usize::from(self.attester_threshold) > self.attesters.len() {
            return Err(ConfigError::InvalidThreshold {
                threshold: usize::from(self.attester_threshold),
                owners: self.attesters.len(),
            });
        }
        let mut attesters = self.attesters.clone();
        attesters.sort();
        if let Some(dup) = attesters.windows(2).find(|w| w[0] == w[1]) {
            return Err(ConfigError::InvalidConfig(format!("attester {} listed twice", dup[0])));
        }
        Ok(())
    }

    pub fn identity(&self, owner: Address, index: U256) -> AccountIdentity {
        AccountIdentity {
            owner,
            index,
            factory: self.factory,
            implementation: self.implementation,
            attesters: self.attesters.clone(),
            attester_threshold: self.attester_threshold,
        }
    }

    pub fn account_domain(&self, account: Address) -> AccountDomain {
        AccountDomain {
            name: self.account_domain.name.clone(),
            version: self.account_domain.version.clone(),
            chain_id: self.chain_id,
            verifying_contract: account,
            salt: Default::default(),
        }
    }

    pub fn session_contracts(&self) -> Result<SessionContracts, ConfigError> {
        self.sessions.ok_or_else(|| ConfigError::InvalidConfig("sessions contracts are not configured".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "chain_id": 84532,
        "factory": "0x00000bb19a3579F4D779215dEf97AFbd0e30DB55",
        "implementation": "0x000000004F43C49e93C970E84001853a70923B03",
        "k1_validator": "0x00000004171351c442B202678c48D8AB5B321E8f",
        "attesters": ["0x000000333034E9f539ce08819E12c1b8Cb29084d"],
        "attester_threshold": 1
    }"#;

    #[test]
    fn defaults_entry_point_and_domain() {
        let config = AccountConfig::from_json_str(CONFIG).unwrap();
        assert_eq!(config.entry_point, ENTRY_POINT_V07);
        assert_eq!(config.account_domain, DomainConfig::default());
        assert!(config.sessions.is_none());
        assert!(config.session_contracts().is_err());
    }

    #[test]
    fn threshold_above_attester_count_is_rejected() {
        let json = CONFIG.replace("\"attester_threshold\": 1", "\"attester_threshold\": 2");
        assert_eq!(
            AccountConfig::from_json_str(&json),
            Err(ConfigError::InvalidThreshold { threshold: 2, owners: 1 })
        );
    }

    #[test]
    fn missing_contracts_are_rejected() {
        let json = CONFIG.replace(
            "0x00000bb19a3579F4D779215dEf97AFbd0e30DB55",
            "0x0000000000000000000000000000000000000000",
        );
        assert!(matches!(AccountConfig::from_json_str(&json), Err(ConfigError::InvalidConfig(_))));
        assert!(matches!(AccountConfig::from_json_str("{"), Err(ConfigError::InvalidConfig(_))));
    }
}
