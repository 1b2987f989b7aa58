//! Action policy construction.
//!
//! Each permitted action gets a time-frame policy when bounds are set, and either the
//! universal action policy (parameter rules / value limit) or the sudo policy.

use std::cmp::Ordering;

use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::SolValue;
use nexus_account_types::ParamCondition;
use serde::{Deserialize, Serialize};

use crate::{
    errors::ConfigError,
    nexus::{
        constants::MAX_PARAM_RULES,
        interfaces::{ActionConfig, ActionData, LimitUsage, ParamRule, ParamRules, PolicyData},
    },
};

/// Policy contract addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyContracts {
    pub sudo_policy: Address,
    pub time_frame_policy: Address,
    pub universal_action_policy: Address,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleUsage {
    pub limit: U256,
    #[serde(default)]
    pub used: U256,
}

/// Constraint on one 32-byte word of the call data (offset in bytes after the selector).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamRuleInput {
    pub condition: ParamCondition,
    pub offset: u64,
    pub reference: B256,
    #[serde(default)]
    pub usage: Option<RuleUsage>,
}

/// Caller description of one permitted action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPolicyData {
    pub target: Address,
    pub selector: FixedBytes<4>,
    #[serde(default)]
    pub valid_until: Option<u64>,
    #[serde(default)]
    pub valid_after: Option<u64>,
    #[serde(default)]
    pub value_limit_per_use: U256,
    #[serde(default)]
    pub rules: Vec<ParamRuleInput>,
}

impl ActionPolicyData {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rules.len() > MAX_PARAM_RULES {
            return Err(ConfigError::TooManyParamRules { count: self.rules.len(), max: MAX_PARAM_RULES });
        }
        Ok(())
    }

    fn is_sudo(&self) -> bool {
        self.rules.is_empty() && self.value_limit_per_use.is_zero()
    }

    fn has_time_frame(&self) -> bool {
        self.valid_until.is_some() || self.valid_after.is_some()
    }
}

/// `uint128 validUntil || uint128 validAfter`, packed. A zero `validUntil` means no expiry.
pub fn time_frame_init_data(valid_until: u64, valid_after: u64) -> Bytes {
    let mut buf = [0u8; 32];
    buf[..16].copy_from_slice(&u128::from(valid_until).to_be_bytes());
    buf[16..].copy_from_slice(&u128::from(valid_after).to_be_bytes());
    Bytes::copy_from_slice(&buf)
}

/// `abi.encode(ActionConfig)` with the rule array padded to its fixed 16 entries.
pub fn universal_action_init_data(
    value_limit_per_use: U256,
    rules: &[ParamRuleInput],
) -> Result<Bytes, ConfigError> {
    if rules.len() > MAX_PARAM_RULES {
        return Err(ConfigError::TooManyParamRules { count: rules.len(), max: MAX_PARAM_RULES });
    }
    let mut padded: [ParamRule; MAX_PARAM_RULES] = Default::default();
    for (slot, rule) in padded.iter_mut().zip(rules) {
        let usage = rule.usage.unwrap_or_default();
        *slot = ParamRule {
            condition: rule.condition as u8,
            offset: rule.offset,
            isLimited: rule.usage.is_some(),
            refValue: rule.reference,
            usage: LimitUsage { limit: usage.limit, used: usage.used },
        };
    }
    let config = ActionConfig {
        valueLimitPerUse: value_limit_per_use,
        paramRules: ParamRules { length: U256::from(rules.len()), rules: padded },
    };
    Ok(config.abi_encode().into())
}

pub fn action_policies(action: &ActionPolicyData, contracts: &PolicyContracts) -> Result<Vec<PolicyData>, ConfigError> {
    action.validate()?;
    let mut policies = Vec::with_capacity(2);
    if action.has_time_frame() {
        policies.push(PolicyData {
            policy: contracts.time_frame_policy,
            initData: time_frame_init_data(action.valid_until.unwrap_or(0), action.valid_after.unwrap_or(0)),
        });
    }
    if action.is_sudo() {
        policies.push(PolicyData { policy: contracts.sudo_policy, initData: Bytes::new() });
    } else {
        policies.push(PolicyData {
            policy: contracts.universal_action_policy,
            initData: universal_action_init_data(action.value_limit_per_use, &action.rules)?,
        });
    }
    sort_policies(&mut policies);
    Ok(policies)
}

pub fn action_data(action: &ActionPolicyData, contracts: &PolicyContracts) -> Result<ActionData, ConfigError> {
    Ok(ActionData {
        actionTargetSelector: action.selector,
        actionTarget: action.target,
        actionPolicies: action_policies(action, contracts)?,
    })
}

fn cmp_policy(a: &PolicyData, b: &PolicyData) -> Ordering {
    a.policy.cmp(&b.policy).then_with(|| a.initData.cmp(&b.initData))
}

pub fn sort_policies(policies: &mut [PolicyData]) {
    policies.sort_by(cmp_policy);
}

pub fn sort_actions(actions: &mut [ActionData]) {
    for action in actions.iter_mut() {
        sort_policies(&mut action.actionPolicies);
    }
    actions.sort_by(|a, b| {
        a.actionTarget
            .cmp(&b.actionTarget)
            .then_with(|| a.actionTargetSelector.cmp(&b.actionTargetSelector))
            .then_with(|| {
                let (pa, pb) = (&a.actionPolicies, &b.actionPolicies);
                pa.iter()
                    .zip(pb.iter())
                    .map(|(x, y)| cmp_policy(x, y))
                    .find(|o| o.is_ne())
                    .unwrap_or_else(|| pa.len().cmp(&pb.len()))
            })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::SolValue;

    fn contracts() -> PolicyContracts {
        PolicyContracts {
            sudo_policy: Address::repeat_byte(0x01),
            time_frame_policy: Address::repeat_byte(0x02),
            universal_action_policy: Address::repeat_byte(0x03),
        }
    }

    fn rule(i: u64) -> ParamRuleInput {
        ParamRuleInput {
            condition: ParamCondition::LessThanOrEqual,
            offset: i * 32,
            reference: B256::with_last_byte(i as u8),
            usage: None,
        }
    }

    fn action(rules: Vec<ParamRuleInput>) -> ActionPolicyData {
        ActionPolicyData {
            target: Address::repeat_byte(0xaa),
            selector: FixedBytes::from([0xa9, 0x05, 0x9c, 0xbb]),
            valid_until: None,
            valid_after: None,
            value_limit_per_use: U256::ZERO,
            rules,
        }
    }

    #[test]
    fn time_frame_packs_two_uint128() {
        let data = time_frame_init_data(2_000_000_000, 1_000);
        assert_eq!(data.len(), 32);
        assert_eq!(u128::from_be_bytes(data[..16].try_into().unwrap()), 2_000_000_000);
        assert_eq!(u128::from_be_bytes(data[16..].try_into().unwrap()), 1_000);
    }

    #[test]
    fn sixteen_rules_fit_and_seventeen_fail() {
        let rules: Vec<_> = (0..16).map(rule).collect();
        let data = universal_action_init_data(U256::ZERO, &rules).unwrap();
        let decoded = ActionConfig::abi_decode(&data, true).unwrap();
        assert_eq!(decoded.paramRules.length, U256::from(16u8));
        assert_eq!(decoded.paramRules.rules[15].offset, 15 * 32);

        let rules: Vec<_> = (0..17).map(rule).collect();
        assert_eq!(
            universal_action_init_data(U256::ZERO, &rules),
            Err(ConfigError::TooManyParamRules { count: 17, max: 16 })
        );
        assert_eq!(
            action_policies(&action(rules), &contracts()),
            Err(ConfigError::TooManyParamRules { count: 17, max: 16 })
        );
    }

    #[test]
    fn unused_rule_slots_are_zero() {
        let mut r = rule(1);
        r.usage = Some(RuleUsage { limit: U256::from(5u8), used: U256::ZERO });
        let data = universal_action_init_data(U256::from(10u8), &[r]).unwrap();
        let decoded = ActionConfig::abi_decode(&data, true).unwrap();
        assert_eq!(decoded.valueLimitPerUse, U256::from(10u8));
        assert!(decoded.paramRules.rules[0].isLimited);
        assert_eq!(decoded.paramRules.rules[0].usage.limit, U256::from(5u8));
        assert_eq!(decoded.paramRules.rules[1], ParamRule::default());
    }

    #[test]
    fn picks_sudo_or_universal_policy() {
        let sudo = action_policies(&action(vec![]), &contracts()).unwrap();
        assert_eq!(sudo.len(), 1);
        assert_eq!(sudo[0].policy, contracts().sudo_policy);

        let mut bounded = action(vec![rule(0)]);
        bounded.valid_until = Some(100);
        let policies = action_policies(&bounded, &contracts()).unwrap();
        let addrs: Vec<_> = policies.iter().map(|p| p.policy).collect();
        assert_eq!(addrs, vec![contracts().time_frame_policy, contracts().universal_action_policy]);

        let mut valued = action(vec![]);
        valued.value_limit_per_use = U256::from(1u8);
        let policies = action_policies(&valued, &contracts()).unwrap();
        assert_eq!(policies[0].policy, contracts().universal_action_policy);
    }

    #[test]
    fn actions_sharing_target_and_selector_sort_by_policy_contents() {
        let a = action_data(&action(vec![rule(1)]), &contracts()).unwrap();
        let b = action_data(&action(vec![rule(2)]), &contracts()).unwrap();
        assert_eq!(a.actionPolicies[0].policy, b.actionPolicies[0].policy);

        let mut forward = vec![a.clone(), b.clone()];
        let mut reverse = vec![b, a];
        sort_actions(&mut forward);
        sort_actions(&mut reverse);
        assert_eq!(forward, reverse);
        assert!(forward[0].actionPolicies[0].initData < forward[1].actionPolicies[0].initData);
    }
}
