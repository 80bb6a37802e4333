//! Lifecycle commands.
//!
//! Rule actions map onto commands one to one. `Suspend` has no rule action:
//! it is issued by the system (quota or abuse handling), never selected by a
//! rule.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use lpe_core::{FeatureId, Timestamp};
use lpe_rules::RuleAction;

/// The kind of lifecycle change, without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleAction {
    /// Put the license into use.
    Activate,
    /// Take the license out of use.
    Deactivate,
    /// Raise the tier.
    Upgrade,
    /// Lower the tier.
    Downgrade,
    /// System hold.
    Suspend,
    /// Clock-driven expiry.
    Expire,
}

impl LifecycleAction {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::Upgrade => "upgrade",
            Self::Downgrade => "downgrade",
            Self::Suspend => "suspend",
            Self::Expire => "expire",
        }
    }
}

impl std::fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested lifecycle change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleCommand {
    /// Activate, optionally setting a new expiration date. Required when
    /// reactivating an expired license.
    Activate {
        /// New expiration date; must lie after `now`.
        renewed_expiration: Option<Timestamp>,
    },
    /// Deactivate.
    Deactivate,
    /// Upgrade, optionally replacing the feature set with a superset.
    Upgrade {
        /// New feature set.
        features: Option<BTreeSet<FeatureId>>,
    },
    /// Downgrade, optionally replacing the feature set with a subset.
    Downgrade {
        /// New feature set.
        features: Option<BTreeSet<FeatureId>>,
    },
    /// Suspend an active license.
    Suspend {
        /// Why the system is holding the license.
        reason: String,
    },
}

impl LifecycleCommand {
    /// The parameterless action.
    pub fn action(&self) -> LifecycleAction {
        match self {
            Self::Activate { .. } => LifecycleAction::Activate,
            Self::Deactivate => LifecycleAction::Deactivate,
            Self::Upgrade { .. } => LifecycleAction::Upgrade,
            Self::Downgrade { .. } => LifecycleAction::Downgrade,
            Self::Suspend { .. } => LifecycleAction::Suspend,
        }
    }
}

impl From<RuleAction> for LifecycleCommand {
    fn from(action: RuleAction) -> Self {
        match action {
            RuleAction::Activate => Self::Activate {
                renewed_expiration: None,
            },
            RuleAction::Deactivate => Self::Deactivate,
            RuleAction::Upgrade => Self::Upgrade { features: None },
            RuleAction::Downgrade => Self::Downgrade { features: None },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_actions_map_to_commands() {
        for (rule_action, expected) in [
            (RuleAction::Activate, LifecycleAction::Activate),
            (RuleAction::Deactivate, LifecycleAction::Deactivate),
            (RuleAction::Upgrade, LifecycleAction::Upgrade),
            (RuleAction::Downgrade, LifecycleAction::Downgrade),
        ] {
            assert_eq!(LifecycleCommand::from(rule_action).action(), expected);
            assert_eq!(rule_action.as_str(), expected.as_str());
        }
    }

    #[test]
    fn suspend_is_not_a_rule_action() {
        let cmd = LifecycleCommand::Suspend {
            reason: "quota".into(),
        };
        assert_eq!(cmd.action().to_string(), "suspend");
        assert!(serde_json::from_str::<RuleAction>(r#""suspend""#).is_err());
    }
}
