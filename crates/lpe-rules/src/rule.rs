//! # Rules
//!
//! A rule is an ordered, non-empty chain of conditions joined left to right
//! by logical operators, paired with the lifecycle action it selects when the
//! chain evaluates to `True`.
//!
//! The chain invariants (at least one condition, every condition after the
//! first carries a logical operator, no blank field references) are enforced
//! by [`Rule::new()`] and by deserialization, so an invalid rule cannot be
//! loaded.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lpe_core::RuleId;

use crate::condition::Condition;

/// Action a rule selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    /// Put the license into use.
    Activate,
    /// Take the license out of use.
    Deactivate,
    /// Raise the license tier.
    Upgrade,
    /// Lower the license tier.
    Downgrade,
}

impl RuleAction {
    /// Lowercase action name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::Upgrade => "upgrade",
            Self::Downgrade => "downgrade",
        }
    }
}

impl std::fmt::Display for RuleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from building or loading a rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// The rule has no conditions.
    #[error("rule {rule} has no conditions")]
    NoConditions {
        /// Offending rule.
        rule: RuleId,
    },

    /// A condition after the first does not say how it joins.
    #[error("rule {rule}: condition {index} has no logical operator")]
    MissingLogicalOperator {
        /// Offending rule.
        rule: RuleId,
        /// Zero-based condition position.
        index: usize,
    },

    /// A condition references no field.
    #[error("rule {rule}: condition {index} has an empty field reference")]
    EmptyField {
        /// Offending rule.
        rule: RuleId,
        /// Zero-based condition position.
        index: usize,
    },

    /// A stored condition blob is not valid condition JSON.
    #[error("rule {rule}: stored condition is malformed: {reason}")]
    MalformedStoredCondition {
        /// Offending rule.
        rule: RuleId,
        /// Parser message.
        reason: String,
    },
}

/// A validated rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RuleDocument", into = "RuleDocument")]
pub struct Rule {
    id: RuleId,
    name: String,
    conditions: Vec<Condition>,
    action: RuleAction,
    enabled: bool,
}

impl Rule {
    /// Build an enabled rule.
    ///
    /// A logical operator on the first condition has nothing to join and is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] if `conditions` is empty, a later condition
    /// has no logical operator, or a field reference is blank.
    pub fn new(
        id: impl Into<RuleId>,
        name: impl Into<String>,
        mut conditions: Vec<Condition>,
        action: RuleAction,
    ) -> Result<Self, RuleError> {
        let id = id.into();
        let Some(first) = conditions.first_mut() else {
            return Err(RuleError::NoConditions { rule: id });
        };
        first.logical_operator = None;
        for (index, condition) in conditions.iter().enumerate() {
            if condition.field.trim().is_empty() {
                return Err(RuleError::EmptyField { rule: id, index });
            }
            if index > 0 && condition.logical_operator.is_none() {
                return Err(RuleError::MissingLogicalOperator { rule: id, index });
            }
        }
        Ok(Self {
            id,
            name: name.into(),
            conditions,
            action,
            enabled: true,
        })
    }

    /// Enable or disable the rule. Disabled rules never match.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Rule identity.
    pub fn id(&self) -> &RuleId {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Conditions in evaluation order. Never empty.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Action selected on a match.
    pub fn action(&self) -> RuleAction {
        self.action
    }

    /// Whether selection considers this rule.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): if ", self.id, self.name)?;
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{condition}")?;
        }
        write!(f, " then {}", self.action)
    }
}

// ---- Serialized form ----

fn default_enabled() -> bool {
    true
}

#[derive(Serialize, Deserialize)]
struct RuleDocument {
    id: RuleId,
    name: String,
    conditions: Vec<Condition>,
    action: RuleAction,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

impl TryFrom<RuleDocument> for Rule {
    type Error = RuleError;

    fn try_from(doc: RuleDocument) -> Result<Self, Self::Error> {
        Ok(Rule::new(doc.id, doc.name, doc.conditions, doc.action)?.with_enabled(doc.enabled))
    }
}

impl From<Rule> for RuleDocument {
    fn from(rule: Rule) -> Self {
        Self {
            id: rule.id,
            name: rule.name,
            conditions: rule.conditions,
            action: rule.action,
            enabled: rule.enabled,
        }
    }
}

/// A rule row as persisted by the rule builder: the condition chain is an
/// opaque JSON string holding either one condition object or an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRule {
    /// Rule identity.
    pub id: RuleId,
    /// Display name.
    pub name: String,
    /// JSON text of the condition chain.
    pub condition: String,
    /// Selected action.
    pub action: RuleAction,
    /// Whether selection considers this rule.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredConditions {
    Many(Vec<Condition>),
    One(Condition),
}

impl TryFrom<StoredRule> for Rule {
    type Error = RuleError;

    fn try_from(row: StoredRule) -> Result<Self, Self::Error> {
        let conditions = match serde_json::from_str::<StoredConditions>(&row.condition) {
            Ok(StoredConditions::Many(list)) => list,
            Ok(StoredConditions::One(single)) => vec![single],
            Err(e) => {
                return Err(RuleError::MalformedStoredCondition {
                    rule: row.id,
                    reason: e.to_string(),
                })
            }
        };
        Ok(Rule::new(row.id, row.name, conditions, row.action)?.with_enabled(row.enabled))
    }
}

impl TryFrom<&Rule> for StoredRule {
    type Error = serde_json::Error;

    fn try_from(rule: &Rule) -> Result<Self, Self::Error> {
        Ok(Self {
            id: rule.id.clone(),
            name: rule.name.clone(),
            condition: serde_json::to_string(&rule.conditions)?,
            action: rule.action,
            enabled: rule.enabled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{ComparisonOperator, LogicalOperator};

    fn cond(field: &str) -> Condition {
        Condition::new(field, ComparisonOperator::Equals, "x")
    }

    #[test]
    fn empty_rule_rejected() {
        assert_eq!(
            Rule::new("r1", "empty", vec![], RuleAction::Activate),
            Err(RuleError::NoConditions {
                rule: RuleId::new("r1")
            })
        );
    }

    #[test]
    fn later_condition_needs_logical_operator() {
        let err = Rule::new("r1", "r", vec![cond("type"), cond("state")], RuleAction::Activate)
            .unwrap_err();
        assert_eq!(
            err,
            RuleError::MissingLogicalOperator {
                rule: RuleId::new("r1"),
                index: 1
            }
        );
    }

    #[test]
    fn first_condition_operator_dropped() {
        let rule = Rule::new(
            "r1",
            "r",
            vec![cond("type").joined(LogicalOperator::Not)],
            RuleAction::Deactivate,
        )
        .unwrap();
        assert_eq!(rule.conditions()[0].logical_operator, None);
        assert!(rule.is_enabled());
    }

    #[test]
    fn blank_field_rejected() {
        let err = Rule::new("r1", "r", vec![cond("  ")], RuleAction::Activate).unwrap_err();
        assert!(matches!(err, RuleError::EmptyField { index: 0, .. }));
    }

    #[test]
    fn deserialization_enforces_invariants() {
        let bad = r#"{"id":"r1","name":"r","action":"activate","conditions":[
            {"field":"type","operator":"equals","value":"trial"},
            {"field":"state","operator":"equals","value":"active"}]}"#;
        let err = serde_json::from_str::<Rule>(bad).unwrap_err();
        assert!(err.to_string().contains("no logical operator"));

        let good = r#"{"id":"r1","name":"r","action":"upgrade","enabled":false,"conditions":[
            {"field":"type","operator":"equals","value":"trial"},
            {"field":"state","operator":"equals","value":"active","logicalOperator":"AND"}]}"#;
        let rule: Rule = serde_json::from_str(good).unwrap();
        assert_eq!(rule.action(), RuleAction::Upgrade);
        assert!(!rule.is_enabled());
        assert_eq!(rule.conditions().len(), 2);
    }

    #[test]
    fn stored_rule_accepts_single_object_blob() {
        let row = StoredRule {
            id: RuleId::new("r9"),
            name: "trial cutoff".into(),
            condition: r#"{"field":"type","operator":"equals","value":"trial"}"#.into(),
            action: RuleAction::Deactivate,
            enabled: true,
        };
        let rule = Rule::try_from(row).unwrap();
        assert_eq!(rule.conditions().len(), 1);
        let back = StoredRule::try_from(&rule).unwrap();
        assert!(back.condition.starts_with('['));
        assert_eq!(Rule::try_from(back).unwrap(), rule);
    }

    #[test]
    fn stored_rule_rejects_garbage_blob() {
        let row = StoredRule {
            id: RuleId::new("r9"),
            name: "broken".into(),
            condition: "{not json".into(),
            action: RuleAction::Activate,
            enabled: true,
        };
        assert!(matches!(
            Rule::try_from(row),
            Err(RuleError::MalformedStoredCondition { .. })
        ));
    }

    #[test]
    fn display_reads_like_the_rule() {
        let rule = Rule::new(
            "r1",
            "trial cutoff",
            vec![
                Condition::new("type", ComparisonOperator::Equals, "trial"),
                Condition::new("current_uses", ComparisonOperator::GreaterThan, "9")
                    .joined(LogicalOperator::Or),
            ],
            RuleAction::Deactivate,
        )
        .unwrap();
        assert_eq!(
            rule.to_string(),
            r#"r1 (trial cutoff): if type equals "trial" OR current_uses greater than "9" then deactivate"#
        );
    }
}
