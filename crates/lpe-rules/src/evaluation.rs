//! # Rule Evaluation Engine
//!
//! Folds each rule's condition chain into a single three-valued verdict and
//! selects the first enabled rule, in authored order, whose verdict is
//! `True`.
//!
//! ## Determinism
//!
//! Given identical rules (in identical order), catalog and source, the
//! engine returns identical results. Rules are kept in a `Vec` in the order
//! they were authored; condition evaluation has no side effects.
//!
//! ## Fold
//!
//! ```text
//! verdict = t(c0)
//! for ci in c1..cn:
//!     AND => verdict = verdict ∧ t(ci)
//!     OR  => verdict = verdict ∨ t(ci)
//!     NOT => verdict = verdict ∧ ¬t(ci)
//! ```
//!
//! Left to right, no precedence. Every condition is evaluated even once the
//! verdict is settled, so reports show each condition's outcome.

use serde::Serialize;

use lpe_core::{Catalog, RuleId};

use crate::condition::{ConditionEvaluator, ConditionOutcome};
use crate::resolver::{AttributeResolver, AttributeSource};
use crate::rule::{Rule, RuleAction};
use crate::truth::Truth;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// The outcome of rule selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Selection {
    /// A rule matched.
    Matched {
        /// The first matching rule.
        rule_id: RuleId,
        /// Its action.
        action: RuleAction,
    },
    /// No enabled rule evaluated to `True`.
    NoMatch,
}

impl Selection {
    /// The selected action, if any.
    pub fn action(&self) -> Option<RuleAction> {
        match self {
            Self::Matched { action, .. } => Some(*action),
            Self::NoMatch => None,
        }
    }

    /// The matching rule, if any.
    pub fn rule_id(&self) -> Option<&RuleId> {
        match self {
            Self::Matched { rule_id, .. } => Some(rule_id),
            Self::NoMatch => None,
        }
    }
}

/// Per-rule result of a full evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleVerdict {
    /// Rule evaluated.
    pub rule_id: RuleId,
    /// Rule display name.
    pub name: String,
    /// Action the rule would select.
    pub action: RuleAction,
    /// Whether the rule takes part in selection.
    pub enabled: bool,
    /// Folded verdict.
    pub verdict: Truth,
    /// Outcome of each condition, in order.
    pub conditions: Vec<ConditionOutcome>,
}

impl RuleVerdict {
    /// Whether this rule would be selected if nothing earlier matched.
    pub fn matched(&self) -> bool {
        self.enabled && self.verdict.is_true()
    }
}

/// Every rule's verdict plus the resulting selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationReport {
    /// Verdicts in authored order.
    pub verdicts: Vec<RuleVerdict>,
    /// First match, or `NoMatch`.
    pub selection: Selection,
}

impl EvaluationReport {
    /// Enabled rules whose verdict was indeterminate. A non-empty result
    /// usually means a misconfigured condition.
    pub fn indeterminate(&self) -> impl Iterator<Item = &RuleVerdict> {
        self.verdicts
            .iter()
            .filter(|v| v.enabled && v.verdict == Truth::Indeterminate)
    }
}

// ---------------------------------------------------------------------------
// RuleEngine
// ---------------------------------------------------------------------------

/// An ordered rule set, optionally resolved through a catalog.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    rules: Vec<Rule>,
    catalog: Option<Catalog>,
}

impl RuleEngine {
    /// An engine over `rules`, kept in the given order.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            catalog: None,
        }
    }

    /// Resolve custom attribute references through `catalog`.
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Add a rule. A rule with the same id is replaced in place; otherwise
    /// the rule goes last.
    pub fn register_rule(&mut self, rule: Rule) {
        match self.rules.iter_mut().find(|r| r.id() == rule.id()) {
            Some(slot) => *slot = rule,
            None => self.rules.push(rule),
        }
    }

    /// Remove a rule by id.
    pub fn unregister_rule(&mut self, rule_id: &str) -> Option<Rule> {
        let pos = self.rules.iter().position(|r| r.id().as_str() == rule_id)?;
        Some(self.rules.remove(pos))
    }

    /// Rules in authored order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Number of rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// The catalog in use, if any.
    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    fn evaluator(&self) -> ConditionEvaluator<'_> {
        ConditionEvaluator::new(match &self.catalog {
            Some(catalog) => AttributeResolver::with_catalog(catalog),
            None => AttributeResolver::new(),
        })
    }

    /// Folded verdict of one rule. Ignores the enabled flag.
    pub fn evaluate_rule<S: AttributeSource + ?Sized>(&self, rule: &Rule, source: &S) -> Truth {
        fold(&self.evaluator(), rule, source).0
    }

    /// First enabled rule, in authored order, whose verdict is `True`.
    pub fn select_action<S: AttributeSource + ?Sized>(&self, source: &S) -> Selection {
        let evaluator = self.evaluator();
        for rule in self.rules.iter().filter(|r| r.is_enabled()) {
            let (verdict, _) = fold(&evaluator, rule, source);
            tracing::debug!(rule_id = %rule.id(), %verdict, "rule evaluated");
            if verdict.is_true() {
                return Selection::Matched {
                    rule_id: rule.id().clone(),
                    action: rule.action(),
                };
            }
        }
        Selection::NoMatch
    }

    /// Evaluate every rule, enabled or not, and report each verdict along
    /// with the selection [`select_action`](Self::select_action) would make.
    pub fn evaluate_all<S: AttributeSource + ?Sized>(&self, source: &S) -> EvaluationReport {
        let evaluator = self.evaluator();
        let verdicts: Vec<RuleVerdict> = self
            .rules
            .iter()
            .map(|rule| {
                let (verdict, conditions) = fold(&evaluator, rule, source);
                tracing::debug!(rule_id = %rule.id(), %verdict, enabled = rule.is_enabled(), "rule evaluated");
                RuleVerdict {
                    rule_id: rule.id().clone(),
                    name: rule.name().to_string(),
                    action: rule.action(),
                    enabled: rule.is_enabled(),
                    verdict,
                    conditions,
                }
            })
            .collect();
        let selection = verdicts
            .iter()
            .find(|v| v.matched())
            .map(|v| Selection::Matched {
                rule_id: v.rule_id.clone(),
                action: v.action,
            })
            .unwrap_or(Selection::NoMatch);
        EvaluationReport {
            verdicts,
            selection,
        }
    }
}

fn fold<S: AttributeSource + ?Sized>(
    evaluator: &ConditionEvaluator<'_>,
    rule: &Rule,
    source: &S,
) -> (Truth, Vec<ConditionOutcome>) {
    let mut outcomes = Vec::with_capacity(rule.conditions().len());
    let mut verdict = Truth::Indeterminate;
    for (i, condition) in rule.conditions().iter().enumerate() {
        let outcome = evaluator.explain(condition, source);
        verdict = match (i, condition.logical_operator) {
            (0, _) => outcome.truth,
            (_, Some(op)) => op.combine(verdict, outcome.truth),
            // Rule construction guarantees an operator after the first condition.
            (_, None) => verdict.and(outcome.truth),
        };
        outcomes.push(outcome);
    }
    (verdict, outcomes)
}

/// Verdict of `rule` against `source`, without a catalog.
pub fn evaluate_rule<S: AttributeSource + ?Sized>(rule: &Rule, source: &S) -> Truth {
    fold(&ConditionEvaluator::default(), rule, source).0
}

/// First enabled rule in `rules` whose verdict is `True`, without a catalog.
pub fn select_action<S: AttributeSource + ?Sized>(rules: &[Rule], source: &S) -> Selection {
    let evaluator = ConditionEvaluator::default();
    rules
        .iter()
        .filter(|r| r.is_enabled())
        .find(|r| fold(&evaluator, r, source).0.is_true())
        .map(|r| Selection::Matched {
            rule_id: r.id().clone(),
            action: r.action(),
        })
        .unwrap_or(Selection::NoMatch)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::condition::{ComparisonOperator as Op, Condition, LogicalOperator};
    use lpe_core::LicenseRecord;
    use proptest::prelude::*;

    fn truth_strategy() -> impl Strategy<Value = Truth> {
        prop_oneof![
            Just(Truth::True),
            Just(Truth::False),
            Just(Truth::Indeterminate)
        ]
    }

    fn op_strategy() -> impl Strategy<Value = LogicalOperator> {
        prop_oneof![
            Just(LogicalOperator::And),
            Just(LogicalOperator::Or),
            Just(LogicalOperator::Not)
        ]
    }

    fn condition_for(t: Truth) -> Condition {
        match t {
            Truth::True => Condition::new("type", Op::Equals, "trial"),
            Truth::False => Condition::new("type", Op::Equals, "perpetual"),
            Truth::Indeterminate => Condition::new("missing", Op::Equals, "x"),
        }
    }

    proptest! {
        #[test]
        fn fold_agrees_with_reference(
            first in truth_strategy(),
            rest in proptest::collection::vec((op_strategy(), truth_strategy()), 0..8),
        ) {
            let rec = LicenseRecord::new("K", "trial");
            let mut conditions = vec![condition_for(first)];
            let mut expected = first;
            for (op, t) in &rest {
                conditions.push(condition_for(*t).joined(*op));
                expected = op.combine(expected, *t);
            }
            let rule = Rule::new("p", "p", conditions, RuleAction::Activate).unwrap();
            prop_assert_eq!(evaluate_rule(&rule, &rec), expected);
        }

        #[test]
        fn selection_is_deterministic(truths in proptest::collection::vec(truth_strategy(), 1..10)) {
            let rec = LicenseRecord::new("K", "trial");
            let rules: Vec<Rule> = truths
                .iter()
                .enumerate()
                .map(|(i, t)| Rule::new(format!("r{i}"), "p", vec![condition_for(*t)], RuleAction::Activate).unwrap())
                .collect();
            let first = select_action(&rules, &rec);
            prop_assert_eq!(&first, &select_action(&rules, &rec));
            let expected = truths.iter().position(|t| t.is_true());
            prop_assert_eq!(first.rule_id().map(|id| id.as_str().to_string()), expected.map(|i| format!("r{i}")));
        }
    }
}
