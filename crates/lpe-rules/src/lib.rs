//! # lpe-rules — Rule Evaluation Engine
//!
//! Decides which lifecycle action, if any, a set of operator-authored rules
//! selects for a license.
//!
//! ## Architecture
//!
//! - **Truth** (`truth.rs`): three-valued (Kleene) logic. `Indeterminate` is
//!   a first-class outcome, never silently coerced to `False`.
//!
//! - **Resolver** (`resolver.rs`): reads a built-in field or custom
//!   attribute off any [`AttributeSource`] (license record, offline
//!   activation snapshot), returning a typed value or absent.
//!
//! - **Condition** (`condition.rs`): one comparison of a field against a
//!   text literal, coerced to the field's type at evaluation time.
//!
//! - **Rule** (`rule.rs`): an ordered chain of conditions joined by
//!   `AND` / `OR` / `NOT`, paired with one action. Invariants are enforced at
//!   construction and at the deserialization boundary.
//!
//! - **Evaluation** (`evaluation.rs`): left fold over each rule, first match
//!   in authored order wins.
//!
//! - **Audit** (`audit.rs`): bounded, append-only trail of evaluations and
//!   transitions with per-entry content digests.
//!
//! ## Concurrency
//!
//! Everything here is pure over its inputs. [`RuleEngine`] holds no interior
//! mutability and is `Send + Sync`; concurrent evaluations over different
//! records need no coordination.

pub mod audit;
pub mod condition;
pub mod evaluation;
pub mod resolver;
pub mod rule;
pub mod truth;

// Re-export primary types.
pub use audit::{AuditEntry, AuditEntryType, AuditTrail};
pub use condition::{
    ComparisonOperator, Condition, ConditionEvaluator, ConditionOutcome, Indeterminacy,
    LogicalOperator,
};
pub use evaluation::{evaluate_rule, select_action, EvaluationReport, RuleEngine, RuleVerdict, Selection};
pub use resolver::{AttributeResolver, AttributeSource, BuiltinField, FieldRef, Resolution};
pub use rule::{Rule, RuleAction, RuleError, StoredRule};
pub use truth::Truth;
