//! # Conditions
//!
//! A condition compares one field of a license against a text literal. The
//! literal is coerced into the kind of the resolved value at evaluation time,
//! so the same stored rule works whether a custom attribute holds a number,
//! a date, or text.
//!
//! Serialized with the field names and operator spellings of the rule
//! builder that authors them:
//!
//! ```json
//! {"field": "current_uses", "operator": "greater than", "value": "9",
//!  "logicalOperator": "AND"}
//! ```

use serde::{Deserialize, Serialize};

use lpe_core::{AttributeType, AttributeValue, ValueKind};

use crate::resolver::{AttributeResolver, AttributeSource, FieldRef, Resolution};
use crate::truth::Truth;

// ─── Operators ───────────────────────────────────────────────────────

/// How a field is compared against the literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    /// Structural equality.
    #[serde(rename = "equals", alias = "==")]
    Equals,
    /// Structural inequality.
    #[serde(rename = "not equals", alias = "not_equals", alias = "!=")]
    NotEquals,
    /// Strictly greater. Numbers and dates only.
    #[serde(rename = "greater than", alias = "greater_than", alias = ">")]
    GreaterThan,
    /// Strictly less. Numbers and dates only.
    #[serde(rename = "less than", alias = "less_than", alias = "<")]
    LessThan,
    /// Substring for text, membership for sets.
    #[serde(rename = "contains")]
    Contains,
}

impl ComparisonOperator {
    /// The stored spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not equals",
            Self::GreaterThan => "greater than",
            Self::LessThan => "less than",
            Self::Contains => "contains",
        }
    }

    /// Whether this operator is defined for values of `kind`.
    pub fn supports(self, kind: ValueKind) -> bool {
        match self {
            Self::Equals | Self::NotEquals => true,
            Self::GreaterThan | Self::LessThan => kind.is_ordered(),
            Self::Contains => matches!(kind, ValueKind::Text | ValueKind::Set),
        }
    }
}

impl std::fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a condition joins the verdict of the conditions before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOperator {
    /// `running AND c`
    #[serde(rename = "AND", alias = "and")]
    And,
    /// `running OR c`
    #[serde(rename = "OR", alias = "or")]
    Or,
    /// `running AND (NOT c)`
    #[serde(rename = "NOT", alias = "not")]
    Not,
}

impl LogicalOperator {
    /// Fold the next condition's truth into the running verdict.
    pub fn combine(self, running: Truth, next: Truth) -> Truth {
        match self {
            Self::And => running.and(next),
            Self::Or => running.or(next),
            Self::Not => running.and(next.not()),
        }
    }

    /// The stored spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
        }
    }
}

impl std::fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Condition ───────────────────────────────────────────────────────

/// One comparison within a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Built-in field name or custom attribute id/name.
    pub field: String,
    /// Comparison to perform.
    pub operator: ComparisonOperator,
    /// Literal, always stored as text.
    pub value: String,
    /// Join with the preceding conditions. Ignored on the first condition
    /// of a rule, required on every later one.
    #[serde(
        rename = "logicalOperator",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub logical_operator: Option<LogicalOperator>,
}

impl Condition {
    /// A condition with no logical operator, suitable as the first of a rule.
    pub fn new(
        field: impl Into<String>,
        operator: ComparisonOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            logical_operator: None,
        }
    }

    /// Set the logical operator joining this condition to its predecessors.
    pub fn joined(mut self, op: LogicalOperator) -> Self {
        self.logical_operator = Some(op);
        self
    }

    /// The parsed field reference.
    pub fn field_ref(&self) -> FieldRef {
        FieldRef::parse(&self.field)
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(op) = self.logical_operator {
            write!(f, "{op} ")?;
        }
        write!(f, "{} {} {:?}", self.field, self.operator, self.value)
    }
}

// ─── Evaluation ──────────────────────────────────────────────────────

/// Why a condition came out indeterminate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Indeterminacy {
    /// The field resolved to nothing.
    AbsentField,
    /// The stored custom value does not have its declared type.
    TypeMismatch {
        /// Declared type.
        declared: AttributeType,
        /// Kind actually stored.
        actual: ValueKind,
    },
    /// The literal cannot be read as a value of the field's kind.
    UncoercibleLiteral {
        /// Kind the literal was coerced to.
        kind: ValueKind,
    },
    /// The operator is undefined for the field's kind.
    UnsupportedOperator {
        /// Operator requested.
        operator: ComparisonOperator,
        /// Kind of the resolved value.
        kind: ValueKind,
    },
}

impl std::fmt::Display for Indeterminacy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AbsentField => f.write_str("field is absent"),
            Self::TypeMismatch { declared, actual } => {
                write!(f, "value is {actual}, attribute declared {declared}")
            }
            Self::UncoercibleLiteral { kind } => write!(f, "literal is not a valid {kind}"),
            Self::UnsupportedOperator { operator, kind } => {
                write!(f, "'{operator}' is undefined for {kind}")
            }
        }
    }
}

/// The truth of one condition, with the cause when indeterminate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionOutcome {
    /// Three-valued result.
    pub truth: Truth,
    /// Set exactly when `truth` is `Indeterminate`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indeterminacy: Option<Indeterminacy>,
}

impl ConditionOutcome {
    fn decided(truth: bool) -> Self {
        Self {
            truth: Truth::from(truth),
            indeterminacy: None,
        }
    }

    fn indeterminate(cause: Indeterminacy) -> Self {
        Self {
            truth: Truth::Indeterminate,
            indeterminacy: Some(cause),
        }
    }
}

/// Evaluates single conditions against an attribute source.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionEvaluator<'c> {
    resolver: AttributeResolver<'c>,
}

impl<'c> ConditionEvaluator<'c> {
    /// An evaluator using `resolver` for field lookups.
    pub fn new(resolver: AttributeResolver<'c>) -> Self {
        Self { resolver }
    }

    /// Three-valued truth of `condition` against `source`.
    pub fn evaluate<S: AttributeSource + ?Sized>(&self, condition: &Condition, source: &S) -> Truth {
        self.explain(condition, source).truth
    }

    /// Like [`evaluate`](Self::evaluate), also reporting why the result is
    /// indeterminate.
    pub fn explain<S: AttributeSource + ?Sized>(
        &self,
        condition: &Condition,
        source: &S,
    ) -> ConditionOutcome {
        let actual = match self.resolver.lookup(source, &condition.field_ref()) {
            Resolution::Present(value) => value,
            Resolution::Absent => return ConditionOutcome::indeterminate(Indeterminacy::AbsentField),
            Resolution::Mistyped { value, declared } => {
                return ConditionOutcome::indeterminate(Indeterminacy::TypeMismatch {
                    declared,
                    actual: value.kind(),
                })
            }
        };
        let kind = actual.kind();
        let Some(literal) = AttributeValue::coerce_literal(kind, &condition.value) else {
            return ConditionOutcome::indeterminate(Indeterminacy::UncoercibleLiteral { kind });
        };
        match compare(&actual, condition.operator, &literal) {
            Some(holds) => ConditionOutcome::decided(holds),
            None => ConditionOutcome::indeterminate(Indeterminacy::UnsupportedOperator {
                operator: condition.operator,
                kind,
            }),
        }
    }
}

/// Apply `op` to two values of the same kind. `None` when undefined.
///
/// `contains` on a set tests membership of every item of the literal, so a
/// single-item literal is plain membership. An empty literal set is
/// undefined.
fn compare(actual: &AttributeValue, op: ComparisonOperator, literal: &AttributeValue) -> Option<bool> {
    use AttributeValue as V;
    use ComparisonOperator as Op;

    if !op.supports(actual.kind()) {
        return None;
    }
    match op {
        Op::Equals => Some(actual == literal),
        Op::NotEquals => Some(actual != literal),
        Op::GreaterThan | Op::LessThan => {
            let ordering = match (actual, literal) {
                (V::Number(a), V::Number(b)) => a.partial_cmp(b)?,
                (V::Date(a), V::Date(b)) => a.cmp(b),
                _ => return None,
            };
            Some(if op == Op::GreaterThan {
                ordering.is_gt()
            } else {
                ordering.is_lt()
            })
        }
        Op::Contains => match (actual, literal) {
            (V::Text(haystack), V::Text(needle)) => Some(haystack.contains(needle.as_str())),
            (V::Set(items), V::Set(wanted)) if !wanted.is_empty() => {
                Some(wanted.is_subset(items))
            }
            _ => None,
        },
    }
}
