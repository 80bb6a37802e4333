//! # Typed Attribute Values
//!
//! The closed value type every license attribute resolves to, and the
//! coercion rules that turn a rule's text literal into a value of the same
//! kind as the attribute it is compared against.
//!
//! Coercion is total in the sense that it never errors: a literal that does
//! not fit the target kind yields `None`, which the condition evaluator
//! reports as an indeterminate outcome.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::temporal::Timestamp;

/// The declared type of a custom attribute definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    /// Free text.
    Text,
    /// Finite decimal number.
    Number,
    /// `true` / `false`.
    Boolean,
    /// UTC calendar instant.
    Date,
}

impl AttributeType {
    /// The value kind a well-typed value of this attribute has.
    pub fn value_kind(self) -> ValueKind {
        match self {
            Self::Text => ValueKind::Text,
            Self::Number => ValueKind::Number,
            Self::Boolean => ValueKind::Boolean,
            Self::Date => ValueKind::Date,
        }
    }

    /// Lowercase type name.
    pub fn as_str(self) -> &'static str {
        self.value_kind().as_str()
    }
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The runtime kind of an [`AttributeValue`].
///
/// `Set` is not a declarable attribute type; it exists for set-valued
/// built-in fields such as a license's feature set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Free text.
    Text,
    /// Finite decimal number.
    Number,
    /// `true` / `false`.
    Boolean,
    /// UTC calendar instant.
    Date,
    /// Unordered set of strings.
    Set,
}

impl ValueKind {
    /// Lowercase kind name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Set => "set",
        }
    }

    /// Whether `greater than` / `less than` are defined for this kind.
    pub fn is_ordered(self) -> bool {
        matches!(self, Self::Number | Self::Date)
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed attribute value.
///
/// Serialized with an explicit tag so stored custom attribute values carry
/// their own kind: `{"type": "number", "value": 12}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum AttributeValue {
    /// Free text, compared case-sensitively.
    Text(String),
    /// Finite number.
    Number(f64),
    /// Boolean flag.
    Boolean(bool),
    /// UTC instant.
    Date(Timestamp),
    /// Set of strings, compared by membership or whole-set equality.
    Set(BTreeSet<String>),
}

impl AttributeValue {
    /// Text value.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Number value, or `None` for NaN and infinities.
    pub fn number(n: f64) -> Option<Self> {
        n.is_finite().then_some(Self::Number(n))
    }

    /// Number value from an unsigned counter.
    ///
    /// Counters up to 2^53 convert exactly. Larger counters round to the
    /// nearest representable `f64`, so comparisons against them are only as
    /// precise as that rounding.
    pub fn count(n: u64) -> Self {
        Self::Number(n as f64)
    }

    /// Set value from anything string-like.
    pub fn set<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Set(items.into_iter().map(Into::into).collect())
    }

    /// The runtime kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Text(_) => ValueKind::Text,
            Self::Number(_) => ValueKind::Number,
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Date(_) => ValueKind::Date,
            Self::Set(_) => ValueKind::Set,
        }
    }

    /// Interpret a rule literal as a value of `kind`.
    ///
    /// - number: decimal literal, surrounding whitespace ignored, must be finite
    /// - boolean: `true` / `false`, case-insensitive
    /// - date: `YYYY-MM-DD` or RFC 3339, normalized to UTC
    /// - text: the literal verbatim
    /// - set: comma-separated items, each trimmed, empty items dropped
    pub fn coerce_literal(kind: ValueKind, literal: &str) -> Option<Self> {
        match kind {
            ValueKind::Text => Some(Self::Text(literal.to_string())),
            ValueKind::Number => literal
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Self::number),
            ValueKind::Boolean => {
                let t = literal.trim();
                if t.eq_ignore_ascii_case("true") {
                    Some(Self::Boolean(true))
                } else if t.eq_ignore_ascii_case("false") {
                    Some(Self::Boolean(false))
                } else {
                    None
                }
            }
            ValueKind::Date => Timestamp::parse_flexible(literal).ok().map(Self::Date),
            ValueKind::Set => Some(Self::Set(
                literal
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            )),
        }
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Date(ts) => write!(f, "{ts}"),
            Self::Set(items) => {
                let joined: Vec<&str> = items.iter().map(String::as_str).collect();
                write!(f, "{}", joined.join(","))
            }
        }
    }
}
