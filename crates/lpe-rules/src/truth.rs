//! # Three-Valued Truth
//!
//! Strong Kleene logic over `True`, `False` and `Indeterminate`:
//!
//! ```text
//!  AND │ T  F  I        OR │ T  F  I       NOT │
//! ─────┼─────────      ────┼─────────      ────┼───
//!   T  │ T  F  I         T │ T  T  T         T │ F
//!   F  │ F  F  F         F │ T  F  I         F │ T
//!   I  │ I  F  I         I │ T  I  I         I │ I
//! ```

use serde::{Deserialize, Serialize};

/// The outcome of evaluating a condition or a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Truth {
    /// The comparison holds.
    True,
    /// The comparison does not hold.
    False,
    /// The comparison cannot be decided (absent field, bad literal, type
    /// mismatch, unsupported operator).
    Indeterminate,
}

impl Truth {
    /// Three-valued conjunction.
    pub fn and(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::False, _) | (_, Truth::False) => Truth::False,
            (Truth::True, Truth::True) => Truth::True,
            _ => Truth::Indeterminate,
        }
    }

    /// Three-valued disjunction.
    pub fn or(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::True, _) | (_, Truth::True) => Truth::True,
            (Truth::False, Truth::False) => Truth::False,
            _ => Truth::Indeterminate,
        }
    }

    /// Three-valued negation. `Indeterminate` stays `Indeterminate`.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Truth {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Indeterminate => Truth::Indeterminate,
        }
    }

    /// Whether this is `True`. Only `True` makes a rule match.
    pub fn is_true(self) -> bool {
        self == Truth::True
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Truth::True => "true",
            Truth::False => "false",
            Truth::Indeterminate => "indeterminate",
        }
    }
}

impl From<bool> for Truth {
    fn from(b: bool) -> Self {
        if b {
            Truth::True
        } else {
            Truth::False
        }
    }
}

impl std::fmt::Display for Truth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Truth::{False as F, Indeterminate as I, True as T};

    const ALL: [Truth; 3] = [T, F, I];

    #[test]
    fn and_table() {
        let expected = [[T, F, I], [F, F, F], [I, F, I]];
        for (i, a) in ALL.iter().enumerate() {
            for (j, b) in ALL.iter().enumerate() {
                assert_eq!(a.and(*b), expected[i][j], "{a} AND {b}");
            }
        }
    }

    #[test]
    fn or_table() {
        let expected = [[T, T, T], [T, F, I], [T, I, I]];
        for (i, a) in ALL.iter().enumerate() {
            for (j, b) in ALL.iter().enumerate() {
                assert_eq!(a.or(*b), expected[i][j], "{a} OR {b}");
            }
        }
    }

    #[test]
    fn not_table() {
        assert_eq!(T.not(), F);
        assert_eq!(F.not(), T);
        assert_eq!(I.not(), I);
    }

    #[test]
    fn commutative() {
        for a in ALL {
            for b in ALL {
                assert_eq!(a.and(b), b.and(a));
                assert_eq!(a.or(b), b.or(a));
            }
        }
    }

    #[test]
    fn only_true_is_true() {
        assert!(T.is_true());
        assert!(!F.is_true());
        assert!(!I.is_true());
        assert_eq!(Truth::from(true), T);
        assert_eq!(Truth::from(false), F);
    }
}
