//! Boolean predicates and the absent-aware conjunction combinator.
//!
//! Dynamic filters follow the "absent means no constraint" pattern: an
//! optional filter term is an `Option<Predicate>`, and [`Predicate::all`]
//! conjoins whatever terms are present. Absence is the identity element of
//! the conjunction; if every term is absent the result filters nothing.
//!
//! ```rust
//! use quill_query::{Predicate, expr::val};
//!
//! fn username_eq(cond: Option<&str>) -> Option<Predicate> {
//!     cond.map(|name| val("member1").eq(name))
//! }
//!
//! // Present and absent terms combine without panicking.
//! let filter = Predicate::all([username_eq(Some("member1")), None]);
//! assert!(!filter.is_true());
//!
//! // All absent: the identity predicate, which filters nothing.
//! let filter = Predicate::all([username_eq(None), None]);
//! assert!(filter.is_true());
//! ```

use crate::expr::Expr;
use crate::query::QueryDescriptor;
use std::fmt;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equals.
    Eq,
    /// Not equals.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
}

impl CompareOp {
    /// The operator's display symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }
}

/// String match kinds for [`Predicate::Like`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Substring containment.
    Contains,
    /// Prefix match.
    StartsWith,
    /// Suffix match.
    EndsWith,
}

/// A boolean-valued expression used to filter rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// The identity predicate: matches every row.
    True,
    /// Binary comparison between two scalar expressions.
    Compare {
        /// The operator.
        op: CompareOp,
        /// Left operand.
        lhs: Expr,
        /// Right operand.
        rhs: Expr,
    },
    /// Inclusive range check.
    Between {
        /// The tested expression.
        expr: Expr,
        /// Lower bound.
        low: Expr,
        /// Upper bound.
        high: Expr,
    },
    /// Membership in an explicit value list.
    In {
        /// The tested expression.
        expr: Expr,
        /// The candidate values.
        list: Vec<Expr>,
    },
    /// Membership in a one-column subquery result.
    InSubquery {
        /// The tested expression.
        expr: Expr,
        /// The subquery; must produce a single column.
        query: Box<QueryDescriptor>,
    },
    /// String matching.
    Like {
        /// The tested expression.
        expr: Expr,
        /// The match kind.
        kind: MatchKind,
        /// The literal needle.
        needle: String,
    },
    /// Null check.
    IsNull(Expr),
    /// Non-null check.
    IsNotNull(Expr),
    /// Logical AND of multiple predicates.
    And(Vec<Predicate>),
    /// Logical OR of multiple predicates.
    Or(Vec<Predicate>),
    /// Logical NOT of a predicate.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Check if this is the identity predicate.
    pub fn is_true(&self) -> bool {
        matches!(self, Self::True)
    }

    pub(crate) fn eq(lhs: Expr, rhs: Expr) -> Self {
        Self::Compare {
            op: CompareOp::Eq,
            lhs,
            rhs,
        }
    }

    pub(crate) fn ne(lhs: Expr, rhs: Expr) -> Self {
        Self::Compare {
            op: CompareOp::Ne,
            lhs,
            rhs,
        }
    }

    pub(crate) fn lt(lhs: Expr, rhs: Expr) -> Self {
        Self::Compare {
            op: CompareOp::Lt,
            lhs,
            rhs,
        }
    }

    pub(crate) fn lte(lhs: Expr, rhs: Expr) -> Self {
        Self::Compare {
            op: CompareOp::Lte,
            lhs,
            rhs,
        }
    }

    pub(crate) fn gt(lhs: Expr, rhs: Expr) -> Self {
        Self::Compare {
            op: CompareOp::Gt,
            lhs,
            rhs,
        }
    }

    pub(crate) fn gte(lhs: Expr, rhs: Expr) -> Self {
        Self::Compare {
            op: CompareOp::Gte,
            lhs,
            rhs,
        }
    }

    /// Conjoin a set of possibly-absent predicates.
    ///
    /// Absent terms are skipped; if every term is absent the identity
    /// predicate is returned. The output composes further: conjoining it with
    /// additional predicates extends the conjunction rather than replacing it.
    pub fn all(terms: impl IntoIterator<Item = Option<Predicate>>) -> Self {
        Self::and(terms.into_iter().flatten())
    }

    /// Disjoin a set of possibly-absent predicates. All-absent yields the
    /// identity predicate (no constraint), consistent with [`Predicate::all`].
    pub fn any(terms: impl IntoIterator<Item = Option<Predicate>>) -> Self {
        let terms: Vec<_> = terms.into_iter().flatten().collect();
        if terms.is_empty() {
            return Self::True;
        }
        Self::or(terms)
    }

    /// Create an AND predicate, collapsing identity terms.
    pub fn and(preds: impl IntoIterator<Item = Predicate>) -> Self {
        let mut preds: Vec<_> = preds.into_iter().filter(|p| !p.is_true()).collect();
        match preds.len() {
            0 => Self::True,
            1 => preds.pop().unwrap_or(Self::True),
            _ => Self::And(preds),
        }
    }

    /// Create an OR predicate, collapsing identity terms.
    pub fn or(preds: impl IntoIterator<Item = Predicate>) -> Self {
        let mut out: Vec<Predicate> = Vec::new();
        for p in preds {
            if p.is_true() {
                // OR with the identity matches everything.
                return Self::True;
            }
            out.push(p);
        }
        match out.len() {
            0 => Self::True,
            1 => out.pop().unwrap_or(Self::True),
            _ => Self::Or(out),
        }
    }

    /// Create a NOT predicate.
    pub fn not(pred: Predicate) -> Self {
        Self::Not(Box::new(pred))
    }

    /// Combine with another predicate using AND.
    pub fn and_then(self, other: Predicate) -> Self {
        if self.is_true() {
            return other;
        }
        if other.is_true() {
            return self;
        }
        match self {
            Self::And(mut preds) => {
                preds.push(other);
                Self::And(preds)
            }
            _ => Self::And(vec![self, other]),
        }
    }

    /// Combine with another predicate using OR.
    pub fn or_else(self, other: Predicate) -> Self {
        if self.is_true() || other.is_true() {
            return Self::True;
        }
        match self {
            Self::Or(mut preds) => {
                preds.push(other);
                Self::Or(preds)
            }
            _ => Self::Or(vec![self, other]),
        }
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Self::True
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "true"),
            Self::Compare { op, lhs, rhs } => write!(f, "{} {} {}", lhs, op.symbol(), rhs),
            Self::Between { expr, low, high } => {
                write!(f, "{} between {} and {}", expr, low, high)
            }
            Self::In { expr, list } => {
                write!(f, "{} in (", expr)?;
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Self::InSubquery { expr, query } => write!(f, "{} in ({})", expr, query),
            Self::Like { expr, kind, needle } => {
                let pattern = match kind {
                    MatchKind::Contains => format!("%{}%", needle),
                    MatchKind::StartsWith => format!("{}%", needle),
                    MatchKind::EndsWith => format!("%{}", needle),
                };
                write!(f, "{} like '{}'", expr, pattern)
            }
            Self::IsNull(expr) => write!(f, "{} is null", expr),
            Self::IsNotNull(expr) => write!(f, "{} is not null", expr),
            Self::And(preds) => {
                write!(f, "(")?;
                for (i, p) in preds.iter().enumerate() {
                    if i > 0 {
                        write!(f, " and ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ")")
            }
            Self::Or(preds) => {
                write!(f, "(")?;
                for (i, p) in preds.iter().enumerate() {
                    if i > 0 {
                        write!(f, " or ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ")")
            }
            Self::Not(pred) => write!(f, "not ({})", pred),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::val;

    #[test]
    fn test_all_absent_is_identity() {
        let p = Predicate::all([None, None]);
        assert!(p.is_true());
    }

    #[test]
    fn test_all_skips_absent_terms() {
        let p = Predicate::all([Some(val(1).eq(1)), None, Some(val(2).eq(2))]);
        assert!(matches!(p, Predicate::And(ref terms) if terms.len() == 2));
    }

    #[test]
    fn test_all_single_term_unwrapped() {
        let p = Predicate::all([None, Some(val(1).eq(1))]);
        assert!(matches!(p, Predicate::Compare { .. }));
    }

    #[test]
    fn test_any_absent_is_identity() {
        let p = Predicate::any([None, None]);
        assert!(p.is_true());
    }

    #[test]
    fn test_any_single_term_unwrapped() {
        let p = Predicate::any([None, Some(val(1).eq(1))]);
        assert!(matches!(p, Predicate::Compare { .. }));
    }

    #[test]
    fn test_any_collapses_identity_term() {
        // OR with the identity predicate matches everything.
        let p = Predicate::any([Some(val(1).eq(1)), Some(Predicate::True)]);
        assert!(p.is_true());
    }

    #[test]
    fn test_any_builds_disjunction() {
        let p = Predicate::any([Some(val(1).eq(1)), None, Some(val(2).eq(2))]);
        assert!(matches!(p, Predicate::Or(ref terms) if terms.len() == 2));
    }

    #[test]
    fn test_combinator_output_composes() {
        let combined = Predicate::all([Some(val(1).eq(1)), None]);
        let extended = combined.and_then(val(2).eq(2));
        assert!(matches!(extended, Predicate::And(ref terms) if terms.len() == 2));
    }

    #[test]
    fn test_and_then_identity() {
        let p = Predicate::True.and_then(val(1).eq(1));
        assert!(matches!(p, Predicate::Compare { .. }));

        let p = val(1).eq(1).and_then(Predicate::True);
        assert!(matches!(p, Predicate::Compare { .. }));
    }

    #[test]
    fn test_or_with_identity_is_identity() {
        let p = val(1).eq(1).or_else(Predicate::True);
        assert!(p.is_true());
    }

    #[test]
    fn test_display_order_is_cosmetic() {
        let a = Predicate::and([val(1).eq(1), val(2).eq(2)]);
        let b = Predicate::and([val(2).eq(2), val(1).eq(1)]);
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_display_compare() {
        assert_eq!(val(10).lt(20).to_string(), "10 < 20");
        assert_eq!(
            val("a").eq("b").to_string(),
            "'a' = 'b'"
        );
    }
}
