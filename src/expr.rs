//! Typed expression nodes.
//!
//! Expressions are immutable trees built by pure constructors: column
//! references, literals, arithmetic and string composition, `case` chains,
//! aggregates, scalar functions, and embedded scalar subqueries. Comparison
//! methods produce [`Predicate`]s; `asc`/`desc` produce [`SortKey`]s.
//!
//! ```rust
//! use quill_query::expr::val;
//!
//! // Literals are plain values; comparisons yield predicates.
//! let p = val(10).lt(20);
//! assert_eq!(p.to_string(), "10 < 20");
//!
//! // Case chains evaluate first-match-wins, left to right.
//! let label = val(10)
//!     .when(10).then("ten")
//!     .when(20).then("twenty")
//!     .otherwise("other");
//! assert!(label.to_string().starts_with("case"));
//! ```

use crate::predicate::{MatchKind, Predicate};
use crate::query::QueryDescriptor;
use crate::types::{Identifier, SortKey, SortOrder};
use crate::value::Value;
use std::fmt;

/// A resolved reference to a column of an aliased source.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    /// The source alias the column belongs to.
    pub source: Identifier,
    /// The column name.
    pub name: Identifier,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.source, self.name)
    }
}

/// Binary operators over scalar expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// Numeric addition.
    Add,
    /// Numeric subtraction.
    Sub,
    /// Numeric multiplication.
    Mul,
    /// Numeric division.
    Div,
    /// String concatenation (null propagates).
    Concat,
}

impl BinaryOp {
    /// The operator's display symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Concat => "||",
        }
    }
}

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    /// Row or non-null value count.
    Count,
    /// Sum over non-null values.
    Sum,
    /// Average over non-null values (always a float).
    Avg,
    /// Minimum non-null value.
    Min,
    /// Maximum non-null value.
    Max,
}

impl AggregateFn {
    /// The function's display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// One arm of a `case` chain.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseArm {
    /// The arm's condition.
    pub when: CaseCondition,
    /// The arm's result expression.
    pub then: Expr,
}

/// Condition of a `case` arm: a match value (simple form, keyed on a subject)
/// or an arbitrary predicate (searched form).
#[derive(Debug, Clone, PartialEq)]
pub enum CaseCondition {
    /// Simple form: the subject equals this value.
    Matches(Expr),
    /// Searched form: this predicate holds.
    Holds(Predicate),
}

/// A complete `case` chain. Arms are tried in order; the first match wins.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpr {
    /// The subject for simple-form arms, absent for searched chains.
    pub subject: Option<Expr>,
    /// The ordered arms.
    pub arms: Vec<CaseArm>,
    /// The fallback when no arm matches.
    pub otherwise: Expr,
}

/// A typed scalar expression node. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A column reference.
    Column(ColumnRef),
    /// A literal constant.
    Literal(Value),
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// A `case` chain.
    Case(Box<CaseExpr>),
    /// An aggregate over the filtered row set. `arg` of `None` means `count(*)`.
    Aggregate {
        /// The aggregate function.
        func: AggregateFn,
        /// The aggregated expression, absent for `count(*)`.
        arg: Option<Box<Expr>>,
    },
    /// A scalar function call by name.
    Function {
        /// The function name.
        name: Identifier,
        /// The arguments, in order.
        args: Vec<Expr>,
    },
    /// An embedded scalar subquery. Must produce exactly one row and one
    /// column when evaluated in a scalar position.
    Subquery(Box<QueryDescriptor>),
    /// An aliased expression, giving it an output name.
    Alias {
        /// The inner expression.
        expr: Box<Expr>,
        /// The output name.
        name: Identifier,
    },
}

/// Create a literal expression from a plain value.
pub fn val(v: impl Into<Value>) -> Expr {
    Expr::Literal(v.into())
}

impl Expr {
    /// Create a column reference. Normally obtained through
    /// [`Source::col`](crate::schema::Source::col), which resolves the name
    /// against the catalog first.
    pub fn column(source: impl Into<Identifier>, name: impl Into<Identifier>) -> Self {
        Self::Column(ColumnRef {
            source: source.into(),
            name: name.into(),
        })
    }

    /// Embed a nested query as a scalar subquery.
    pub fn subquery(query: QueryDescriptor) -> Self {
        Self::Subquery(Box::new(query))
    }

    /// `count(*)`: counts rows regardless of null values.
    pub fn count_all() -> Self {
        Self::Aggregate {
            func: AggregateFn::Count,
            arg: None,
        }
    }

    /// Call a scalar function by name.
    pub fn function(name: impl Into<Identifier>, args: impl IntoIterator<Item = Expr>) -> Self {
        Self::Function {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }

    // ============== Composition ==============

    /// Give this expression an output name.
    pub fn alias(self, name: impl Into<Identifier>) -> Self {
        Self::Alias {
            expr: Box::new(self),
            name: name.into(),
        }
    }

    fn binary(self, op: BinaryOp, rhs: impl Into<Expr>) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(self),
            rhs: Box::new(rhs.into()),
        }
    }

    /// Numeric addition.
    pub fn add(self, rhs: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Add, rhs)
    }

    /// Numeric subtraction.
    pub fn sub(self, rhs: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Sub, rhs)
    }

    /// Numeric multiplication.
    pub fn mul(self, rhs: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Mul, rhs)
    }

    /// Numeric division.
    pub fn div(self, rhs: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Div, rhs)
    }

    /// String concatenation. Null operands propagate.
    pub fn concat(self, rhs: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Concat, rhs)
    }

    /// Cast to display text (`str`), e.g. for concatenating numeric columns.
    pub fn str_value(self) -> Self {
        Self::function("str", [self])
    }

    /// Uppercase a string expression.
    pub fn upper(self) -> Self {
        Self::function("upper", [self])
    }

    /// Lowercase a string expression.
    pub fn lower(self) -> Self {
        Self::function("lower", [self])
    }

    /// String length.
    pub fn length(self) -> Self {
        Self::function("length", [self])
    }

    /// Replace occurrences of `from` with `to` in a string expression.
    pub fn replace(self, from: impl Into<Expr>, to: impl Into<Expr>) -> Self {
        Self::function("replace", [self, from.into(), to.into()])
    }

    // ============== Aggregates ==============

    /// Count of non-null values of this expression.
    pub fn count(self) -> Self {
        Self::Aggregate {
            func: AggregateFn::Count,
            arg: Some(Box::new(self)),
        }
    }

    /// Sum of non-null values.
    pub fn sum(self) -> Self {
        Self::Aggregate {
            func: AggregateFn::Sum,
            arg: Some(Box::new(self)),
        }
    }

    /// Average of non-null values.
    pub fn avg(self) -> Self {
        Self::Aggregate {
            func: AggregateFn::Avg,
            arg: Some(Box::new(self)),
        }
    }

    /// Minimum non-null value.
    pub fn min(self) -> Self {
        Self::Aggregate {
            func: AggregateFn::Min,
            arg: Some(Box::new(self)),
        }
    }

    /// Maximum non-null value.
    pub fn max(self) -> Self {
        Self::Aggregate {
            func: AggregateFn::Max,
            arg: Some(Box::new(self)),
        }
    }

    // ============== Comparisons (produce predicates) ==============

    /// Equals.
    pub fn eq(self, rhs: impl Into<Expr>) -> Predicate {
        Predicate::eq(self, rhs.into())
    }

    /// Not equals.
    pub fn ne(self, rhs: impl Into<Expr>) -> Predicate {
        Predicate::ne(self, rhs.into())
    }

    /// Less than.
    pub fn lt(self, rhs: impl Into<Expr>) -> Predicate {
        Predicate::lt(self, rhs.into())
    }

    /// Less than or equal.
    pub fn lte(self, rhs: impl Into<Expr>) -> Predicate {
        Predicate::lte(self, rhs.into())
    }

    /// Greater than.
    pub fn gt(self, rhs: impl Into<Expr>) -> Predicate {
        Predicate::gt(self, rhs.into())
    }

    /// Greater than or equal.
    pub fn gte(self, rhs: impl Into<Expr>) -> Predicate {
        Predicate::gte(self, rhs.into())
    }

    /// Inclusive range check.
    pub fn between(self, low: impl Into<Expr>, high: impl Into<Expr>) -> Predicate {
        Predicate::Between {
            expr: self,
            low: low.into(),
            high: high.into(),
        }
    }

    /// Membership in an explicit value list.
    pub fn in_list<I, E>(self, values: I) -> Predicate
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        Predicate::In {
            expr: self,
            list: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Equals the result of a scalar subquery.
    pub fn eq_subquery(self, query: QueryDescriptor) -> Predicate {
        Predicate::eq(self, Expr::subquery(query))
    }

    /// Greater than or equal to the result of a scalar subquery.
    pub fn gte_subquery(self, query: QueryDescriptor) -> Predicate {
        Predicate::gte(self, Expr::subquery(query))
    }

    /// Membership in a one-column subquery result.
    pub fn in_subquery(self, query: QueryDescriptor) -> Predicate {
        Predicate::InSubquery {
            expr: self,
            query: Box::new(query),
        }
    }

    /// Substring containment for string expressions.
    pub fn contains(self, needle: impl Into<String>) -> Predicate {
        Predicate::Like {
            expr: self,
            kind: MatchKind::Contains,
            needle: needle.into(),
        }
    }

    /// Prefix match for string expressions.
    pub fn starts_with(self, needle: impl Into<String>) -> Predicate {
        Predicate::Like {
            expr: self,
            kind: MatchKind::StartsWith,
            needle: needle.into(),
        }
    }

    /// Suffix match for string expressions.
    pub fn ends_with(self, needle: impl Into<String>) -> Predicate {
        Predicate::Like {
            expr: self,
            kind: MatchKind::EndsWith,
            needle: needle.into(),
        }
    }

    /// Null check.
    pub fn is_null(self) -> Predicate {
        Predicate::IsNull(self)
    }

    /// Non-null check.
    pub fn is_not_null(self) -> Predicate {
        Predicate::IsNotNull(self)
    }

    // ============== Ordering ==============

    /// Ascending sort key.
    pub fn asc(self) -> SortKey {
        SortKey::new(self, SortOrder::Asc)
    }

    /// Descending sort key.
    pub fn desc(self) -> SortKey {
        SortKey::new(self, SortOrder::Desc)
    }

    // ============== Case chains ==============

    /// Start a simple `case` chain keyed on this expression.
    pub fn when(self, value: impl Into<Expr>) -> SimpleCaseWhen {
        SimpleCaseWhen {
            subject: self,
            arms: Vec::new(),
            pending: value.into(),
        }
    }

    // ============== Introspection ==============

    /// The output name of this expression, if it has one: an alias, a column
    /// name, an aggregate function name, or a scalar function name.
    pub fn output_name(&self) -> Option<Identifier> {
        match self {
            Self::Alias { name, .. } => Some(name.clone()),
            Self::Column(col) => Some(col.name.clone()),
            Self::Aggregate { func, .. } => Some(Identifier::from_static(func.name())),
            Self::Function { name, .. } => Some(name.clone()),
            _ => None,
        }
    }

    /// Whether this expression contains an aggregate node outside of any
    /// embedded subquery.
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Self::Aggregate { .. } => true,
            Self::Column(_) | Self::Literal(_) | Self::Subquery(_) => false,
            Self::Binary { lhs, rhs, .. } => lhs.contains_aggregate() || rhs.contains_aggregate(),
            Self::Alias { expr, .. } => expr.contains_aggregate(),
            Self::Function { args, .. } => args.iter().any(Expr::contains_aggregate),
            Self::Case(case) => {
                case.subject.as_ref().is_some_and(Expr::contains_aggregate)
                    || case.otherwise.contains_aggregate()
                    || case.arms.iter().any(|arm| {
                        arm.then.contains_aggregate()
                            || matches!(&arm.when, CaseCondition::Matches(e) if e.contains_aggregate())
                    })
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(col) => write!(f, "{}", col),
            Self::Literal(v) => write!(f, "{}", v),
            Self::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Self::Aggregate { func, arg: None } => write!(f, "{}(*)", func.name()),
            Self::Aggregate {
                func,
                arg: Some(arg),
            } => write!(f, "{}({})", func.name(), arg),
            Self::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Self::Subquery(q) => write!(f, "({})", q),
            Self::Alias { expr, name } => write!(f, "{} as {}", expr, name),
            Self::Case(case) => {
                write!(f, "case")?;
                if let Some(subject) = &case.subject {
                    write!(f, " {}", subject)?;
                }
                for arm in &case.arms {
                    match &arm.when {
                        CaseCondition::Matches(v) => write!(f, " when {} then {}", v, arm.then)?,
                        CaseCondition::Holds(p) => write!(f, " when {} then {}", p, arm.then)?,
                    }
                }
                write!(f, " else {} end", case.otherwise)
            }
        }
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Self::Literal(v)
    }
}

impl From<&str> for Expr {
    fn from(v: &str) -> Self {
        val(v)
    }
}

impl From<String> for Expr {
    fn from(v: String) -> Self {
        val(v)
    }
}

impl From<i32> for Expr {
    fn from(v: i32) -> Self {
        val(v)
    }
}

impl From<i64> for Expr {
    fn from(v: i64) -> Self {
        val(v)
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        val(v)
    }
}

impl From<bool> for Expr {
    fn from(v: bool) -> Self {
        val(v)
    }
}

/// Entry point for searched `case` chains.
///
/// ```rust
/// use quill_query::expr::{Case, val};
///
/// let label = Case::when(val(15).between(0, 20)).then("0-20")
///     .when(val(15).between(21, 30)).then("21-30")
///     .otherwise("other");
/// ```
pub struct Case;

impl Case {
    /// Start a searched `case` chain with a predicate condition.
    pub fn when(condition: Predicate) -> SearchedCaseWhen {
        SearchedCaseWhen {
            arms: Vec::new(),
            pending: condition,
        }
    }
}

/// A simple `case` chain awaiting its `then` result.
pub struct SimpleCaseWhen {
    subject: Expr,
    arms: Vec<CaseArm>,
    pending: Expr,
}

impl SimpleCaseWhen {
    /// Supply the result for the pending match value.
    pub fn then(mut self, result: impl Into<Expr>) -> SimpleCase {
        self.arms.push(CaseArm {
            when: CaseCondition::Matches(self.pending),
            then: result.into(),
        });
        SimpleCase {
            subject: self.subject,
            arms: self.arms,
        }
    }
}

/// A simple `case` chain that can take another arm or be closed.
pub struct SimpleCase {
    subject: Expr,
    arms: Vec<CaseArm>,
}

impl SimpleCase {
    /// Add another match value.
    pub fn when(self, value: impl Into<Expr>) -> SimpleCaseWhen {
        SimpleCaseWhen {
            subject: self.subject,
            arms: self.arms,
            pending: value.into(),
        }
    }

    /// Close the chain with a fallback.
    pub fn otherwise(self, fallback: impl Into<Expr>) -> Expr {
        Expr::Case(Box::new(CaseExpr {
            subject: Some(self.subject),
            arms: self.arms,
            otherwise: fallback.into(),
        }))
    }
}

/// A searched `case` chain awaiting its `then` result.
pub struct SearchedCaseWhen {
    arms: Vec<CaseArm>,
    pending: Predicate,
}

impl SearchedCaseWhen {
    /// Supply the result for the pending condition.
    pub fn then(mut self, result: impl Into<Expr>) -> SearchedCase {
        self.arms.push(CaseArm {
            when: CaseCondition::Holds(self.pending),
            then: result.into(),
        });
        SearchedCase { arms: self.arms }
    }
}

/// A searched `case` chain that can take another arm or be closed.
pub struct SearchedCase {
    arms: Vec<CaseArm>,
}

impl SearchedCase {
    /// Add another condition.
    pub fn when(self, condition: Predicate) -> SearchedCaseWhen {
        SearchedCaseWhen {
            arms: self.arms,
            pending: condition,
        }
    }

    /// Close the chain with a fallback.
    pub fn otherwise(self, fallback: impl Into<Expr>) -> Expr {
        Expr::Case(Box::new(CaseExpr {
            subject: None,
            arms: self.arms,
            otherwise: fallback.into(),
        }))
    }
}
