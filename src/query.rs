//! Query descriptors and the fluent builders that produce them.
//!
//! A [`QueryDescriptor`] is the complete description of one logical request:
//! select list, source, joins, conjoined filter, ordering, and pagination.
//! It is built incrementally by a [`QueryBuilder`] and consumed exactly once
//! by the execution collaborator.
//!
//! Builders are by-value: every method consumes and returns `self`, and
//! `build()` consumes the builder outright. A builder therefore cannot be
//! shared across requests or accumulate filter state from a previous call —
//! each request constructs its own.
//!
//! Invalid descriptor shapes fail at `build()` time, never at execution
//! time: a missing source, an empty update set list, duplicate source
//! aliases, or a column reference whose alias is not a source of the query.

use crate::error::{ErrorCode, QueryError, QueryResult};
use crate::expr::{CaseCondition, Expr};
use crate::pagination::Pagination;
use crate::predicate::Predicate;
use crate::projection::Mapper;
use crate::schema::Source;
use crate::types::{Identifier, SelectList, SortKey, SortKeyList};
use smallvec::SmallVec;
use std::fmt;
use tracing::debug;

/// Join kinds supported by select descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Inner join: combined rows must satisfy the `on` predicate.
    Inner,
    /// Left join: unmatched left rows survive with the right side null.
    Left,
    /// Cross join: every combination, no `on` predicate.
    Cross,
}

impl JoinKind {
    fn keyword(&self) -> &'static str {
        match self {
            Self::Inner => "join",
            Self::Left => "left join",
            Self::Cross => "cross join",
        }
    }
}

/// One joined source with its join condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// The join kind.
    pub kind: JoinKind,
    /// The joined source.
    pub source: Source,
    /// The join condition; the identity predicate for cross joins.
    pub on: Predicate,
}

/// A complete, validated description of one select request.
///
/// Built by [`QueryBuilder::build`]; consumed exactly once by the execution
/// collaborator and then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    /// The select list. Empty means all columns of all sources, in source
    /// and declaration order.
    pub select: SelectList,
    /// The base source.
    pub source: Source,
    /// Joined sources, in join order.
    pub joins: Vec<Join>,
    /// The conjoined filter.
    pub filter: Predicate,
    /// Ordering keys, outermost first.
    pub order: SortKeyList,
    /// Offset/limit pagination.
    pub pagination: Pagination,
}

impl QueryDescriptor {
    /// Aliases of every source of this query, base first.
    pub fn aliases(&self) -> Vec<&Identifier> {
        let mut aliases = vec![self.source.alias()];
        aliases.extend(self.joins.iter().map(|j| j.source.alias()));
        aliases
    }
}

impl fmt::Display for QueryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "select ")?;
        if self.select.is_empty() {
            write!(f, "*")?;
        } else {
            for (i, expr) in self.select.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", expr)?;
            }
        }
        write!(f, " from {} as {}", self.source.table(), self.source.alias())?;
        for join in &self.joins {
            write!(
                f,
                " {} {} as {}",
                join.kind.keyword(),
                join.source.table(),
                join.source.alias()
            )?;
            if !join.on.is_true() {
                write!(f, " on {}", join.on)?;
            }
        }
        if !self.filter.is_true() {
            write!(f, " where {}", self.filter)?;
        }
        if !self.order.is_empty() {
            write!(f, " order by ")?;
            for (i, key) in self.order.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", key)?;
            }
        }
        if !self.pagination.is_empty() {
            write!(f, " {}", self.pagination)?;
        }
        Ok(())
    }
}

/// Fluent, single-use builder for select descriptors.
///
/// ```rust
/// use quill_query::{QueryBuilder, Schema, TableSchema, ColumnType, Pagination};
///
/// let mut schema = Schema::new();
/// schema.register(
///     TableSchema::new("member")
///         .column("username", ColumnType::Text)
///         .column("age", ColumnType::Int),
/// );
/// let member = schema.table("member").unwrap();
///
/// let query = QueryBuilder::select_from(&member)
///     .filter(member.col("age").unwrap().gte(20))
///     .order_by([member.col("age").unwrap().desc()])
///     .paginate(Pagination::first(2))
///     .build()
///     .unwrap();
/// assert!(query.to_string().contains("where member.age >= 20"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    select: SelectList,
    source: Option<Source>,
    joins: Vec<Join>,
    filters: Vec<Predicate>,
    order: SortKeyList,
    pagination: Pagination,
}

impl QueryBuilder {
    /// Start an empty builder. A source must be supplied via
    /// [`QueryBuilder::from`] before building.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a source, selecting all of its columns (and those of any
    /// joined sources).
    pub fn select_from(source: &Source) -> Self {
        Self {
            source: Some(source.clone()),
            ..Self::default()
        }
    }

    /// Start with an explicit select list.
    pub fn select(exprs: impl IntoIterator<Item = Expr>) -> Self {
        Self {
            select: exprs.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Start with the select list of a projection mapper, keeping the
    /// descriptor and the mapper in agreement by construction.
    pub fn select_with<T>(mapper: &Mapper<T>) -> Self {
        Self::select(mapper.exprs().iter().cloned())
    }

    /// Set the base source.
    pub fn from(mut self, source: &Source) -> Self {
        self.source = Some(source.clone());
        self
    }

    /// Inner join another source.
    pub fn join(mut self, source: &Source, on: Predicate) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Inner,
            source: source.clone(),
            on,
        });
        self
    }

    /// Left join another source.
    pub fn left_join(mut self, source: &Source, on: Predicate) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Left,
            source: source.clone(),
            on,
        });
        self
    }

    /// Cross join another source (theta-style joins filter in `where`).
    pub fn cross_join(mut self, source: &Source) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Cross,
            source: source.clone(),
            on: Predicate::True,
        });
        self
    }

    /// Add a filter term; terms are conjoined in the order given.
    pub fn filter(mut self, pred: Predicate) -> Self {
        self.filters.push(pred);
        self
    }

    /// Add a possibly-absent filter term; absence adds no constraint.
    pub fn filter_opt(mut self, pred: Option<Predicate>) -> Self {
        if let Some(pred) = pred {
            self.filters.push(pred);
        }
        self
    }

    /// Add a set of possibly-absent filter terms, conjoined.
    pub fn filter_all(mut self, preds: impl IntoIterator<Item = Option<Predicate>>) -> Self {
        self.filters.extend(preds.into_iter().flatten());
        self
    }

    /// Set the ordering keys.
    pub fn order_by(mut self, keys: impl IntoIterator<Item = SortKey>) -> Self {
        self.order = keys.into_iter().collect();
        self
    }

    /// Set pagination.
    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    /// Validate and produce the descriptor, consuming the builder.
    pub fn build(self) -> QueryResult<QueryDescriptor> {
        let source = self.source.ok_or_else(QueryError::missing_source)?;

        {
            let mut aliases: SmallVec<[&str; 4]> = SmallVec::new();
            aliases.push(source.alias().as_str());
            for join in &self.joins {
                let alias = join.source.alias().as_str();
                if aliases.contains(&alias) {
                    return Err(QueryError::duplicate_alias(alias));
                }
                aliases.push(alias);
            }

            for expr in &self.select {
                check_expr_scope(expr, &aliases)?;
            }
            if self.select.iter().any(Expr::contains_aggregate) {
                for expr in &self.select {
                    if !is_group_safe(expr) {
                        return Err(QueryError::new(
                            ErrorCode::InvalidSelect,
                            format!(
                                "Select list mixes aggregates with the non-aggregate expression '{}'",
                                expr
                            ),
                        ));
                    }
                }
            }
            for join in &self.joins {
                check_pred_scope(&join.on, &aliases)?;
            }
            for pred in &self.filters {
                check_pred_scope(pred, &aliases)?;
            }
            for key in &self.order {
                check_expr_scope(&key.expr, &aliases)?;
            }
        }

        let descriptor = QueryDescriptor {
            select: self.select,
            source,
            joins: self.joins,
            filter: Predicate::and(self.filters),
            order: self.order,
            pagination: self.pagination,
        };
        debug!(query = %descriptor, "built select descriptor");
        Ok(descriptor)
    }
}

/// A bulk update descriptor: set list plus predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateDescriptor {
    /// The target source.
    pub source: Source,
    /// Columns and their new value expressions, applied together per row.
    pub sets: Vec<(Identifier, Expr)>,
    /// Rows to update.
    pub filter: Predicate,
}

/// A bulk delete descriptor: predicate only.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteDescriptor {
    /// The target source.
    pub source: Source,
    /// Rows to delete.
    pub filter: Predicate,
}

/// A bulk mutation, distinct from select descriptors. Executing one bypasses
/// per-object change tracking, so the engine signals cache invalidation for
/// the touched table afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Bulk update.
    Update(UpdateDescriptor),
    /// Bulk delete.
    Delete(DeleteDescriptor),
}

impl Mutation {
    /// The table this mutation touches.
    pub fn table(&self) -> &Identifier {
        match self {
            Self::Update(u) => u.source.table(),
            Self::Delete(d) => d.source.table(),
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Update(u) => {
                write!(f, "update {} set ", u.source.table())?;
                for (i, (column, expr)) in u.sets.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", column, expr)?;
                }
                if !u.filter.is_true() {
                    write!(f, " where {}", u.filter)?;
                }
                Ok(())
            }
            Self::Delete(d) => {
                write!(f, "delete from {}", d.source.table())?;
                if !d.filter.is_true() {
                    write!(f, " where {}", d.filter)?;
                }
                Ok(())
            }
        }
    }
}

/// Fluent, single-use builder for bulk updates.
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    source: Source,
    sets: Vec<(Identifier, Expr)>,
    filters: Vec<Predicate>,
}

impl UpdateBuilder {
    /// Start an update against a source table.
    pub fn table(source: &Source) -> Self {
        Self {
            source: source.clone(),
            sets: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Set a column to a value or expression (e.g. `age = age * 2`).
    pub fn set(mut self, column: impl Into<Identifier>, value: impl Into<Expr>) -> Self {
        self.sets.push((column.into(), value.into()));
        self
    }

    /// Add a filter term; terms are conjoined.
    pub fn filter(mut self, pred: Predicate) -> Self {
        self.filters.push(pred);
        self
    }

    /// Add a possibly-absent filter term.
    pub fn filter_opt(mut self, pred: Option<Predicate>) -> Self {
        if let Some(pred) = pred {
            self.filters.push(pred);
        }
        self
    }

    /// Validate and produce the mutation, consuming the builder.
    ///
    /// Fails at build time if the set list is empty, a set column does not
    /// exist on the table, or an expression references a foreign alias.
    pub fn build(self) -> QueryResult<Mutation> {
        if self.sets.is_empty() {
            return Err(QueryError::empty_set_list(self.source.table().as_str()));
        }
        let aliases = [self.source.alias().as_str()];
        for (column, expr) in &self.sets {
            if self.source.column_type(column.as_str()).is_none() {
                return Err(QueryError::unknown_column(
                    self.source.table().as_str(),
                    column.as_str(),
                ));
            }
            check_expr_scope(expr, &aliases)?;
        }
        for pred in &self.filters {
            check_pred_scope(pred, &aliases)?;
        }
        let mutation = Mutation::Update(UpdateDescriptor {
            source: self.source,
            sets: self.sets,
            filter: Predicate::and(self.filters),
        });
        debug!(mutation = %mutation, "built update descriptor");
        Ok(mutation)
    }
}

/// Fluent, single-use builder for bulk deletes.
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    source: Source,
    filters: Vec<Predicate>,
}

impl DeleteBuilder {
    /// Start a delete against a source table.
    pub fn table(source: &Source) -> Self {
        Self {
            source: source.clone(),
            filters: Vec::new(),
        }
    }

    /// Add a filter term; terms are conjoined. No filter deletes every row.
    pub fn filter(mut self, pred: Predicate) -> Self {
        self.filters.push(pred);
        self
    }

    /// Add a possibly-absent filter term.
    pub fn filter_opt(mut self, pred: Option<Predicate>) -> Self {
        if let Some(pred) = pred {
            self.filters.push(pred);
        }
        self
    }

    /// Validate and produce the mutation, consuming the builder.
    pub fn build(self) -> QueryResult<Mutation> {
        let aliases = [self.source.alias().as_str()];
        for pred in &self.filters {
            check_pred_scope(pred, &aliases)?;
        }
        let mutation = Mutation::Delete(DeleteDescriptor {
            source: self.source,
            filter: Predicate::and(self.filters),
        });
        debug!(mutation = %mutation, "built delete descriptor");
        Ok(mutation)
    }
}

/// Whether an expression may appear in a select list that collapses to a
/// single aggregate row.
fn is_group_safe(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(_) => true,
        Expr::Alias { expr, .. } => is_group_safe(expr),
        _ => expr.contains_aggregate(),
    }
}

/// Check that every column reference in `expr` is bound to one of `aliases`.
///
/// Embedded subqueries are skipped: they carry their own scope and were
/// validated by their own `build()` call.
fn check_expr_scope(expr: &Expr, aliases: &[&str]) -> QueryResult<()> {
    match expr {
        Expr::Column(col) => {
            if aliases.contains(&col.source.as_str()) {
                Ok(())
            } else {
                Err(QueryError::unbound_alias(
                    col.source.as_str(),
                    col.name.as_str(),
                ))
            }
        }
        Expr::Literal(_) | Expr::Subquery(_) => Ok(()),
        Expr::Binary { lhs, rhs, .. } => {
            check_expr_scope(lhs, aliases)?;
            check_expr_scope(rhs, aliases)
        }
        Expr::Alias { expr, .. } => check_expr_scope(expr, aliases),
        Expr::Aggregate { arg, .. } => match arg {
            Some(arg) => check_expr_scope(arg, aliases),
            None => Ok(()),
        },
        Expr::Function { args, .. } => {
            for arg in args {
                check_expr_scope(arg, aliases)?;
            }
            Ok(())
        }
        Expr::Case(case) => {
            if let Some(subject) = &case.subject {
                check_expr_scope(subject, aliases)?;
            }
            for arm in &case.arms {
                match &arm.when {
                    CaseCondition::Matches(e) => check_expr_scope(e, aliases)?,
                    CaseCondition::Holds(p) => check_pred_scope(p, aliases)?,
                }
                check_expr_scope(&arm.then, aliases)?;
            }
            check_expr_scope(&case.otherwise, aliases)
        }
    }
}

/// Predicate counterpart of [`check_expr_scope`].
fn check_pred_scope(pred: &Predicate, aliases: &[&str]) -> QueryResult<()> {
    match pred {
        Predicate::True => Ok(()),
        Predicate::Compare { lhs, rhs, .. } => {
            check_expr_scope(lhs, aliases)?;
            check_expr_scope(rhs, aliases)
        }
        Predicate::Between { expr, low, high } => {
            check_expr_scope(expr, aliases)?;
            check_expr_scope(low, aliases)?;
            check_expr_scope(high, aliases)
        }
        Predicate::In { expr, list } => {
            check_expr_scope(expr, aliases)?;
            for item in list {
                check_expr_scope(item, aliases)?;
            }
            Ok(())
        }
        Predicate::InSubquery { expr, .. } => check_expr_scope(expr, aliases),
        Predicate::Like { expr, .. } => check_expr_scope(expr, aliases),
        Predicate::IsNull(expr) | Predicate::IsNotNull(expr) => check_expr_scope(expr, aliases),
        Predicate::And(preds) | Predicate::Or(preds) => {
            for p in preds {
                check_pred_scope(p, aliases)?;
            }
            Ok(())
        }
        Predicate::Not(pred) => check_pred_scope(pred, aliases),
    }
}
