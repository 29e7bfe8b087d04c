//! In-memory execution engine for descriptors.
//!
//! The engine owns the table data and evaluates descriptors directly over
//! it: join expansion, three-valued predicate filtering, aggregate collapse,
//! ordering with explicit null placement, and pagination, in that order.
//!
//! Bulk mutations run in two passes: every affected row and its new values
//! are planned against the pre-mutation state, then applied together. After
//! a mutation the engine signals invalidation for the touched table, since
//! bulk writes bypass any per-object state a caller may hold.
//!
//! ```rust
//! use quill_query::{Engine, QueryBuilder, Schema, TableSchema, ColumnType};
//!
//! let mut schema = Schema::new();
//! schema.register(
//!     TableSchema::new("member")
//!         .column("username", ColumnType::Text)
//!         .column("age", ColumnType::Int),
//! );
//! let mut engine = Engine::new(schema.clone());
//! engine.insert("member", vec!["member1".into(), 10.into()]).unwrap();
//! engine.insert("member", vec!["member2".into(), 20.into()]).unwrap();
//!
//! let member = schema.table("member").unwrap();
//! let query = QueryBuilder::select_from(&member)
//!     .filter(member.col("age").unwrap().gte(20))
//!     .build()
//!     .unwrap();
//! let rows = engine.fetch(&query).unwrap();
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0].get_str("username").unwrap(), "member2");
//! ```

use crate::error::{ErrorCode, QueryError, QueryResult};
use crate::expr::{AggregateFn, BinaryOp, CaseCondition, ColumnRef, Expr};
use crate::predicate::{CompareOp, MatchKind, Predicate};
use crate::query::{JoinKind, Mutation, QueryDescriptor};
use crate::row::Row;
use crate::schema::{ColumnType, Schema, TableSchema};
use crate::types::{Identifier, NullsOrder, SortKey, SortOrder};
use crate::value::Value;
use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::{SmallVec, smallvec};
use std::cmp::Ordering;
use tracing::debug;

/// Invalidation hook, called with the name of a table after a bulk mutation.
pub type InvalidationHook = Box<dyn Fn(&str) + Send + Sync>;

/// A combined row under join expansion: one row index per source slot.
/// `None` marks the unmatched right side of a left join.
type Combo = SmallVec<[Option<usize>; 4]>;

struct Table {
    schema: TableSchema,
    rows: Vec<Vec<Value>>,
}

/// One source participating in a query, bound to its backing rows.
struct Slot<'a> {
    alias: &'a str,
    schema: &'a TableSchema,
    rows: &'a [Vec<Value>],
}

/// Evaluation context: the slots of the query plus one combined row.
struct Frame<'a> {
    slots: &'a [Slot<'a>],
    combo: &'a Combo,
}

/// The in-memory engine: table data plus invalidation hooks.
pub struct Engine {
    tables: IndexMap<Identifier, Table>,
    hooks: Mutex<Vec<InvalidationHook>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("tables", &self.tables.keys().collect::<Vec<_>>())
            .field("hooks", &self.hooks.lock().len())
            .finish()
    }
}

impl Engine {
    /// Create an engine with empty tables for every table in the schema.
    pub fn new(schema: Schema) -> Self {
        let tables = schema
            .tables()
            .map(|t| {
                (
                    t.name().clone(),
                    Table {
                        schema: t.clone(),
                        rows: Vec::new(),
                    },
                )
            })
            .collect();
        Self {
            tables,
            hooks: Mutex::new(Vec::new()),
        }
    }

    /// Register a hook called with the table name after every bulk mutation.
    pub fn on_invalidate(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        self.hooks.lock().push(Box::new(hook));
    }

    /// Insert one row, given in column declaration order.
    pub fn insert(
        &mut self,
        table: &str,
        values: impl IntoIterator<Item = Value>,
    ) -> QueryResult<()> {
        let table = self
            .tables
            .get_mut(table)
            .ok_or_else(|| QueryError::unknown_table(table))?;
        let values: Vec<Value> = values.into_iter().collect();
        if values.len() != table.schema.len() {
            return Err(QueryError::new(
                ErrorCode::RowShape,
                format!(
                    "Table '{}' has {} columns but the row carries {} values",
                    table.schema.name(),
                    table.schema.len(),
                    values.len()
                ),
            )
            .with_table(table.schema.name().as_str()));
        }
        for (name, value) in table.schema.column_names().zip(&values) {
            let ty = table
                .schema
                .column_type(name.as_str())
                .ok_or_else(|| QueryError::unknown_column(table.schema.name().as_str(), name.as_str()))?;
            if !value_fits(ty, value) {
                return Err(QueryError::new(
                    ErrorCode::RowShape,
                    format!(
                        "Column '{}' of '{}' cannot hold a {} value",
                        name,
                        table.schema.name(),
                        value.type_name()
                    ),
                )
                .with_table(table.schema.name().as_str())
                .with_field(name.as_str()));
            }
        }
        table.rows.push(values);
        Ok(())
    }

    /// Number of rows currently stored in a table.
    pub fn table_len(&self, table: &str) -> QueryResult<usize> {
        self.tables
            .get(table)
            .map(|t| t.rows.len())
            .ok_or_else(|| QueryError::unknown_table(table))
    }

    /// Run a select descriptor, materializing every matching row.
    pub fn fetch(&self, query: &QueryDescriptor) -> QueryResult<Vec<Row>> {
        let rows = self.run_select(query)?;
        debug!(query = %query, rows = rows.len(), "fetched");
        Ok(rows)
    }

    /// Run a select descriptor expecting exactly one row.
    pub fn fetch_one(&self, query: &QueryDescriptor) -> QueryResult<Row> {
        let mut rows = self.run_select(query)?;
        if rows.len() > 1 {
            return Err(QueryError::not_unique(query.source.table().as_str()));
        }
        rows.pop()
            .ok_or_else(|| QueryError::not_found(query.source.table().as_str()))
    }

    /// Run a select descriptor, returning the first row if any.
    pub fn fetch_first(&self, query: &QueryDescriptor) -> QueryResult<Option<Row>> {
        Ok(self.run_select(query)?.into_iter().next())
    }

    /// Number of rows the descriptor matches.
    pub fn count(&self, query: &QueryDescriptor) -> QueryResult<usize> {
        Ok(self.run_select(query)?.len())
    }

    /// Run a select descriptor and map every row through a projection mapper.
    pub fn fetch_as<T>(
        &self,
        query: &QueryDescriptor,
        mapper: &crate::projection::Mapper<T>,
    ) -> QueryResult<Vec<T>> {
        self.fetch(query)?
            .into_iter()
            .map(|row| mapper.map(row))
            .collect()
    }

    /// Execute a bulk mutation, returning the number of affected rows.
    pub fn execute(&mut self, mutation: &Mutation) -> QueryResult<usize> {
        let affected = match mutation {
            Mutation::Update(update) => {
                // Plan against the pre-mutation state so expressions like
                // `age = age * 2` read the old values.
                let planned: Vec<(usize, Vec<(usize, Value)>)> = {
                    let table = self.table(update.source.table())?;
                    let slots = [Slot {
                        alias: update.source.alias().as_str(),
                        schema: &table.schema,
                        rows: &table.rows,
                    }];
                    let mut planned = Vec::new();
                    for i in 0..table.rows.len() {
                        let combo: Combo = smallvec![Some(i)];
                        let frame = Frame {
                            slots: &slots,
                            combo: &combo,
                        };
                        if self.eval_pred(&frame, &update.filter)? != Some(true) {
                            continue;
                        }
                        let mut sets = Vec::with_capacity(update.sets.len());
                        for (column, expr) in &update.sets {
                            let idx = table.schema.column_index(column.as_str()).ok_or_else(|| {
                                QueryError::unknown_column(
                                    update.source.table().as_str(),
                                    column.as_str(),
                                )
                            })?;
                            sets.push((idx, self.eval_expr(&frame, expr)?));
                        }
                        planned.push((i, sets));
                    }
                    planned
                };
                let count = planned.len();
                let table = self.table_mut(update.source.table())?;
                for (i, sets) in planned {
                    for (idx, value) in sets {
                        table.rows[i][idx] = value;
                    }
                }
                count
            }
            Mutation::Delete(delete) => {
                let keep: Vec<bool> = {
                    let table = self.table(delete.source.table())?;
                    let slots = [Slot {
                        alias: delete.source.alias().as_str(),
                        schema: &table.schema,
                        rows: &table.rows,
                    }];
                    let mut keep = Vec::with_capacity(table.rows.len());
                    for i in 0..table.rows.len() {
                        let combo: Combo = smallvec![Some(i)];
                        let frame = Frame {
                            slots: &slots,
                            combo: &combo,
                        };
                        keep.push(self.eval_pred(&frame, &delete.filter)? != Some(true));
                    }
                    keep
                };
                let count = keep.iter().filter(|k| !**k).count();
                let table = self.table_mut(delete.source.table())?;
                let mut flags = keep.into_iter();
                table.rows.retain(|_| flags.next().unwrap_or(true));
                count
            }
        };
        debug!(mutation = %mutation, affected, "executed bulk mutation");
        self.invalidate(mutation.table().as_str());
        Ok(affected)
    }

    fn invalidate(&self, table: &str) {
        for hook in self.hooks.lock().iter() {
            hook(table);
        }
    }

    fn table(&self, name: &Identifier) -> QueryResult<&Table> {
        self.tables
            .get(name.as_str())
            .ok_or_else(|| QueryError::unknown_table(name.as_str()))
    }

    fn table_mut(&mut self, name: &Identifier) -> QueryResult<&mut Table> {
        self.tables
            .get_mut(name.as_str())
            .ok_or_else(|| QueryError::unknown_table(name.as_str()))
    }

    // ============== Select pipeline ==============

    fn run_select(&self, q: &QueryDescriptor) -> QueryResult<Vec<Row>> {
        let mut slots = Vec::with_capacity(1 + q.joins.len());
        let base = self.table(q.source.table())?;
        slots.push(Slot {
            alias: q.source.alias().as_str(),
            schema: &base.schema,
            rows: &base.rows,
        });
        for join in &q.joins {
            let table = self.table(join.source.table())?;
            slots.push(Slot {
                alias: join.source.alias().as_str(),
                schema: &table.schema,
                rows: &table.rows,
            });
        }

        let mut combos: Vec<Combo> = (0..base.rows.len()).map(|i| smallvec![Some(i)]).collect();
        for (j, join) in q.joins.iter().enumerate() {
            let right_len = slots[j + 1].rows.len();
            let mut next = Vec::new();
            for combo in &combos {
                let mut matched = false;
                for r in 0..right_len {
                    let mut candidate = combo.clone();
                    candidate.push(Some(r));
                    let frame = Frame {
                        slots: &slots,
                        combo: &candidate,
                    };
                    if self.eval_pred(&frame, &join.on)? == Some(true) {
                        matched = true;
                        next.push(candidate);
                    }
                }
                if join.kind == JoinKind::Left && !matched {
                    let mut candidate = combo.clone();
                    candidate.push(None);
                    next.push(candidate);
                }
            }
            combos = next;
        }

        // Three-valued filtering: a null outcome excludes the row.
        let mut filtered = Vec::with_capacity(combos.len());
        for combo in combos {
            let frame = Frame {
                slots: &slots,
                combo: &combo,
            };
            if self.eval_pred(&frame, &q.filter)? == Some(true) {
                filtered.push(combo);
            }
        }

        if q.select.iter().any(Expr::contains_aggregate) {
            return self.aggregate_row(q, &slots, &filtered);
        }

        if !q.order.is_empty() {
            let mut keyed = Vec::with_capacity(filtered.len());
            for combo in filtered {
                let frame = Frame {
                    slots: &slots,
                    combo: &combo,
                };
                let keys = q
                    .order
                    .iter()
                    .map(|k| self.eval_expr(&frame, &k.expr))
                    .collect::<QueryResult<Vec<_>>>()?;
                keyed.push((combo, keys));
            }
            keyed.sort_by(|a, b| {
                for (i, key) in q.order.iter().enumerate() {
                    let ord = compare_sort_values(&a.1[i], &b.1[i], key);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
            filtered = keyed.into_iter().map(|(combo, _)| combo).collect();
        }

        let range = q.pagination.range(filtered.len());
        let page = &filtered[range];

        let names = output_names(q, &slots);
        let mut rows = Vec::with_capacity(page.len());
        for combo in page {
            let frame = Frame {
                slots: &slots,
                combo,
            };
            let values = if q.select.is_empty() {
                self.all_columns(&frame)
            } else {
                q.select
                    .iter()
                    .map(|e| self.eval_expr(&frame, e))
                    .collect::<QueryResult<Vec<_>>>()?
            };
            rows.push(Row::new(names.clone(), values));
        }
        Ok(rows)
    }

    /// Collapse the filtered row set into a single aggregate row.
    fn aggregate_row(
        &self,
        q: &QueryDescriptor,
        slots: &[Slot<'_>],
        combos: &[Combo],
    ) -> QueryResult<Vec<Row>> {
        let names = output_names(q, slots);
        let values = q
            .select
            .iter()
            .map(|e| self.eval_group(slots, combos, e))
            .collect::<QueryResult<Vec<_>>>()?;
        let rows = vec![Row::new(names, values)];
        let range = q.pagination.range(rows.len());
        Ok(rows[range].to_vec())
    }

    fn all_columns(&self, frame: &Frame<'_>) -> Vec<Value> {
        let mut values = Vec::new();
        for (slot, row_idx) in frame.slots.iter().zip(frame.combo) {
            match row_idx {
                Some(r) => values.extend(slot.rows[*r].iter().cloned()),
                None => values.extend(std::iter::repeat_n(Value::Null, slot.schema.len())),
            }
        }
        values
    }

    // ============== Expression evaluation ==============

    fn column_value(&self, frame: &Frame<'_>, col: &ColumnRef) -> QueryResult<Value> {
        for (slot, row_idx) in frame.slots.iter().zip(frame.combo) {
            if slot.alias != col.source.as_str() {
                continue;
            }
            let idx = slot.schema.column_index(col.name.as_str()).ok_or_else(|| {
                QueryError::unknown_column(slot.schema.name().as_str(), col.name.as_str())
            })?;
            return Ok(match row_idx {
                Some(r) => slot.rows[*r][idx].clone(),
                None => Value::Null,
            });
        }
        Err(QueryError::unbound_alias(
            col.source.as_str(),
            col.name.as_str(),
        ))
    }

    fn eval_expr(&self, frame: &Frame<'_>, expr: &Expr) -> QueryResult<Value> {
        match expr {
            Expr::Column(col) => self.column_value(frame, col),
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval_expr(frame, lhs)?;
                let rhs = self.eval_expr(frame, rhs)?;
                apply_binary(*op, lhs, rhs)
            }
            Expr::Alias { expr, .. } => self.eval_expr(frame, expr),
            Expr::Function { name, args } => {
                let args = args
                    .iter()
                    .map(|a| self.eval_expr(frame, a))
                    .collect::<QueryResult<Vec<_>>>()?;
                apply_function(name.as_str(), &args)
            }
            Expr::Subquery(q) => self.scalar_subquery(q),
            Expr::Case(case) => {
                let subject = match &case.subject {
                    Some(subject) => Some(self.eval_expr(frame, subject)?),
                    None => None,
                };
                for arm in &case.arms {
                    let hit = match (&arm.when, &subject) {
                        (CaseCondition::Matches(e), Some(subject)) => {
                            let candidate = self.eval_expr(frame, e)?;
                            subject.eq_value(&candidate) == Some(true)
                        }
                        (CaseCondition::Matches(_), None) => {
                            return Err(QueryError::type_mismatch(
                                "Simple case arm in a searched case chain",
                            ));
                        }
                        (CaseCondition::Holds(p), _) => self.eval_pred(frame, p)? == Some(true),
                    };
                    if hit {
                        return self.eval_expr(frame, &arm.then);
                    }
                }
                self.eval_expr(frame, &case.otherwise)
            }
            Expr::Aggregate { .. } => Err(QueryError::new(
                ErrorCode::InvalidSelect,
                "Aggregate expression outside an aggregate select list",
            )),
        }
    }

    /// Evaluate a select expression over the whole filtered row set.
    fn eval_group(&self, slots: &[Slot<'_>], combos: &[Combo], expr: &Expr) -> QueryResult<Value> {
        match expr {
            Expr::Aggregate { func, arg } => match arg {
                None => Ok(Value::Int(combos.len() as i64)),
                Some(arg) => {
                    let mut values = Vec::with_capacity(combos.len());
                    for combo in combos {
                        let frame = Frame { slots, combo };
                        let v = self.eval_expr(&frame, arg)?;
                        if !v.is_null() {
                            values.push(v);
                        }
                    }
                    aggregate(*func, values)
                }
            },
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Alias { expr, .. } => self.eval_group(slots, combos, expr),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval_group(slots, combos, lhs)?;
                let rhs = self.eval_group(slots, combos, rhs)?;
                apply_binary(*op, lhs, rhs)
            }
            Expr::Function { name, args } => {
                let args = args
                    .iter()
                    .map(|a| self.eval_group(slots, combos, a))
                    .collect::<QueryResult<Vec<_>>>()?;
                apply_function(name.as_str(), &args)
            }
            Expr::Subquery(q) => self.scalar_subquery(q),
            Expr::Column(_) | Expr::Case(_) => Err(QueryError::new(
                ErrorCode::InvalidSelect,
                format!(
                    "Non-aggregate expression '{}' in an aggregate select list",
                    expr
                ),
            )),
        }
    }

    // ============== Subqueries ==============

    /// Evaluate a subquery in a scalar position: exactly one row, one column.
    fn scalar_subquery(&self, q: &QueryDescriptor) -> QueryResult<Value> {
        let rows = self.run_select(q)?;
        let row_count = rows.len();
        let col_count = rows.first().map_or_else(|| q.select.len().max(1), Row::len);
        match rows.into_iter().next().map(Row::into_values) {
            Some(mut values) if row_count == 1 && values.len() == 1 => {
                Ok(values.pop().unwrap_or(Value::Null))
            }
            _ => Err(QueryError::scalar_cardinality(row_count, col_count)),
        }
    }

    /// Evaluate a subquery in an in-predicate position: one column, any rows.
    fn subquery_values(&self, q: &QueryDescriptor) -> QueryResult<Vec<Value>> {
        let rows = self.run_select(q)?;
        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            if row.len() != 1 {
                return Err(QueryError::new(
                    ErrorCode::ScalarSubqueryCardinality,
                    format!(
                        "Subquery in an in-predicate must produce one column, got {}",
                        row.len()
                    ),
                ));
            }
            values.extend(row.into_values());
        }
        Ok(values)
    }

    // ============== Predicate evaluation ==============

    /// Three-valued predicate evaluation: `None` is the unknown outcome.
    fn eval_pred(&self, frame: &Frame<'_>, pred: &Predicate) -> QueryResult<Option<bool>> {
        match pred {
            Predicate::True => Ok(Some(true)),
            Predicate::Compare { op, lhs, rhs } => {
                let lhs = self.eval_expr(frame, lhs)?;
                let rhs = self.eval_expr(frame, rhs)?;
                Ok(compare(*op, &lhs, &rhs))
            }
            Predicate::Between { expr, low, high } => {
                let v = self.eval_expr(frame, expr)?;
                let low = self.eval_expr(frame, low)?;
                let high = self.eval_expr(frame, high)?;
                let above = v.cmp_value(&low).map(|o| o != Ordering::Less);
                let below = v.cmp_value(&high).map(|o| o != Ordering::Greater);
                Ok(and3(above, below))
            }
            Predicate::In { expr, list } => {
                let v = self.eval_expr(frame, expr)?;
                let mut outcome = Some(false);
                for item in list {
                    let candidate = self.eval_expr(frame, item)?;
                    match v.eq_value(&candidate) {
                        Some(true) => return Ok(Some(true)),
                        Some(false) => {}
                        None => outcome = None,
                    }
                }
                Ok(outcome)
            }
            Predicate::InSubquery { expr, query } => {
                let v = self.eval_expr(frame, expr)?;
                let candidates = self.subquery_values(query)?;
                let mut outcome = Some(false);
                for candidate in &candidates {
                    match v.eq_value(candidate) {
                        Some(true) => return Ok(Some(true)),
                        Some(false) => {}
                        None => outcome = None,
                    }
                }
                Ok(outcome)
            }
            Predicate::Like { expr, kind, needle } => {
                let v = self.eval_expr(frame, expr)?;
                if v.is_null() {
                    return Ok(None);
                }
                let s = v.as_str().ok_or_else(|| {
                    QueryError::type_mismatch(format!(
                        "String match applied to a {} value",
                        v.type_name()
                    ))
                })?;
                Ok(Some(match kind {
                    MatchKind::Contains => s.contains(needle.as_str()),
                    MatchKind::StartsWith => s.starts_with(needle.as_str()),
                    MatchKind::EndsWith => s.ends_with(needle.as_str()),
                }))
            }
            Predicate::IsNull(expr) => Ok(Some(self.eval_expr(frame, expr)?.is_null())),
            Predicate::IsNotNull(expr) => Ok(Some(!self.eval_expr(frame, expr)?.is_null())),
            Predicate::And(preds) => {
                let mut outcome = Some(true);
                for p in preds {
                    match self.eval_pred(frame, p)? {
                        Some(false) => return Ok(Some(false)),
                        Some(true) => {}
                        None => outcome = None,
                    }
                }
                Ok(outcome)
            }
            Predicate::Or(preds) => {
                let mut outcome = Some(false);
                for p in preds {
                    match self.eval_pred(frame, p)? {
                        Some(true) => return Ok(Some(true)),
                        Some(false) => {}
                        None => outcome = None,
                    }
                }
                Ok(outcome)
            }
            Predicate::Not(pred) => Ok(self.eval_pred(frame, pred)?.map(|b| !b)),
        }
    }
}

/// Output names for a descriptor's select list: an expression's output name,
/// or a positional `c{i}` fallback. An empty select list yields every column
/// of every source.
fn output_names(q: &QueryDescriptor, slots: &[Slot<'_>]) -> Vec<Identifier> {
    if q.select.is_empty() {
        return slots
            .iter()
            .flat_map(|s| s.schema.column_names().cloned())
            .collect();
    }
    q.select
        .iter()
        .enumerate()
        .map(|(i, e)| e.output_name().unwrap_or_else(|| Identifier::new(format!("c{}", i))))
        .collect()
}

fn value_fits(ty: ColumnType, value: &Value) -> bool {
    match (ty, value) {
        (_, Value::Null) => true,
        (ColumnType::Bool, Value::Bool(_)) => true,
        (ColumnType::Int, Value::Int(_)) => true,
        (ColumnType::Float, Value::Int(_) | Value::Float(_)) => true,
        (ColumnType::Text, Value::String(_)) => true,
        (ColumnType::Json, Value::Json(_)) => true,
        _ => false,
    }
}

fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> Option<bool> {
    match op {
        CompareOp::Eq => lhs.eq_value(rhs),
        CompareOp::Ne => lhs.eq_value(rhs).map(|b| !b),
        CompareOp::Lt => lhs.cmp_value(rhs).map(|o| o == Ordering::Less),
        CompareOp::Lte => lhs.cmp_value(rhs).map(|o| o != Ordering::Greater),
        CompareOp::Gt => lhs.cmp_value(rhs).map(|o| o == Ordering::Greater),
        CompareOp::Gte => lhs.cmp_value(rhs).map(|o| o != Ordering::Less),
    }
}

fn and3(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn apply_binary(op: BinaryOp, lhs: Value, rhs: Value) -> QueryResult<Value> {
    if op == BinaryOp::Concat {
        return Ok(match (lhs.display_text(), rhs.display_text()) {
            (Some(a), Some(b)) => Value::String(a + &b),
            _ => Value::Null,
        });
    }
    if lhs.is_null() || rhs.is_null() {
        return Ok(Value::Null);
    }
    if let (Some(a), Some(b)) = (lhs.as_int(), rhs.as_int()) {
        return match op {
            BinaryOp::Add => Ok(Value::Int(a + b)),
            BinaryOp::Sub => Ok(Value::Int(a - b)),
            BinaryOp::Mul => Ok(Value::Int(a * b)),
            BinaryOp::Div => {
                if b == 0 {
                    Err(QueryError::type_mismatch("Division by zero"))
                } else {
                    Ok(Value::Int(a / b))
                }
            }
            BinaryOp::Concat => Ok(Value::Null),
        };
    }
    let numeric = |v: &Value| {
        v.as_float().ok_or_else(|| {
            QueryError::type_mismatch(format!(
                "Arithmetic '{}' applied to a {} value",
                op.symbol(),
                v.type_name()
            ))
        })
    };
    let a = numeric(&lhs)?;
    let b = numeric(&rhs)?;
    match op {
        BinaryOp::Add => Ok(Value::Float(a + b)),
        BinaryOp::Sub => Ok(Value::Float(a - b)),
        BinaryOp::Mul => Ok(Value::Float(a * b)),
        BinaryOp::Div => {
            if b == 0.0 {
                Err(QueryError::type_mismatch("Division by zero"))
            } else {
                Ok(Value::Float(a / b))
            }
        }
        BinaryOp::Concat => Ok(Value::Null),
    }
}

fn apply_function(name: &str, args: &[Value]) -> QueryResult<Value> {
    let arity = |expected: usize| {
        if args.len() == expected {
            Ok(())
        } else {
            Err(QueryError::type_mismatch(format!(
                "Function '{}' expects {} argument(s), got {}",
                name,
                expected,
                args.len()
            )))
        }
    };
    let string_arg = |v: &Value| -> QueryResult<Option<String>> {
        if v.is_null() {
            return Ok(None);
        }
        match v.as_str() {
            Some(s) => Ok(Some(s.to_string())),
            None => Err(QueryError::type_mismatch(format!(
                "Function '{}' applied to a {} value",
                name,
                v.type_name()
            ))),
        }
    };
    match name {
        "upper" => {
            arity(1)?;
            Ok(string_arg(&args[0])?
                .map(|s| Value::String(s.to_uppercase()))
                .unwrap_or(Value::Null))
        }
        "lower" => {
            arity(1)?;
            Ok(string_arg(&args[0])?
                .map(|s| Value::String(s.to_lowercase()))
                .unwrap_or(Value::Null))
        }
        "length" => {
            arity(1)?;
            Ok(string_arg(&args[0])?
                .map(|s| Value::Int(s.chars().count() as i64))
                .unwrap_or(Value::Null))
        }
        "replace" => {
            arity(3)?;
            let (s, from, to) = (
                string_arg(&args[0])?,
                string_arg(&args[1])?,
                string_arg(&args[2])?,
            );
            Ok(match (s, from, to) {
                (Some(s), Some(from), Some(to)) => Value::String(s.replace(&from, &to)),
                _ => Value::Null,
            })
        }
        "str" => {
            arity(1)?;
            Ok(args[0]
                .display_text()
                .map(Value::String)
                .unwrap_or(Value::Null))
        }
        _ => Err(QueryError::unknown_function(name)),
    }
}

fn aggregate(func: AggregateFn, values: Vec<Value>) -> QueryResult<Value> {
    let numeric = |values: &[Value]| -> QueryResult<Vec<f64>> {
        values
            .iter()
            .map(|v| {
                v.as_float().ok_or_else(|| {
                    QueryError::type_mismatch(format!(
                        "Aggregate '{}' applied to a {} value",
                        func.name(),
                        v.type_name()
                    ))
                })
            })
            .collect()
    };
    match func {
        AggregateFn::Count => Ok(Value::Int(values.len() as i64)),
        AggregateFn::Sum => {
            if values.is_empty() {
                return Ok(Value::Null);
            }
            if values.iter().all(|v| v.as_int().is_some()) {
                let sum: i64 = values.iter().filter_map(Value::as_int).sum();
                return Ok(Value::Int(sum));
            }
            Ok(Value::Float(numeric(&values)?.iter().sum()))
        }
        AggregateFn::Avg => {
            if values.is_empty() {
                return Ok(Value::Null);
            }
            let nums = numeric(&values)?;
            Ok(Value::Float(nums.iter().sum::<f64>() / nums.len() as f64))
        }
        AggregateFn::Min | AggregateFn::Max => {
            let mut best: Option<Value> = None;
            for v in values {
                best = Some(match best {
                    None => v,
                    Some(b) => {
                        let ord = b.cmp_value(&v).ok_or_else(|| {
                            QueryError::type_mismatch(format!(
                                "Aggregate '{}' over incomparable values",
                                func.name()
                            ))
                        })?;
                        let replace = match func {
                            AggregateFn::Min => ord == Ordering::Greater,
                            _ => ord == Ordering::Less,
                        };
                        if replace { v } else { b }
                    }
                });
            }
            Ok(best.unwrap_or(Value::Null))
        }
    }
}

fn compare_sort_values(a: &Value, b: &Value, key: &SortKey) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => match key.effective_nulls() {
            NullsOrder::First => Ordering::Less,
            NullsOrder::Last => Ordering::Greater,
        },
        (false, true) => match key.effective_nulls() {
            NullsOrder::First => Ordering::Greater,
            NullsOrder::Last => Ordering::Less,
        },
        (false, false) => {
            let ord = a.cmp_value(b).unwrap_or(Ordering::Equal);
            match key.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        }
    }
}
