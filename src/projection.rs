//! Row-to-target projection mapping.
//!
//! Three mapping modes, a closed set chosen at mapper construction:
//!
//! - **by-name** ([`Mapper::by_name`]): each output expression is matched to
//!   a target field by its output name. The target implements [`NamedTarget`]
//!   and starts from `Default`; fields the select list does not mention keep
//!   their defaults, and names the target does not recognize are skipped.
//! - **by-constructor** ([`Mapper::by_constructor`]): values are passed
//!   positionally to a [`FromValues`] target. The expression count must match
//!   the declared arity exactly, checked when the mapper is constructed —
//!   before any row is seen.
//! - **by-explicit** ([`Mapper::explicit2`] and friends): the expression list
//!   is bound to a fixed-arity constructor function, so an arity mismatch is
//!   unrepresentable.
//!
//! Mapping is pure: one new target instance per row, no side effects.

use crate::error::{ErrorCode, QueryError, QueryResult};
use crate::expr::Expr;
use crate::row::Row;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Conversion from a single scalar value into a typed field.
pub trait FromValue: Sized {
    /// Convert, failing with a `TypeConversion` error on mismatch.
    fn from_value(value: Value) -> QueryResult<Self>;
}

fn conversion(expected: &str, found: &Value) -> QueryError {
    QueryError::new(
        ErrorCode::TypeConversion,
        format!("Expected a {} value, found {}", expected, found.type_name()),
    )
}

impl FromValue for Value {
    fn from_value(value: Value) -> QueryResult<Self> {
        Ok(value)
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> QueryResult<Self> {
        value.as_int().ok_or_else(|| conversion("int", &value))
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> QueryResult<Self> {
        value.as_float().ok_or_else(|| conversion("float", &value))
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> QueryResult<Self> {
        value.as_bool().ok_or_else(|| conversion("bool", &value))
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> QueryResult<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(conversion("string", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> QueryResult<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_value(value).map(Some)
    }
}

/// A target with settable fields by name, for by-name projection.
///
/// Implementations should ignore names they do not recognize; the select
/// list may carry columns meant for other consumers.
pub trait NamedTarget: Default {
    /// Set the field `name` to `value`.
    fn set_field(&mut self, name: &str, value: Value) -> QueryResult<()>;
}

/// A target constructible from an ordered value sequence, for by-constructor
/// projection.
pub trait FromValues: Sized {
    /// The constructor arity. The select list must supply exactly this many
    /// expressions.
    const ARITY: usize;

    /// Construct from positional values. `values.len()` equals `ARITY` when
    /// called through a [`Mapper`].
    fn from_values(values: Vec<Value>) -> QueryResult<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MapMode {
    ByName,
    ByConstructor,
    Explicit,
}

/// A projection mapper: an expression list plus a row-to-target mapping.
///
/// The expression list doubles as the query's select list via
/// [`QueryBuilder::select_with`](crate::query::QueryBuilder::select_with),
/// which keeps the two in agreement by construction.
pub struct Mapper<T> {
    exprs: Vec<Expr>,
    mode: MapMode,
    map_fn: Arc<dyn Fn(Row) -> QueryResult<T> + Send + Sync>,
}

impl<T> Clone for Mapper<T> {
    fn clone(&self) -> Self {
        Self {
            exprs: self.exprs.clone(),
            mode: self.mode,
            map_fn: Arc::clone(&self.map_fn),
        }
    }
}

impl<T> fmt::Debug for Mapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("mode", &self.mode)
            .field("arity", &self.exprs.len())
            .finish()
    }
}

impl<T> Mapper<T> {
    /// The expression list backing this mapper.
    pub fn exprs(&self) -> &[Expr] {
        &self.exprs
    }

    /// Number of expressions.
    pub fn arity(&self) -> usize {
        self.exprs.len()
    }

    /// Map one row into a new target instance.
    pub fn map(&self, row: Row) -> QueryResult<T> {
        (self.map_fn)(row)
    }
}

impl<T: NamedTarget + 'static> Mapper<T> {
    /// Create a by-name mapper. Every expression must carry an output name
    /// (a column name or an explicit alias), checked here.
    pub fn by_name(exprs: impl IntoIterator<Item = Expr>) -> QueryResult<Self> {
        let exprs: Vec<Expr> = exprs.into_iter().collect();
        for (i, expr) in exprs.iter().enumerate() {
            if expr.output_name().is_none() {
                return Err(QueryError::unnamed_expression(i));
            }
        }
        Ok(Self {
            exprs,
            mode: MapMode::ByName,
            map_fn: Arc::new(|row: Row| {
                let mut target = T::default();
                let columns = row.columns().to_vec();
                for (name, value) in columns.into_iter().zip(row.into_values()) {
                    target.set_field(name.as_str(), value)?;
                }
                Ok(target)
            }),
        })
    }
}

impl<T: FromValues + 'static> Mapper<T> {
    /// Create a by-constructor mapper. Fails with `ProjectionArity` if the
    /// expression count does not match `T::ARITY`; nothing is constructed in
    /// that case.
    pub fn by_constructor(exprs: impl IntoIterator<Item = Expr>) -> QueryResult<Self> {
        let exprs: Vec<Expr> = exprs.into_iter().collect();
        if exprs.len() != T::ARITY {
            return Err(QueryError::projection_arity(T::ARITY, exprs.len()));
        }
        Ok(Self {
            exprs,
            mode: MapMode::ByConstructor,
            map_fn: Arc::new(|row: Row| T::from_values(row.into_values())),
        })
    }
}

fn take_values<const N: usize>(row: Row) -> QueryResult<[Value; N]> {
    let values = row.into_values();
    let found = values.len();
    <[Value; N]>::try_from(values).map_err(|_| QueryError::projection_arity(N, found))
}

impl<T: 'static> Mapper<T> {
    /// Explicit projection with a one-argument constructor.
    pub fn explicit1<A>(e1: Expr, ctor: impl Fn(A) -> T + Send + Sync + 'static) -> Self
    where
        A: FromValue,
    {
        Self {
            exprs: vec![e1],
            mode: MapMode::Explicit,
            map_fn: Arc::new(move |row: Row| {
                let [a] = take_values::<1>(row)?;
                Ok(ctor(A::from_value(a)?))
            }),
        }
    }

    /// Explicit projection with a two-argument constructor.
    pub fn explicit2<A, B>(
        e1: Expr,
        e2: Expr,
        ctor: impl Fn(A, B) -> T + Send + Sync + 'static,
    ) -> Self
    where
        A: FromValue,
        B: FromValue,
    {
        Self {
            exprs: vec![e1, e2],
            mode: MapMode::Explicit,
            map_fn: Arc::new(move |row: Row| {
                let [a, b] = take_values::<2>(row)?;
                Ok(ctor(A::from_value(a)?, B::from_value(b)?))
            }),
        }
    }

    /// Explicit projection with a three-argument constructor.
    pub fn explicit3<A, B, C>(
        e1: Expr,
        e2: Expr,
        e3: Expr,
        ctor: impl Fn(A, B, C) -> T + Send + Sync + 'static,
    ) -> Self
    where
        A: FromValue,
        B: FromValue,
        C: FromValue,
    {
        Self {
            exprs: vec![e1, e2, e3],
            mode: MapMode::Explicit,
            map_fn: Arc::new(move |row: Row| {
                let [a, b, c] = take_values::<3>(row)?;
                Ok(ctor(A::from_value(a)?, B::from_value(b)?, C::from_value(c)?))
            }),
        }
    }

    /// Explicit projection with a four-argument constructor.
    pub fn explicit4<A, B, C, D>(
        e1: Expr,
        e2: Expr,
        e3: Expr,
        e4: Expr,
        ctor: impl Fn(A, B, C, D) -> T + Send + Sync + 'static,
    ) -> Self
    where
        A: FromValue,
        B: FromValue,
        C: FromValue,
        D: FromValue,
    {
        Self {
            exprs: vec![e1, e2, e3, e4],
            mode: MapMode::Explicit,
            map_fn: Arc::new(move |row: Row| {
                let [a, b, c, d] = take_values::<4>(row)?;
                Ok(ctor(
                    A::from_value(a)?,
                    B::from_value(b)?,
                    C::from_value(c)?,
                    D::from_value(d)?,
                ))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Expr, val};
    use crate::types::Identifier;

    #[derive(Debug, Default, PartialEq)]
    struct MemberDto {
        username: String,
        age: i64,
    }

    impl NamedTarget for MemberDto {
        fn set_field(&mut self, name: &str, value: Value) -> QueryResult<()> {
            match name {
                "username" => self.username = FromValue::from_value(value)?,
                "age" => self.age = FromValue::from_value(value)?,
                _ => {}
            }
            Ok(())
        }
    }

    #[derive(Debug, PartialEq)]
    struct UserDto {
        name: String,
        age: i64,
    }

    impl FromValues for UserDto {
        const ARITY: usize = 2;

        fn from_values(values: Vec<Value>) -> QueryResult<Self> {
            let mut values = values.into_iter();
            Ok(Self {
                name: FromValue::from_value(values.next().unwrap_or(Value::Null))?,
                age: FromValue::from_value(values.next().unwrap_or(Value::Null))?,
            })
        }
    }

    fn row(pairs: &[(&str, Value)]) -> Row {
        Row::new(
            pairs.iter().map(|(n, _)| Identifier::new(n)).collect(),
            pairs.iter().map(|(_, v)| v.clone()).collect(),
        )
    }

    #[test]
    fn test_by_name_sets_matching_fields() {
        let mapper = Mapper::<MemberDto>::by_name([
            Expr::column("member", "username"),
            Expr::column("member", "age"),
        ])
        .unwrap();

        let dto = mapper
            .map(row(&[
                ("username", Value::from("member1")),
                ("age", Value::Int(10)),
            ]))
            .unwrap();
        assert_eq!(
            dto,
            MemberDto {
                username: "member1".into(),
                age: 10
            }
        );
    }

    #[test]
    fn test_by_name_skips_unknown_and_keeps_defaults() {
        let mapper = Mapper::<MemberDto>::by_name([
            Expr::column("member", "username"),
            Expr::column("member", "id"),
        ])
        .unwrap();

        let dto = mapper
            .map(row(&[
                ("username", Value::from("member1")),
                ("id", Value::Int(7)),
            ]))
            .unwrap();
        // "id" is unknown to the target; "age" keeps its default.
        assert_eq!(dto.age, 0);
    }

    #[test]
    fn test_by_name_requires_output_names() {
        let err = Mapper::<MemberDto>::by_name([val(1)]).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnnamedExpression);
    }

    #[test]
    fn test_by_constructor_arity_checked_at_construction() {
        let err =
            Mapper::<UserDto>::by_constructor([Expr::column("member", "username")]).unwrap_err();
        assert_eq!(err.code, ErrorCode::ProjectionArity);
    }

    #[test]
    fn test_by_constructor_maps_positionally() {
        let mapper = Mapper::<UserDto>::by_constructor([
            Expr::column("member", "username"),
            Expr::column("member", "age"),
        ])
        .unwrap();

        let dto = mapper
            .map(row(&[
                ("username", Value::from("member1")),
                ("age", Value::Int(10)),
            ]))
            .unwrap();
        assert_eq!(dto.name, "member1");
        assert_eq!(dto.age, 10);
    }

    #[test]
    fn test_explicit_projection() {
        let mapper = Mapper::explicit2(
            Expr::column("member", "username"),
            Expr::column("member", "age"),
            |name: String, age: i64| UserDto { name, age },
        );
        assert_eq!(mapper.arity(), 2);

        let dto = mapper
            .map(row(&[
                ("username", Value::from("member2")),
                ("age", Value::Int(20)),
            ]))
            .unwrap();
        assert_eq!(dto.age, 20);
    }

    #[test]
    fn test_optional_field_conversion() {
        let opt: Option<String> = FromValue::from_value(Value::Null).unwrap();
        assert_eq!(opt, None);
        let opt: Option<i64> = FromValue::from_value(Value::Int(3)).unwrap();
        assert_eq!(opt, Some(3));
    }
}
