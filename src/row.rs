//! Materialized result rows with positional and named access.

use crate::error::{ErrorCode, QueryError, QueryResult};
use crate::types::Identifier;
use crate::value::Value;
use std::fmt;

/// A single result row: ordered output names paired with values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<Identifier>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row. Column and value counts must match.
    pub fn new(columns: Vec<Identifier>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The output names, in select-list order.
    pub fn columns(&self) -> &[Identifier] {
        &self.columns
    }

    /// The values, in select-list order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consume the row, keeping only the values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Value at a position.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value under an output name. The first matching column wins.
    pub fn get_named(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.as_str() == name)
            .map(|i| &self.values[i])
    }

    /// Iterate over (name, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &Value)> {
        self.columns.iter().zip(self.values.iter())
    }

    fn named(&self, name: &str) -> QueryResult<&Value> {
        self.get_named(name).ok_or_else(|| {
            QueryError::new(
                ErrorCode::UnknownColumn,
                format!("Column '{}' is not present in the row", name),
            )
            .with_field(name)
        })
    }

    fn conversion(&self, name: &str, expected: &str, found: &Value) -> QueryError {
        QueryError::new(
            ErrorCode::TypeConversion,
            format!(
                "Column '{}' holds a {} value, expected {}",
                name,
                found.type_name(),
                expected
            ),
        )
        .with_field(name)
    }

    /// Get an integer column value.
    pub fn get_i64(&self, name: &str) -> QueryResult<i64> {
        let v = self.named(name)?;
        v.as_int().ok_or_else(|| self.conversion(name, "int", v))
    }

    /// Get an optional integer column value.
    pub fn get_i64_opt(&self, name: &str) -> QueryResult<Option<i64>> {
        let v = self.named(name)?;
        if v.is_null() {
            return Ok(None);
        }
        v.as_int()
            .map(Some)
            .ok_or_else(|| self.conversion(name, "int", v))
    }

    /// Get a float column value, coercing integers.
    pub fn get_f64(&self, name: &str) -> QueryResult<f64> {
        let v = self.named(name)?;
        v.as_float().ok_or_else(|| self.conversion(name, "float", v))
    }

    /// Get an optional float column value, coercing integers.
    pub fn get_f64_opt(&self, name: &str) -> QueryResult<Option<f64>> {
        let v = self.named(name)?;
        if v.is_null() {
            return Ok(None);
        }
        v.as_float()
            .map(Some)
            .ok_or_else(|| self.conversion(name, "float", v))
    }

    /// Get a boolean column value.
    pub fn get_bool(&self, name: &str) -> QueryResult<bool> {
        let v = self.named(name)?;
        v.as_bool().ok_or_else(|| self.conversion(name, "bool", v))
    }

    /// Get a string column value as a borrowed slice.
    pub fn get_str(&self, name: &str) -> QueryResult<&str> {
        let v = self.named(name)?;
        v.as_str().ok_or_else(|| self.conversion(name, "string", v))
    }

    /// Get an optional string column value as a borrowed slice.
    pub fn get_str_opt(&self, name: &str) -> QueryResult<Option<&str>> {
        let v = self.named(name)?;
        if v.is_null() {
            return Ok(None);
        }
        v.as_str()
            .map(Some)
            .ok_or_else(|| self.conversion(name, "string", v))
    }

    /// Get a string column value as owned.
    pub fn get_string(&self, name: &str) -> QueryResult<String> {
        self.get_str(name).map(str::to_string)
    }

    /// Get an optional string as owned.
    pub fn get_string_opt(&self, name: &str) -> QueryResult<Option<String>> {
        Ok(self.get_str_opt(name)?.map(str::to_string))
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, "]")
    }
}
