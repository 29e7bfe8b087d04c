//! Error types for query building and execution with actionable messages.
//!
//! Every failure is surfaced synchronously at the point of construction or
//! execution. The core performs no I/O, so there are no transient-failure
//! classes and nothing is retried.
//!
//! # Error Codes
//!
//! Error codes follow a pattern: Q{category}{number}
//! - 1xxx: Build errors (invalid descriptor shape, detected at build time)
//! - 2xxx: Projection errors (arity, naming, value conversion)
//! - 3xxx: Resolution errors (unknown table/column at construction time)
//! - 4xxx: Execution errors (cardinality, row shape, evaluation)
//!
//! ```rust
//! use quill_query::{QueryError, ErrorCode};
//!
//! let err = QueryError::projection_arity(2, 1);
//! assert_eq!(err.code, ErrorCode::ProjectionArity);
//! assert_eq!(err.code.code(), "Q2001");
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Build errors (1xxx)
    /// Descriptor has no source table (Q1001).
    MissingSource = 1001,
    /// Update descriptor has no set clauses (Q1002).
    EmptySetList = 1002,
    /// Two sources in one query share an alias (Q1003).
    DuplicateAlias = 1003,
    /// Select list is invalid for the requested projection (Q1004).
    InvalidSelect = 1004,
    /// Expression references an alias that is not a source of the query (Q1005).
    UnboundAlias = 1005,

    // Projection errors (2xxx)
    /// Expression count does not match constructor arity (Q2001).
    ProjectionArity = 2001,
    /// Expression has no output name for a by-name projection (Q2002).
    UnnamedExpression = 2002,
    /// Value could not be converted to the target field type (Q2003).
    TypeConversion = 2003,

    // Resolution errors (3xxx)
    /// Unknown table referenced (Q3001).
    UnknownTable = 3001,
    /// Unknown column referenced (Q3002).
    UnknownColumn = 3002,

    // Execution errors (4xxx)
    /// Scalar subquery produced zero or more than one row/column (Q4001).
    ScalarSubqueryCardinality = 4001,
    /// No row matched where exactly one was expected (Q4002).
    RecordNotFound = 4002,
    /// Multiple rows matched where exactly one was expected (Q4003).
    NotUnique = 4003,
    /// Operands had incompatible types during evaluation (Q4004).
    TypeMismatch = 4004,
    /// Unknown scalar function (Q4005).
    UnknownFunction = 4005,
    /// Inserted row does not match the table shape (Q4006).
    RowShape = 4006,
}

impl ErrorCode {
    /// Get the error code string (e.g., "Q1001").
    pub fn code(&self) -> String {
        format!("Q{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::MissingSource => "Query has no source table",
            Self::EmptySetList => "Update has no set clauses",
            Self::DuplicateAlias => "Duplicate source alias",
            Self::InvalidSelect => "Invalid select list",
            Self::UnboundAlias => "Expression references an unbound alias",
            Self::ProjectionArity => "Projection arity mismatch",
            Self::UnnamedExpression => "Expression has no output name",
            Self::TypeConversion => "Value conversion failed",
            Self::UnknownTable => "Unknown table",
            Self::UnknownColumn => "Unknown column",
            Self::ScalarSubqueryCardinality => "Scalar subquery cardinality violation",
            Self::RecordNotFound => "Record not found",
            Self::NotUnique => "Multiple records found",
            Self::TypeMismatch => "Incompatible operand types",
            Self::UnknownFunction => "Unknown scalar function",
            Self::RowShape => "Row does not match table shape",
        }
    }

    /// Check whether this code was raised at build time rather than execution time.
    pub fn is_build_error(&self) -> bool {
        (*self as u16) < 2000
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
    /// Optional code example.
    pub code: Option<String>,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
        }
    }

    /// Add a code example.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The table involved.
    pub table: Option<String>,
    /// The column or field involved.
    pub field: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur while building or executing queries.
#[derive(Error, Debug)]
#[error("[{code}] {message}")]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Add context about the operation.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Set the table.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.context.table = Some(table.into());
        self
    }

    /// Set the column or field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
        self
    }

    /// Add a code suggestion.
    pub fn with_code_suggestion(
        mut self,
        text: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        self.context
            .suggestions
            .push(Suggestion::new(text).with_code(code));
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    // ============== Constructor Functions ==============

    /// Create a missing-source build error.
    pub fn missing_source() -> Self {
        Self::new(
            ErrorCode::MissingSource,
            "Query descriptor has no source table",
        )
        .with_suggestion("Start the builder with select_from(&source) or from(&source)")
    }

    /// Create an empty-set-list build error.
    pub fn empty_set_list(table: impl Into<String>) -> Self {
        let table = table.into();
        Self::new(
            ErrorCode::EmptySetList,
            format!("Update on '{}' has no set clauses", table),
        )
        .with_table(table)
        .with_code_suggestion(
            "Add at least one set clause before building",
            "UpdateBuilder::table(&source).set(\"column\", value)",
        )
    }

    /// Create a duplicate-alias build error.
    pub fn duplicate_alias(alias: impl Into<String>) -> Self {
        let alias = alias.into();
        Self::new(
            ErrorCode::DuplicateAlias,
            format!("Source alias '{}' is used more than once", alias),
        )
        .with_field(alias)
        .with_suggestion("Give each joined source a distinct alias via Schema::alias")
    }

    /// Create an unbound-alias build error.
    pub fn unbound_alias(alias: impl Into<String>, column: impl Into<String>) -> Self {
        let alias = alias.into();
        Self::new(
            ErrorCode::UnboundAlias,
            format!(
                "Column reference '{}.{}' uses alias '{}', which is not a source of this query",
                alias,
                column.into(),
                alias
            ),
        )
        .with_field(alias)
        .with_suggestion("Join the aliased source, or resolve the column through a source of this query")
    }

    /// Create a projection-arity error.
    pub fn projection_arity(expected: usize, found: usize) -> Self {
        Self::new(
            ErrorCode::ProjectionArity,
            format!(
                "Constructor projection expects {} expressions but {} were supplied",
                expected, found
            ),
        )
        .with_suggestion("Supply exactly one expression per constructor argument, in order")
    }

    /// Create an unnamed-expression projection error.
    pub fn unnamed_expression(position: usize) -> Self {
        Self::new(
            ErrorCode::UnnamedExpression,
            format!(
                "Expression at position {} has no output name for a by-name projection",
                position
            ),
        )
        .with_code_suggestion("Give the expression an explicit alias", "expr.alias(\"name\")")
    }

    /// Create an unknown-table resolution error.
    pub fn unknown_table(table: impl Into<String>) -> Self {
        let table = table.into();
        Self::new(ErrorCode::UnknownTable, format!("Unknown table '{}'", table)).with_table(table)
    }

    /// Create an unknown-column resolution error.
    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        let table = table.into();
        let column = column.into();
        Self::new(
            ErrorCode::UnknownColumn,
            format!("Unknown column '{}' on table '{}'", column, table),
        )
        .with_table(table)
        .with_field(column)
    }

    /// Create a scalar-subquery cardinality error.
    pub fn scalar_cardinality(rows: usize, columns: usize) -> Self {
        Self::new(
            ErrorCode::ScalarSubqueryCardinality,
            format!(
                "Scalar subquery must produce exactly one row and one column, got {} row(s) and {} column(s)",
                rows, columns
            ),
        )
        .with_suggestion("Constrain the subquery, or use in_subquery for multi-row results")
    }

    /// Create a not-found error.
    pub fn not_found(table: impl Into<String>) -> Self {
        let table = table.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("No row in '{}' matched the query", table),
        )
        .with_table(table)
        .with_code_suggestion(
            "Use fetch_first to get None instead of an error",
            "engine.fetch_first(query)",
        )
    }

    /// Create a not-unique error.
    pub fn not_unique(table: impl Into<String>) -> Self {
        let table = table.into();
        Self::new(
            ErrorCode::NotUnique,
            format!("Expected a unique row in '{}' but found multiple", table),
        )
        .with_table(table)
    }

    /// Create a type-mismatch evaluation error.
    pub fn type_mismatch(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::TypeMismatch, detail)
    }

    /// Create an unknown-function error.
    pub fn unknown_function(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::UnknownFunction,
            format!("Unknown scalar function '{}'", name),
        )
        .with_field(name)
        .with_help("Available functions: upper, lower, length, replace, str")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_string() {
        assert_eq!(ErrorCode::MissingSource.code(), "Q1001");
        assert_eq!(ErrorCode::ProjectionArity.code(), "Q2001");
        assert_eq!(ErrorCode::UnknownColumn.code(), "Q3002");
        assert_eq!(ErrorCode::ScalarSubqueryCardinality.code(), "Q4001");
    }

    #[test]
    fn test_build_error_classification() {
        assert!(ErrorCode::MissingSource.is_build_error());
        assert!(!ErrorCode::RecordNotFound.is_build_error());
    }

    #[test]
    fn test_display_includes_code() {
        let err = QueryError::unknown_column("member", "usrname");
        let s = err.to_string();
        assert!(s.contains("Q3002"));
        assert!(s.contains("usrname"));
    }

    #[test]
    fn test_projection_arity_message() {
        let err = QueryError::projection_arity(2, 1);
        assert_eq!(err.code, ErrorCode::ProjectionArity);
        assert!(err.message.contains("expects 2"));
    }

    #[test]
    fn test_suggestions_accumulate() {
        let err = QueryError::missing_source().with_suggestion("extra");
        assert_eq!(err.context.suggestions.len(), 2);
    }
}
