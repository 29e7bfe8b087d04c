//! # quill-query
//!
//! A typed, composable query builder with an in-memory execution engine.
//!
//! Quill turns hand-assembled query conditions into immutable expression
//! trees and explicit predicates: columns resolve against a schema catalog
//! at construction time, dynamic filters compose through an absent-aware
//! combinator, and result rows map into plain structs through one of three
//! projection modes.
//!
//! ## Expressions and Predicates
//!
//! Column references come from a [`Source`] handle, so typos fail at
//! construction rather than execution:
//!
//! ```rust
//! use quill_query::{Schema, TableSchema, ColumnType};
//!
//! let mut schema = Schema::new();
//! schema.register(
//!     TableSchema::new("member")
//!         .column("username", ColumnType::Text)
//!         .column("age", ColumnType::Int),
//! );
//! let member = schema.table("member").unwrap();
//!
//! let p = member.col("age").unwrap().between(20, 30);
//! assert_eq!(p.to_string(), "member.age between 20 and 30");
//!
//! assert!(member.col("usrname").is_err());
//! ```
//!
//! ## Dynamic Filters
//!
//! Optional conditions are `Option<Predicate>`; [`Predicate::all`] conjoins
//! whatever is present and filters nothing when everything is absent:
//!
//! ```rust
//! use quill_query::{Predicate, Schema, TableSchema, ColumnType};
//!
//! let mut schema = Schema::new();
//! schema.register(
//!     TableSchema::new("member")
//!         .column("username", ColumnType::Text)
//!         .column("age", ColumnType::Int),
//! );
//! let member = schema.table("member").unwrap();
//!
//! let username: Option<&str> = Some("member1");
//! let age: Option<i64> = None;
//!
//! let filter = Predicate::all([
//!     username.map(|u| member.col("username").unwrap().eq(u)),
//!     age.map(|a| member.col("age").unwrap().eq(a)),
//! ]);
//! assert_eq!(filter.to_string(), "member.username = 'member1'");
//! ```
//!
//! ## Building and Running Queries
//!
//! Builders are single-use: every method consumes `self`, and `build()`
//! validates the descriptor shape before anything executes:
//!
//! ```rust
//! use quill_query::{Engine, Pagination, QueryBuilder, Schema, TableSchema, ColumnType};
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
//! engine.insert("member", vec!["member3".into(), 30.into()]).unwrap();
//!
//! let member = schema.table("member").unwrap();
//! let query = QueryBuilder::select_from(&member)
//!     .filter(member.col("age").unwrap().gte(20))
//!     .order_by([member.col("age").unwrap().desc()])
//!     .paginate(Pagination::first(1))
//!     .build()
//!     .unwrap();
//!
//! let row = engine.fetch_one(&query).unwrap();
//! assert_eq!(row.get_str("username").unwrap(), "member3");
//! ```
//!
//! ## Projections
//!
//! Rows map into structs by name, by constructor, or through an explicit
//! closure; see [`Mapper`] for the three modes:
//!
//! ```rust
//! use quill_query::{Mapper, Schema, TableSchema, ColumnType};
//!
//! let mut schema = Schema::new();
//! schema.register(
//!     TableSchema::new("member")
//!         .column("username", ColumnType::Text)
//!         .column("age", ColumnType::Int),
//! );
//! let member = schema.table("member").unwrap();
//!
//! struct MemberDto {
//!     username: String,
//!     age: i64,
//! }
//!
//! let mapper = Mapper::explicit2(
//!     member.col("username").unwrap(),
//!     member.col("age").unwrap(),
//!     |username: String, age: i64| MemberDto { username, age },
//! );
//! assert_eq!(mapper.arity(), 2);
//! ```
//!
//! ## Error Handling
//!
//! Every failure carries a stable code and actionable context:
//!
//! ```rust
//! use quill_query::{QueryError, ErrorCode};
//!
//! let err = QueryError::projection_arity(2, 1);
//! assert_eq!(err.code, ErrorCode::ProjectionArity);
//! assert_eq!(err.code.code(), "Q2001");
//! assert!(!err.code.is_build_error());
//! ```

pub mod error;
pub mod exec;
pub mod expr;
pub mod logging;
pub mod pagination;
pub mod predicate;
pub mod projection;
pub mod query;
pub mod row;
pub mod schema;
pub mod types;
pub mod value;

pub use error::{ErrorCode, ErrorContext, QueryError, QueryResult, Suggestion};
pub use exec::Engine;
pub use expr::{AggregateFn, BinaryOp, Case, CaseCondition, CaseExpr, Expr, val};
pub use pagination::Pagination;
pub use predicate::{CompareOp, MatchKind, Predicate};
pub use projection::{FromValue, FromValues, Mapper, NamedTarget};
pub use query::{
    DeleteBuilder, Join, JoinKind, Mutation, QueryBuilder, QueryDescriptor, UpdateBuilder,
};
pub use row::Row;
pub use schema::{ColumnType, Schema, Source, TableSchema};
pub use types::{Identifier, NullsOrder, SelectList, SortKey, SortKeyList, SortOrder};
pub use value::Value;

pub use logging::{
    get_log_format, get_log_level, init as init_logging, init_debug, init_with_level,
    is_debug_enabled,
};

// Re-export smallvec so callers can build `SelectList`/`SortKeyList` values directly.
pub use smallvec;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{ErrorCode, QueryError, QueryResult};
    pub use crate::exec::Engine;
    pub use crate::expr::{Case, Expr, val};
    pub use crate::pagination::Pagination;
    pub use crate::predicate::Predicate;
    pub use crate::projection::{FromValue, FromValues, Mapper, NamedTarget};
    pub use crate::query::{DeleteBuilder, Mutation, QueryBuilder, UpdateBuilder};
    pub use crate::row::Row;
    pub use crate::schema::{ColumnType, Schema, Source, TableSchema};
    pub use crate::types::{Identifier, NullsOrder, SortKey, SortOrder};
    pub use crate::value::Value;
}
