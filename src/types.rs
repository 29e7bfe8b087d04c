//! Common types used in query building.

use crate::expr::Expr;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use smol_str::SmolStr;
use std::borrow::Borrow;
use std::fmt;

/// An identifier (column name, table name, alias) optimized for small strings.
///
/// Uses `SmolStr` internally which stores strings up to 22 bytes inline,
/// avoiding heap allocation for typical identifier names.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier(SmolStr);

impl Identifier {
    /// Create a new identifier from any string-like type.
    #[inline]
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(SmolStr::new(s.as_ref()))
    }

    /// Create from a static string (zero allocation).
    #[inline]
    pub const fn from_static(s: &'static str) -> Self {
        Self(SmolStr::new_static(s))
    }

    /// Get the identifier as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Get the length of the identifier.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the identifier is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({:?})", self.0.as_str())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Identifier {
    #[inline]
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Identifier {
    #[inline]
    fn from(s: String) -> Self {
        Self(SmolStr::new(&s))
    }
}

impl AsRef<str> for Identifier {
    #[inline]
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for Identifier {
    #[inline]
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl Default for Identifier {
    fn default() -> Self {
        Self(SmolStr::default())
    }
}

/// Sort order for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9, oldest first).
    Asc,
    /// Descending order (Z-A, 9-0, newest first).
    Desc,
}

impl SortOrder {
    /// Get the conventional keyword for this sort order.
    pub fn as_keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_keyword())
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::Asc
    }
}

/// Null handling in sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NullsOrder {
    /// Nulls appear first in the results.
    First,
    /// Nulls appear last in the results.
    Last,
}

impl NullsOrder {
    /// Get the conventional keyword for this null order.
    pub fn as_keyword(&self) -> &'static str {
        match self {
            Self::First => "NULLS FIRST",
            Self::Last => "NULLS LAST",
        }
    }
}

/// A single ordering key: an expression, a direction, and a null placement.
///
/// When `nulls` is unspecified, nulls sort first for ascending keys and last
/// for descending keys.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    /// The expression to order by.
    pub expr: Expr,
    /// The sort order.
    pub order: SortOrder,
    /// Null handling (optional).
    pub nulls: Option<NullsOrder>,
}

impl SortKey {
    /// Create a new sort key.
    pub fn new(expr: Expr, order: SortOrder) -> Self {
        Self {
            expr,
            order,
            nulls: None,
        }
    }

    /// Set null handling.
    pub fn nulls(mut self, nulls: NullsOrder) -> Self {
        self.nulls = Some(nulls);
        self
    }

    /// Sort nulls before all non-null values.
    pub fn nulls_first(self) -> Self {
        self.nulls(NullsOrder::First)
    }

    /// Sort nulls after all non-null values.
    pub fn nulls_last(self) -> Self {
        self.nulls(NullsOrder::Last)
    }

    /// The effective null placement after applying the direction default.
    pub fn effective_nulls(&self) -> NullsOrder {
        self.nulls.unwrap_or(match self.order {
            SortOrder::Asc => NullsOrder::First,
            SortOrder::Desc => NullsOrder::Last,
        })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.expr, self.order)?;
        if let Some(nulls) = self.nulls {
            write!(f, " {}", nulls.as_keyword())?;
        }
        Ok(())
    }
}

/// A select list, optimized for typical use cases (1-4 expressions).
pub type SelectList = SmallVec<[Expr; 4]>;

/// A list of sort keys, optimized for 1-4 ordering columns.
pub type SortKeyList = SmallVec<[SortKey; 4]>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::val;

    #[test]
    fn test_identifier_basics() {
        let id = Identifier::new("username");
        assert_eq!(id.as_str(), "username");
        assert_eq!(Identifier::from_static("age").as_str(), "age");
    }

    #[test]
    fn test_sort_order_keyword() {
        assert_eq!(SortOrder::Asc.as_keyword(), "ASC");
        assert_eq!(SortOrder::Desc.as_keyword(), "DESC");
    }

    #[test]
    fn test_sort_key_default_null_placement() {
        let asc = SortKey::new(val(1), SortOrder::Asc);
        assert_eq!(asc.effective_nulls(), NullsOrder::First);

        let desc = SortKey::new(val(1), SortOrder::Desc);
        assert_eq!(desc.effective_nulls(), NullsOrder::Last);

        let overridden = SortKey::new(val(1), SortOrder::Asc).nulls_last();
        assert_eq!(overridden.effective_nulls(), NullsOrder::Last);
    }
}
