//! Offset-based pagination for query results.
//!
//! ```rust
//! use quill_query::Pagination;
//!
//! // Skip 10, take 20
//! let pagination = Pagination::new().skip(10).take(20);
//! assert_eq!(pagination.skip, Some(10));
//! assert_eq!(pagination.take, Some(20));
//!
//! // First N records
//! let first_10 = Pagination::first(10);
//! assert_eq!(first_10.take, Some(10));
//!
//! // Page-based pagination (1-indexed)
//! let page_3 = Pagination::page(3, 25);
//! assert_eq!(page_3.skip, Some(50));
//! assert_eq!(page_3.take, Some(25));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pagination configuration for queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Number of records to skip.
    pub skip: Option<u64>,
    /// Maximum number of records to take.
    pub take: Option<u64>,
}

impl Pagination {
    /// Create a new pagination with no limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of records to skip.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the maximum number of records to take.
    pub fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    /// Check if pagination is specified.
    pub fn is_empty(&self) -> bool {
        self.skip.is_none() && self.take.is_none()
    }

    /// Get pagination for the first N records.
    pub fn first(n: u64) -> Self {
        Self::new().take(n)
    }

    /// Get pagination for a page (1-indexed).
    pub fn page(page: u64, page_size: u64) -> Self {
        let skip = (page.saturating_sub(1)) * page_size;
        Self::new().skip(skip).take(page_size)
    }

    /// The index range selected out of `len` ordered rows.
    pub fn range(&self, len: usize) -> std::ops::Range<usize> {
        let start = self
            .skip
            .map(|s| (s as usize).min(len))
            .unwrap_or(0);
        let end = self
            .take
            .map(|t| start.saturating_add(t as usize).min(len))
            .unwrap_or(len);
        start..end
    }
}

impl fmt::Display for Pagination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.take, self.skip) {
            (Some(take), Some(skip)) => write!(f, "LIMIT {} OFFSET {}", take, skip),
            (Some(take), None) => write!(f, "LIMIT {}", take),
            (None, Some(skip)) => write!(f, "OFFSET {}", skip),
            (None, None) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_skip_take() {
        let pagination = Pagination::new().skip(10).take(20);
        assert_eq!(pagination.to_string(), "LIMIT 20 OFFSET 10");
    }

    #[test]
    fn test_pagination_page() {
        let pagination = Pagination::page(3, 10);
        assert_eq!(pagination.skip, Some(20));
        assert_eq!(pagination.take, Some(10));
    }

    #[test]
    fn test_range_clamps_to_len() {
        assert_eq!(Pagination::new().skip(2).take(2).range(4), 2..4);
        assert_eq!(Pagination::new().skip(10).take(2).range(4), 4..4);
        assert_eq!(Pagination::new().take(100).range(4), 0..4);
        assert_eq!(Pagination::new().range(4), 0..4);
    }
}
