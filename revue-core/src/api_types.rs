//! Pagination and search parameters shared across list endpoints

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Limit/offset pagination plus the optional free-text `search` filter used
/// by the category, genre, and user listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub search: Option<String>,
}

impl ListParams {
    /// Effective limit: defaults to [`DEFAULT_PAGE_LIMIT`], clamped to
    /// `1..=MAX_PAGE_LIMIT`.
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT)
    }

    /// Effective offset, never negative.
    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// Trimmed search term, `None` when absent or blank.
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// One page of results together with the total match count.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(count: i64, results: Vec<T>) -> Self {
        Self { count, results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_absent() {
        let params = ListParams::default();
        assert_eq!(params.limit(), DEFAULT_PAGE_LIMIT);
        assert_eq!(params.offset(), 0);
        assert_eq!(params.search(), None);
    }

    #[test]
    fn limit_is_clamped() {
        let params = ListParams {
            limit: Some(100_000),
            offset: Some(-5),
            search: None,
        };
        assert_eq!(params.limit(), MAX_PAGE_LIMIT);
        assert_eq!(params.offset(), 0);

        let params = ListParams {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(params.limit(), 1);
    }

    #[test]
    fn blank_search_is_ignored() {
        let params = ListParams {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(params.search(), None);
    }
}
