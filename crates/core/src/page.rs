//! Pagination and free-text search shared by every list endpoint.

use serde::{Deserialize, Serialize};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PER_PAGE: u32 = 10;
/// Upper bound on page size.
pub const MAX_PER_PAGE: u32 = 100;

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageRequest {
    /// Clamp raw query values into a usable request.
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }

    /// Slice an already ordered, fully materialised list.
    pub fn slice<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(self.offset() as usize)
            .take(self.per_page as usize)
            .collect();
        Page::new(items, total, *self)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let has_more = total > request.offset() + items.len() as u64;
        Self {
            items,
            total,
            page: request.page,
            per_page: request.per_page,
            has_more,
        }
    }

    /// Map every item, stopping at the first error.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            has_more: self.has_more,
        })
    }
}

/// Case-insensitive substring search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Search(String);

impl Search {
    /// `None` for missing or blank input.
    pub fn parse(raw: Option<&str>) -> Option<Search> {
        let trimmed = raw?.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Search(trimmed.to_lowercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn matches(&self, haystack: &str) -> bool {
        haystack.to_lowercase().contains(&self.0)
    }

    pub fn matches_opt(&self, haystack: Option<&str>) -> bool {
        haystack.is_some_and(|h| self.matches(h))
    }

    /// `%term%` with `LIKE` metacharacters escaped (backslash escape).
    pub fn like_pattern(&self) -> String {
        let mut out = String::with_capacity(self.0.len() + 2);
        out.push('%');
        for c in self.0.chars() {
            if matches!(c, '%' | '_' | '\\') {
                out.push('\\');
            }
            out.push(c);
        }
        out.push('%');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_values() {
        let p = PageRequest::new(Some(0), Some(10_000));
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, MAX_PER_PAGE);
        assert_eq!(PageRequest::new(None, None), PageRequest::default());
    }

    #[test]
    fn slice_reports_has_more() {
        let req = PageRequest::new(Some(2), Some(3));
        let page = req.slice((1..=7).collect::<Vec<_>>());
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 7);
        assert!(page.has_more);

        let last = PageRequest::new(Some(3), Some(3)).slice((1..=7).collect::<Vec<_>>());
        assert_eq!(last.items, vec![7]);
        assert!(!last.has_more);
    }

    #[test]
    fn search_is_case_insensitive() {
        let s = Search::parse(Some("  CoFFee ")).unwrap();
        assert!(s.matches("Ground coffee 500g"));
        assert!(!s.matches("tea"));
        assert!(Search::parse(Some("   ")).is_none());
        assert!(Search::parse(None).is_none());
    }

    #[test]
    fn like_pattern_escapes_metacharacters() {
        let s = Search::parse(Some("50%_off")).unwrap();
        assert_eq!(s.like_pattern(), "%50\\%\\_off%");
    }
}
