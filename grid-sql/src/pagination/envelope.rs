//! Page envelope returned to list callers.

use serde::{Deserialize, Serialize};

/// One page of results with its position flags.
///
/// # Example
///
/// ```
/// use grid_sql::PageEnvelope;
///
/// let page = PageEnvelope::new(vec!["a", "b"], 5, 2, 2);
/// assert_eq!(page.page_count, 3);
/// assert!(page.has_previous_page);
/// assert!(page.has_next_page);
/// assert!(!page.is_last_page);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope<T> {
    /// Rows of this page.
    pub subset: Vec<T>,
    /// Number of rows in `subset`.
    pub count: usize,
    /// Matching rows across all pages.
    pub total_item_count: u64,
    /// `ceil(total_item_count / take)`, or 0 when `take` is 0.
    pub page_count: u64,
    pub skip: u32,
    pub take: u32,
    pub has_previous_page: bool,
    pub has_next_page: bool,
    pub is_first_page: bool,
    pub is_last_page: bool,
}

impl<T> PageEnvelope<T> {
    /// Assemble a page from its rows, the total count and the window used.
    #[must_use]
    pub fn new(subset: Vec<T>, total_item_count: u64, skip: u32, take: u32) -> Self {
        let end = u64::from(skip) + u64::from(take);
        let page_count = if take == 0 {
            0
        } else {
            total_item_count.div_ceil(u64::from(take))
        };
        let has_next_page = end < total_item_count;

        Self {
            count: subset.len(),
            subset,
            total_item_count,
            page_count,
            skip,
            take,
            has_previous_page: skip > 0,
            has_next_page,
            is_first_page: skip == 0,
            is_last_page: !has_next_page,
        }
    }

    /// A single page holding every matching row.
    #[must_use]
    pub fn unpaged(subset: Vec<T>) -> Self {
        let total = subset.len() as u64;
        let take = u32::try_from(subset.len()).unwrap_or(u32::MAX);
        Self::new(subset, total, 0, take)
    }

    /// An empty page for the given window.
    #[must_use]
    pub fn empty(skip: u32, take: u32) -> Self {
        Self::new(Vec::new(), 0, skip, take)
    }

    /// Convert the rows, keeping the paging metadata.
    pub fn map<U, F>(self, f: F) -> PageEnvelope<U>
    where
        F: FnMut(T) -> U,
    {
        PageEnvelope {
            subset: self.subset.into_iter().map(f).collect(),
            count: self.count,
            total_item_count: self.total_item_count,
            page_count: self.page_count,
            skip: self.skip,
            take: self.take,
            has_previous_page: self.has_previous_page,
            has_next_page: self.has_next_page,
            is_first_page: self.is_first_page,
            is_last_page: self.is_last_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page() {
        let page = PageEnvelope::new(vec![1, 2], 5, 0, 2);
        assert!(page.is_first_page);
        assert!(!page.has_previous_page);
        assert!(page.has_next_page);
        assert!(!page.is_last_page);
        assert_eq!(page.page_count, 3);
        assert_eq!(page.count, 2);
    }

    #[test]
    fn test_last_page_boundary() {
        let page = PageEnvelope::new(vec![5], 5, 4, 2);
        assert!(page.is_last_page);
        assert!(!page.has_next_page);
        assert!(page.has_previous_page);

        // skip + take == total is also the last page
        let page = PageEnvelope::new(vec![3, 4], 4, 2, 2);
        assert!(page.is_last_page);
        assert!(!page.has_next_page);
    }

    #[test]
    fn test_empty_total() {
        let page = PageEnvelope::<i32>::empty(0, 20);
        assert_eq!(page.page_count, 0);
        assert!(page.subset.is_empty());
        assert!(page.is_first_page);
        assert!(page.is_last_page);
        assert!(!page.has_next_page);
    }

    #[test]
    fn test_unpaged() {
        let page = PageEnvelope::unpaged(vec!["a", "b", "c"]);
        assert_eq!(page.take, 3);
        assert_eq!(page.total_item_count, 3);
        assert_eq!(page.page_count, 1);
        assert!(page.is_first_page && page.is_last_page);

        let page = PageEnvelope::<u8>::unpaged(vec![]);
        assert_eq!(page.page_count, 0);
    }

    #[test]
    fn test_camel_case_json() {
        let json = serde_json::to_value(PageEnvelope::new(vec![1], 1, 0, 10)).unwrap();
        assert_eq!(json["totalItemCount"], 1);
        assert_eq!(json["pageCount"], 1);
        assert_eq!(json["hasNextPage"], false);
        assert_eq!(json["isFirstPage"], true);
        assert!(json.get("subset").is_some());
    }

    #[test]
    fn test_map() {
        let page = PageEnvelope::new(vec![1, 2], 10, 0, 2).map(|n| n * 10);
        assert_eq!(page.subset, vec![10, 20]);
        assert_eq!(page.total_item_count, 10);
    }
}
