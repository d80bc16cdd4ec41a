//! Search and pagination over assigned policies.

use crate::models::PolicyRecord;
use serde::Serialize;

/// Page shown when the policy list is opened.
pub const INITIAL_PAGE: usize = 1;

/// Rows per page in the policy table.
pub const DEFAULT_PER_PAGE: usize = 4;

/// Anything listed by name in a searchable table.
pub trait DisplayName {
    fn display_name(&self) -> &str;
}

impl DisplayName for PolicyRecord {
    fn display_name(&self) -> &str {
        &self.name
    }
}

impl DisplayName for String {
    fn display_name(&self) -> &str {
        self
    }
}

/// The visible slice of a filtered list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<'a, T> {
    /// Rows on the requested page, in input order.
    pub visible: Vec<&'a T>,
    /// Number of matches before pagination.
    pub total_count: usize,
}

impl<T> Page<'_, T> {
    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }
}

/// Half-open index range `[start, end)` of a 1-based page.
///
/// `page` and `per_page` below 1 are treated as 1.
pub fn page_range(page: usize, per_page: usize) -> (usize, usize) {
    let page = page.max(1);
    let per_page = per_page.max(1);
    let start = (page - 1).saturating_mul(per_page);
    (start, start.saturating_add(per_page))
}

/// Number of pages needed for `total` rows; at least one.
pub fn page_count(total: usize, per_page: usize) -> usize {
    total.div_ceil(per_page.max(1)).max(1)
}

/// Records whose display name contains `search_text`, ignoring case and
/// surrounding whitespace. Empty text keeps everything, in input order.
pub fn filter_by_search<'a, T: DisplayName>(records: &'a [T], search_text: &str) -> Vec<&'a T> {
    let needle = search_text.trim().to_lowercase();
    records
        .iter()
        .filter(|record| {
            needle.is_empty() || record.display_name().to_lowercase().contains(&needle)
        })
        .collect()
}

/// Filter `records` by `search_text` and return one page of the matches.
pub fn filter_and_paginate<'a, T: DisplayName>(
    records: &'a [T],
    search_text: &str,
    page: usize,
    per_page: usize,
) -> Page<'a, T> {
    let matches = filter_by_search(records, search_text);

    let total_count = matches.len();
    let (start, end) = page_range(page, per_page);
    let start = start.min(total_count);
    let end = end.min(total_count);

    Page {
        visible: matches[start..end].to_vec(),
        total_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policies(count: usize) -> Vec<PolicyRecord> {
        (0..count)
            .map(|i| PolicyRecord::new(format!("policy-{}", i)))
            .collect()
    }

    fn names<'a>(page: &Page<'a, PolicyRecord>) -> Vec<&'a str> {
        page.visible.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_pages_of_four() {
        let records = policies(10);

        let first = filter_and_paginate(&records, "", 1, 4);
        assert_eq!(first.visible.len(), 4);
        assert_eq!(first.total_count, 10);

        let last = filter_and_paginate(&records, "", 3, 4);
        assert_eq!(names(&last), vec!["policy-8", "policy-9"]);

        let beyond = filter_and_paginate(&records, "", 4, 4);
        assert!(beyond.is_empty());
        assert_eq!(beyond.total_count, 10);
    }

    #[test]
    fn test_search_is_case_insensitive_and_order_preserving() {
        let records = vec![
            PolicyRecord::new("Gold-5m"),
            PolicyRecord::new("silver-1h"),
            PolicyRecord::new("gold-1h"),
        ];

        let page = filter_and_paginate(&records, "  GOLD ", 1, 10);
        assert_eq!(names(&page), vec!["Gold-5m", "gold-1h"]);
        assert_eq!(page.total_count, 2);
    }

    #[test]
    fn test_single_match_scenario() {
        let records = vec!["x".to_string(), "y".to_string(), "z".to_string()];

        let page = filter_and_paginate(&records, "x", INITIAL_PAGE, DEFAULT_PER_PAGE);
        assert_eq!(page.visible, vec![&records[0]]);
        assert_eq!(page.total_count, 1);
    }

    #[test]
    fn test_results_borrow_from_input() {
        let records = policies(6);

        for search in ["", "policy", "1", "nothing"] {
            let page = filter_and_paginate(&records, search, 1, 100);
            let mut last_index = None;
            for row in &page.visible {
                let index = records
                    .iter()
                    .position(|r| std::ptr::eq(r, *row))
                    .expect("row must come from the input");
                assert!(last_index.map_or(true, |last| index > last));
                last_index = Some(index);
            }
        }
    }

    #[test]
    fn test_invalid_page_arguments_are_clamped() {
        let records = policies(3);

        let zero_page = filter_and_paginate(&records, "", 0, 2);
        assert_eq!(names(&zero_page), vec!["policy-0", "policy-1"]);

        let zero_per_page = filter_and_paginate(&records, "", 2, 0);
        assert_eq!(names(&zero_per_page), vec!["policy-1"]);

        let huge = filter_and_paginate(&records, "", usize::MAX, usize::MAX);
        assert!(huge.is_empty());
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 4), 1);
        assert_eq!(page_count(4, 4), 1);
        assert_eq!(page_count(10, 4), 3);
        assert_eq!(page_count(10, 0), 10);
    }

    #[test]
    fn test_filter_by_search() {
        let clusters = vec![
            "East-Cluster".to_string(),
            "west".to_string(),
            "anything".to_string(),
        ];
        assert_eq!(filter_by_search(&clusters, " EAST ").len(), 1);
        assert_eq!(filter_by_search(&clusters, "").len(), 3);
        assert!(filter_by_search(&clusters, "north").is_empty());
    }
}
