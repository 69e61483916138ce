//! Length-aware pagination envelope.

use serde::{Deserialize, Serialize};

/// One page of results plus the numbers a client needs to render pagers.
///
/// `from` and `to` are 1-based positions of the first and last item on the
/// page, and are `None` when the page is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub current_page: u64,
    pub per_page: u64,
    pub total: u64,
    pub last_page: u64,
    pub from: Option<u64>,
    pub to: Option<u64>,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, current_page: u64, per_page: u64, total: u64) -> Self {
        let per_page = per_page.max(1);
        let current_page = current_page.max(1);
        let last_page = total.div_ceil(per_page).max(1);
        let (from, to) = if data.is_empty() {
            (None, None)
        } else {
            let from = (current_page - 1).saturating_mul(per_page).saturating_add(1);
            (Some(from), Some(from.saturating_add(data.len() as u64 - 1)))
        };

        Self {
            data,
            current_page,
            per_page,
            total,
            last_page,
            from,
            to,
        }
    }

    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_page_positions() {
        let page = Paginated::new(vec!['k'; 10], 2, 10, 25);

        assert_eq!(page.last_page, 3);
        assert_eq!(page.from, Some(11));
        assert_eq!(page.to, Some(20));
        assert!(page.has_more_pages());
    }

    #[test]
    fn last_partial_page() {
        let page = Paginated::new(vec![1, 2, 3, 4, 5], 3, 10, 25);

        assert_eq!(page.from, Some(21));
        assert_eq!(page.to, Some(25));
        assert!(!page.has_more_pages());
    }

    #[test]
    fn positions_saturate_on_huge_pages() {
        let page = Paginated::new(vec![1], u64::MAX, 10, 1);

        assert_eq!(page.from, Some(u64::MAX));
        assert_eq!(page.to, Some(u64::MAX));
        assert_eq!(page.last_page, 1);
    }

    #[test]
    fn empty_result_still_has_one_page() {
        let page: Paginated<u8> = Paginated::new(Vec::new(), 1, 10, 0);

        assert_eq!(page.last_page, 1);
        assert_eq!(page.from, None);
        assert_eq!(page.to, None);
    }
}
