//! Page-number pagination shared by every feed.

use serde::Serialize;

/// Number of posts on one feed page.
pub const PAGE_SIZE: u64 = 10;

/// Resolves requested page numbers against a known item count.
///
/// There is always at least one page, even when the listing is empty.
/// Requests below the first page select the first page, requests past the
/// last page select the last one, and anything that is not an integer
/// selects the first page.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: u64,
    per_page: u64,
}

impl Paginator {
    pub fn new(count: u64, per_page: u64) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    pub fn num_pages(&self) -> u64 {
        self.count.div_ceil(self.per_page).max(1)
    }

    /// Clamp a raw `?page=` value to a valid 1-based page number.
    pub fn resolve(&self, requested: Option<&str>) -> u64 {
        let Some(raw) = requested.map(str::trim) else {
            return 1;
        };

        match raw.parse::<i64>() {
            Ok(number) if number < 1 => 1,
            Ok(number) => (number as u64).min(self.num_pages()),
            // Too large for i64 but still a page number.
            Err(_) if is_unsigned_integer(raw) => self.num_pages(),
            Err(_) => 1,
        }
    }

    /// Row offset of the first item on `number`.
    pub fn offset(&self, number: u64) -> u64 {
        (number.saturating_sub(1)) * self.per_page
    }

    pub fn page<T>(&self, number: u64, items: Vec<T>) -> Page<T> {
        let num_pages = self.num_pages();
        Page {
            number,
            num_pages,
            count: self.count,
            per_page: self.per_page,
            has_previous: number > 1,
            has_next: number < num_pages,
            items,
        }
    }
}

fn is_unsigned_integer(raw: &str) -> bool {
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// One page of a listing plus the numbers a pager widget needs.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub per_page: u64,
    pub has_previous: bool,
    pub has_next: bool,
    pub items: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_listing_has_one_page() {
        let paginator = Paginator::new(0, PAGE_SIZE);
        assert_eq!(paginator.num_pages(), 1);
        assert_eq!(paginator.resolve(Some("3")), 1);
    }

    #[test]
    fn test_num_pages_rounds_up() {
        assert_eq!(Paginator::new(10, 10).num_pages(), 1);
        assert_eq!(Paginator::new(11, 10).num_pages(), 2);
        assert_eq!(Paginator::new(25, 10).num_pages(), 3);
    }

    #[test]
    fn test_resolve_clamps_out_of_range() {
        let paginator = Paginator::new(25, 10);
        assert_eq!(paginator.resolve(Some("0")), 1);
        assert_eq!(paginator.resolve(Some("-4")), 1);
        assert_eq!(paginator.resolve(Some("2")), 2);
        assert_eq!(paginator.resolve(Some("99")), 3);
        assert_eq!(paginator.resolve(Some("99999999999999999999")), 3);
        assert_eq!(paginator.resolve(Some("+99999999999999999999")), 3);
    }

    #[test]
    fn test_resolve_non_numeric_selects_first_page() {
        let paginator = Paginator::new(25, 10);
        assert_eq!(paginator.resolve(None), 1);
        assert_eq!(paginator.resolve(Some("last")), 1);
        assert_eq!(paginator.resolve(Some("2.5")), 1);
        assert_eq!(paginator.resolve(Some("-99999999999999999999")), 1);
        assert_eq!(paginator.resolve(Some("+")), 1);
        assert_eq!(paginator.resolve(Some(" 2 ")), 2);
    }

    #[test]
    fn test_page_flags() {
        let paginator = Paginator::new(25, 10);
        assert_eq!(paginator.offset(3), 20);

        let page = paginator.page(2, vec![(); 10]);
        assert!(page.has_previous);
        assert!(page.has_next);

        let last = paginator.page(3, vec![(); 5]);
        assert!(!last.has_next);
        assert_eq!(last.count, 25);
    }
}
