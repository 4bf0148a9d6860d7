//! Page-number pagination for list endpoints.
//!
//! List responses look like:
//!
//! ```json
//! {
//!   "cars": [ ... ],
//!   "pagination": {
//!     "total_cars": 12,
//!     "current_page": 2,
//!     "total_pages": 3,
//!     "next_page": 3,
//!     "prev_page": 1
//!   }
//! }
//! ```

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Default page size when `per_page` is absent.
pub const DEFAULT_PER_PAGE: u32 = 5;

/// Largest accepted page size.
pub const MAX_PER_PAGE: u32 = 100;

/// A normalised page request. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl PageRequest {
    /// Build a request, clamping out-of-range values.
    #[must_use]
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    /// Current page (1-based).
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Items per page.
    #[must_use]
    pub const fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Number of items to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }

    /// Number of items to take.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.per_page as u64
    }

    /// Slice an already-materialised collection.
    #[must_use]
    pub fn slice<T: Clone>(&self, items: &[T]) -> Page<T> {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let window = items
            .iter()
            .skip(start)
            .take(self.per_page as usize)
            .cloned()
            .collect();
        Page::new(window, items.len() as u64, *self)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results together with the total match count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Total number of matching items across all pages
    pub total: u64,
    /// The request that produced this page
    pub request: PageRequest,
}

impl<T> Page<T> {
    /// Create a page.
    #[must_use]
    pub const fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            request,
        }
    }

    /// `ceil(total / per_page)`.
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.request.per_page))
    }

    /// Following page, if any.
    #[must_use]
    pub fn next_page(&self) -> Option<u64> {
        let page = u64::from(self.request.page);
        (page < self.total_pages()).then_some(page + 1)
    }

    /// Preceding page, if any.
    #[must_use]
    pub fn prev_page(&self) -> Option<u64> {
        let page = u64::from(self.request.page);
        (page > 1).then(|| page - 1)
    }

    /// Transform the items, keeping the page metadata.
    #[must_use]
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            request: self.request,
        }
    }

    /// Attach the resource name used for the JSON keys.
    #[must_use]
    pub const fn named(self, resource: &'static str) -> NamedPage<T> {
        NamedPage {
            resource,
            page: self,
        }
    }
}

/// A page serialised under a resource-specific key.
#[derive(Debug, Clone)]
pub struct NamedPage<T> {
    resource: &'static str,
    page: Page<T>,
}

struct PaginationBlock<'a, T> {
    resource: &'static str,
    page: &'a Page<T>,
}

impl<T> Serialize for PaginationBlock<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry(&format!("total_{}", self.resource), &self.page.total)?;
        map.serialize_entry("current_page", &self.page.request.page)?;
        map.serialize_entry("total_pages", &self.page.total_pages())?;
        map.serialize_entry("next_page", &self.page.next_page())?;
        map.serialize_entry("prev_page", &self.page.prev_page())?;
        map.end()
    }
}

impl<T: Serialize> Serialize for NamedPage<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.resource, &self.page.items)?;
        map.serialize_entry(
            "pagination",
            &PaginationBlock {
                resource: self.resource,
                page: &self.page,
            },
        )?;
        map.end()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn defaults_and_clamping() {
        let req = PageRequest::new(None, None);
        assert_eq!((req.page(), req.per_page()), (1, 5));

        let req = PageRequest::new(Some(0), Some(0));
        assert_eq!((req.page(), req.per_page()), (1, 1));

        let req = PageRequest::new(Some(3), Some(1000));
        assert_eq!((req.page(), req.per_page()), (3, MAX_PER_PAGE));
        assert_eq!(req.offset(), 200);
    }

    #[test]
    fn page_links() {
        let page = Page::new(vec![1, 2, 3, 4, 5], 12, PageRequest::new(Some(2), Some(5)));
        assert_eq!(page.total_pages(), 3);
        assert_eq!(page.next_page(), Some(3));
        assert_eq!(page.prev_page(), Some(1));

        let last = Page::new(vec![11, 12], 12, PageRequest::new(Some(3), Some(5)));
        assert_eq!(last.next_page(), None);
    }

    #[test]
    fn out_of_range_page_is_empty() {
        let items: Vec<u32> = (1..=7).collect();
        let page = PageRequest::new(Some(9), Some(5)).slice(&items);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 7);
        assert_eq!(page.next_page(), None);
        assert_eq!(page.prev_page(), Some(8));
    }

    #[test]
    fn serializes_with_resource_keys() {
        let page = Page::new(vec!["a", "b"], 2, PageRequest::default()).named("drivers");
        let json = serde_json::to_value(&page).unwrap();

        assert_eq!(json["drivers"], serde_json::json!(["a", "b"]));
        assert_eq!(json["pagination"]["total_drivers"], 2);
        assert_eq!(json["pagination"]["current_page"], 1);
        assert_eq!(json["pagination"]["total_pages"], 1);
        assert!(json["pagination"]["next_page"].is_null());
        assert!(json["pagination"]["prev_page"].is_null());
    }

    proptest! {
        #[test]
        fn slice_never_exceeds_per_page(len in 0usize..300, page in 0u32..50, per_page in 0u32..150) {
            let items: Vec<usize> = (0..len).collect();
            let req = PageRequest::new(Some(page), Some(per_page));
            let result = req.slice(&items);

            prop_assert!(result.items.len() <= req.per_page() as usize);
            prop_assert_eq!(result.total, len as u64);
            if let Some(next) = result.next_page() {
                prop_assert!(next <= result.total_pages());
            }
        }
    }
}
