//! Page arithmetic and photo filtering shared by the store and the API.

use serde::Serialize;

use crate::types::Photo;

/// A 1-indexed page request. Callers validate `page >= 1` and `limit >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    #[must_use]
    pub fn new(page: i64, limit: i64) -> Self {
        Self { page, limit }
    }

    /// Rows to skip before this page. Pages past the end are not clamped.
    #[must_use]
    pub fn offset(&self) -> i64 {
        (self.page - 1).max(0).saturating_mul(self.limit)
    }

    /// `ceil(total / limit)`
    #[must_use]
    pub fn page_count(&self, total: i64) -> i64 {
        if self.limit <= 0 || total <= 0 {
            return 0;
        }
        (total + self.limit - 1) / self.limit
    }

    /// Takes this page out of an already ordered, already filtered list.
    #[must_use]
    pub fn slice<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len() as i64;
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        let items = items.into_iter().skip(offset).take(limit).collect();
        Page::new(items, total, *self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub pages: i64,
    pub limit: i64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            pages: request.page_count(total),
            limit: request.limit,
        }
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            pages: self.pages,
            limit: self.limit,
        }
    }
}

/// Photo list filter. Both parts are case-insensitive substring tests against
/// the decoded tag list, so a needle never matches across two tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoFilter {
    /// Matches the title or any single tag.
    pub search: Option<String>,
    /// Every entry must match some tag.
    pub tags: Vec<String>,
}

impl PhotoFilter {
    /// Builds a filter from raw query values. `tags` is comma separated;
    /// blank entries and a blank search are ignored.
    #[must_use]
    pub fn new(search: Option<&str>, tags: Option<&str>) -> Self {
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        let tags = tags
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_lowercase)
                    .collect()
            })
            .unwrap_or_default();
        Self { search, tags }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.tags.is_empty()
    }

    #[must_use]
    pub fn matches(&self, photo: &Photo) -> bool {
        let tags: Vec<String> = photo.tags.iter().map(|t| t.to_lowercase()).collect();
        let any_tag_contains = |needle: &str| tags.iter().any(|t| t.contains(needle));

        if let Some(search) = &self.search {
            if !photo.title.to_lowercase().contains(search.as_str()) && !any_tag_contains(search) {
                return false;
            }
        }

        self.tags.iter().all(|needle| any_tag_contains(needle))
    }
}
