// Copyright (c) 2025 - Cowboy AI, Inc.
//! Projection queries
//!
//! Range filters, multi-key sort, pagination and case-insensitive free-text
//! search over any [`ProjectionRow`].
//!
//! ```rust,ignore
//! let page = store
//!     .query(
//!         &Query::new()
//!             .range(|m: &MachineInfo| m.bought_amount, Some(10), None)
//!             .search("alice")
//!             .sort_by(|m| m.slot_count, SortDirection::Descending)
//!             .page(0, 20),
//!     )
//!     .await?;
//! ```

use std::cmp::Ordering;

use super::ProjectionRow;

type Predicate<R> = Box<dyn Fn(&R) -> bool + Send + Sync>;
type Comparator<R> = Box<dyn Fn(&R, &R) -> Ordering + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// One page of query results
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub items: Vec<R>,

    /// Rows matching the filters, across all pages
    pub total: usize,

    pub index: usize,
    pub size: usize,
}

impl<R> Page<R> {
    pub fn page_count(&self) -> usize {
        if self.size == 0 {
            0
        } else {
            self.total.div_ceil(self.size)
        }
    }
}

/// Query over rows of one projection
pub struct Query<R> {
    filters: Vec<Predicate<R>>,
    sorts: Vec<Comparator<R>>,
    search: Option<String>,
    page: Option<(usize, usize)>,
}

impl<R> Default for Query<R> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            sorts: Vec::new(),
            search: None,
            page: None,
        }
    }
}

impl<R: ProjectionRow> Query<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep rows whose field lies within `[min, max]`; open ends are `None`
    pub fn range<T, F>(mut self, field: F, min: Option<T>, max: Option<T>) -> Self
    where
        T: PartialOrd + Send + Sync + 'static,
        F: Fn(&R) -> T + Send + Sync + 'static,
    {
        self.filters.push(Box::new(move |row| {
            let value = field(row);
            min.as_ref().map_or(true, |min| value >= *min)
                && max.as_ref().map_or(true, |max| value <= *max)
        }));
        self
    }

    /// Keep rows matching an arbitrary predicate
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Box::new(predicate));
        self
    }

    /// Case-insensitive substring match over the row's text fields
    pub fn search(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.search = (!text.trim().is_empty()).then(|| text.trim().to_lowercase());
        self
    }

    /// Add a sort key; earlier keys take precedence
    pub fn sort_by<T, F>(mut self, key: F, direction: SortDirection) -> Self
    where
        T: Ord,
        F: Fn(&R) -> T + Send + Sync + 'static,
    {
        self.sorts.push(Box::new(move |a, b| {
            let ordering = key(a).cmp(&key(b));
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        }));
        self
    }

    /// Zero-based page index and page size
    pub fn page(mut self, index: usize, size: usize) -> Self {
        self.page = Some((index, size));
        self
    }

    fn matches(&self, row: &R) -> bool {
        let searched = self.search.as_ref().map_or(true, |needle| {
            row.search_text()
                .iter()
                .any(|text| text.to_lowercase().contains(needle.as_str()))
        });
        searched && self.filters.iter().all(|filter| filter(row))
    }

    /// Evaluate against a set of rows
    pub fn run(&self, rows: Vec<R>) -> Page<R> {
        let mut items: Vec<R> = rows.into_iter().filter(|row| self.matches(row)).collect();

        // Id as the last key keeps paging stable across calls.
        items.sort_by(|a, b| {
            self.sorts
                .iter()
                .map(|compare| compare(a, b))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.id().cmp(&b.id()))
        });

        let total = items.len();
        let (index, size) = self.page.unwrap_or((0, total));
        let items = items
            .into_iter()
            .skip(index.saturating_mul(size))
            .take(size)
            .collect();

        Page {
            items,
            total,
            index,
            size,
        }
    }
}
