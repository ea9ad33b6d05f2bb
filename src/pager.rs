//! Offset-based pagination
//!
//! [`create_page`] counts an ordered source, slices one page out of it and
//! returns the slice together with its position in the whole listing.
//!
//! The count and the slice are two separate reads. A write that lands between
//! them can leave `total_items` out of step with the returned items; pages
//! are best-effort, not snapshots.

use async_trait::async_trait;
use serde::Serialize;

/// Errors raised while building a page
#[derive(Debug, thiserror::Error)]
pub enum PagerError {
    /// Page numbers are 1-based
    #[error("Page number must be at least 1, got {0}")]
    InvalidPageNumber(i64),

    #[error("Page size must be at least 1, got {0}")]
    InvalidPageSize(i64),

    /// The underlying source failed to count or fetch
    #[error("Failed to load page: {0}")]
    Source(#[from] anyhow::Error),
}

/// An ordered source that can be counted and sliced without loading it whole.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    /// Total number of items in the source
    async fn count(&self) -> anyhow::Result<u64>;

    /// Up to `limit` items starting at `offset`, in source order
    async fn fetch(&self, offset: u64, limit: u64) -> anyhow::Result<Vec<T>>;
}

#[async_trait]
impl<T> PageSource<T> for [T]
where
    T: Clone + Send + Sync,
{
    async fn count(&self) -> anyhow::Result<u64> {
        Ok(self.len() as u64)
    }

    async fn fetch(&self, offset: u64, limit: u64) -> anyhow::Result<Vec<T>> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(self.len());
        let end = usize::try_from(limit)
            .map(|limit| start.saturating_add(limit))
            .unwrap_or(usize::MAX)
            .min(self.len());
        Ok(self[start..end].to_vec())
    }
}

#[async_trait]
impl<T> PageSource<T> for Vec<T>
where
    T: Clone + Send + Sync,
{
    async fn count(&self) -> anyhow::Result<u64> {
        self.as_slice().count().await
    }

    async fn fetch(&self, offset: u64, limit: u64) -> anyhow::Result<Vec<T>> {
        self.as_slice().fetch(offset, limit).await
    }
}

/// One page of an ordered listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Items of this page, at most `items_per_page` of them
    pub items: Vec<T>,
    /// 1-based number of this page
    pub current_page: u64,
    pub items_per_page: u64,
    /// Items in the whole listing, counted when the page was built
    pub total_items: u64,
}

impl<T> Page<T> {
    /// Number of pages in the listing, zero for an empty listing
    pub fn total_pages(&self) -> u64 {
        self.total_items.div_ceil(self.items_per_page.max(1))
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Convert the items while keeping the paging metadata
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            current_page: self.current_page,
            items_per_page: self.items_per_page,
            total_items: self.total_items,
        }
    }
}

/// Build page `page_number` (1-based) of `page_size` items from `source`.
///
/// Page numbers and sizes below 1 are rejected. A page past the end is not an
/// error: it comes back empty with the requested page number.
pub async fn create_page<T, S>(
    source: &S,
    page_number: i64,
    page_size: i64,
) -> Result<Page<T>, PagerError>
where
    S: PageSource<T> + ?Sized,
{
    if page_number < 1 {
        return Err(PagerError::InvalidPageNumber(page_number));
    }
    if page_size < 1 {
        return Err(PagerError::InvalidPageSize(page_size));
    }

    let current_page = page_number as u64;
    let items_per_page = page_size as u64;

    let total_items = source.count().await?;
    let offset = (current_page - 1).saturating_mul(items_per_page);

    let items = if offset >= total_items {
        Vec::new()
    } else {
        source.fetch(offset, items_per_page).await?
    };

    Ok(Page {
        items,
        current_page,
        items_per_page,
        total_items,
    })
}
