//! Common API utilities and shared types
//!
//! Query strings and response bodies shared by the catalog and film routers.

use serde::{Deserialize, Serialize};

use crate::api::flash::FlashMessage;
use crate::pager::Page;

/// Default page number (1-indexed)
pub fn default_page() -> i64 {
    1
}

/// `?page=` of a paginated listing
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
}

/// `?searcher=&page=` of a search listing
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub searcher: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
}

impl SearchQuery {
    /// Search term as given, `None` when missing or blank
    pub fn term(&self) -> Option<&str> {
        self.searcher.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// A page of items plus the navigation flags a listing view needs
#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub current_page: u64,
    pub items_per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_previous: bool,
    pub has_next: bool,
    pub flash: Option<FlashMessage>,
}

impl<T> PageResponse<T> {
    pub fn new(page: Page<T>, flash: Option<FlashMessage>) -> Self {
        Self {
            total_pages: page.total_pages(),
            has_previous: page.has_previous(),
            has_next: page.has_next(),
            items: page.items,
            current_page: page.current_page,
            items_per_page: page.items_per_page,
            total_items: page.total_items,
            flash,
        }
    }
}

/// Page of children together with their parent record
#[derive(Debug, Serialize)]
pub struct ParentPageResponse<P, T> {
    pub parent: P,
    #[serde(flatten)]
    pub page: PageResponse<T>,
}

/// Page of search results together with the term searched for
#[derive(Debug, Serialize)]
pub struct SearchPageResponse<T> {
    pub searcher: String,
    #[serde(flatten)]
    pub page: PageResponse<T>,
}

/// Unpaged list plus the flash
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub flash: Option<FlashMessage>,
}
