//! Two phase search pagination.
//!
//! A search first fetches the ids of every match along with the server's page size. Pages are then
//! hydrated on demand by re-running the query restricted to that page's slice of ids.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::{PageOutOfBounds, RequestError, SearchError},
    models::items,
    search::Search,
};

/// The predicate a page query restricts its results with.
const IDS_PREDICATE: &str = "ids";

/// The result of an id search, `<search-results>`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SearchIds {
    /// The number of records the server returns per page.
    pub page_size: usize,

    /// The ids of every matching record, in server order.
    #[serde(deserialize_with = "items")]
    pub ids: Vec<String>,
}

/// Runs the two round trips a paginated search needs, for records of type `R`.
#[async_trait]
pub trait SearchBackend<R>: Send + Sync {
    /// Fetches the ids of every record matching `query`.
    async fn advanced_search_ids(&self, query: &Search) -> Result<SearchIds, RequestError>;

    /// Fetches the full records matching `query`.
    async fn advanced_search(&self, query: &Search) -> Result<Vec<R>, RequestError>;
}

/// Client side state of a paginated search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageCursor {
    ids: Vec<String>,
    page_size: usize,
    page_count: usize,
    current_page: usize,
}

impl PageCursor {
    /// Builds a cursor positioned on the first page.
    pub fn new(search_ids: SearchIds) -> Self {
        let SearchIds { page_size, ids } = search_ids;
        let page_count = if page_size == 0 { 0 } else { ids.len().div_ceil(page_size) };
        Self { ids, page_size, page_count, current_page: 1 }
    }

    /// The ids of every matching record.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// The number of matching records.
    pub fn total_items(&self) -> usize {
        self.ids.len()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// The number of pages, zero when nothing matched.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// The 1-based page [`fetch_current_page`] hydrates.
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Moves to `page`, failing without moving if it does not exist.
    pub fn seek(&mut self, page: usize) -> Result<(), PageOutOfBounds> {
        self.check(page)?;
        self.current_page = page;
        Ok(())
    }

    /// Advances to the next page, returning it, or `None` on the last page.
    pub fn next_page(&mut self) -> Option<usize> {
        if self.current_page >= self.page_count {
            return None;
        }
        self.current_page += 1;
        Some(self.current_page)
    }

    /// The ids on the given 1-based page.
    pub fn page_ids(&self, page: usize) -> Result<&[String], PageOutOfBounds> {
        self.check(page)?;
        let start = (page - 1) * self.page_size;
        let end = (start + self.page_size).min(self.ids.len());
        Ok(&self.ids[start..end])
    }

    /// A copy of `query` restricted to the ids on the given page. `query` itself is left untouched.
    pub fn page_query(&self, query: &Search, page: usize) -> Result<Search, PageOutOfBounds> {
        let ids = self.page_ids(page)?;
        let mut page_query = query.shallow_copy();
        page_query.add_multi(IDS_PREDICATE).items(ids.iter().cloned());
        Ok(page_query)
    }

    fn check(&self, page: usize) -> Result<(), PageOutOfBounds> {
        if page < 1 || page > self.page_count {
            return Err(PageOutOfBounds { page, page_count: self.page_count });
        }
        Ok(())
    }
}

/// One hydrated page of search results.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchPage<R> {
    /// The number of records matching the search across all pages.
    pub total_items: usize,

    /// The 1-based number of this page.
    pub page_number: usize,

    /// The server's page size.
    pub page_size: usize,

    /// The records on this page.
    pub items: Vec<R>,
}

/// Runs the id search for `query`.
pub async fn fetch_ids<R, B>(backend: &B, query: &Search) -> Result<PageCursor, RequestError>
where
    B: SearchBackend<R> + ?Sized,
{
    let cursor = PageCursor::new(backend.advanced_search_ids(query).await?);
    debug!("Search matched {} records over {} pages", cursor.total_items(), cursor.page_count());
    Ok(cursor)
}

/// Hydrates the given page. Out of bounds pages fail before any request is made.
pub async fn fetch_page<R, B>(
    backend: &B,
    cursor: &PageCursor,
    query: &Search,
    page: usize,
) -> Result<SearchPage<R>, SearchError>
where
    B: SearchBackend<R> + ?Sized,
{
    let page_query = cursor.page_query(query, page)?;
    debug!("Fetching page {page} of {}", cursor.page_count());
    let items = backend.advanced_search(&page_query).await?;
    Ok(SearchPage { total_items: cursor.total_items(), page_number: page, page_size: cursor.page_size(), items })
}

/// Hydrates the cursor's current page.
pub async fn fetch_current_page<R, B>(
    backend: &B,
    cursor: &PageCursor,
    query: &Search,
) -> Result<SearchPage<R>, SearchError>
where
    B: SearchBackend<R> + ?Sized,
{
    fetch_page(backend, cursor, query, cursor.current_page()).await
}
