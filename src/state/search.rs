//! Full-text search state with client-side pagination.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, warn};

use super::lock;
use crate::error::{ApiError, ApiResult};
use crate::models::{SearchFilters, SearchHit, SearchRequest, SearchResults, SortOrder};

#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> ApiResult<SearchResults>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Results for the current query arrived; carries the hit count on this page.
    Results(usize),
    /// The query is empty, so nothing was sent.
    EmptyQuery,
    /// The requested page is outside `1..=total_pages`.
    OutOfRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchSnapshot {
    pub query: String,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total_results: u64,
    pub filters: SearchFilters,
    pub results: Vec<SearchHit>,
    pub loading: bool,
    pub error: Option<String>,
}

struct Inner {
    query: String,
    page: u32,
    page_size: u32,
    total_pages: u32,
    total_results: u64,
    filters: SearchFilters,
    results: Vec<SearchHit>,
    generation: u64,
    in_flight: Option<u64>,
    error: Option<String>,
}

/// Clears the in-flight marker when a search finishes or is dropped.
struct InFlightGuard {
    inner: Arc<Mutex<Inner>>,
    generation: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut inner = lock(&self.inner);
        if inner.in_flight == Some(self.generation) {
            inner.in_flight = None;
        }
    }
}

#[derive(Clone)]
pub struct SearchState {
    backend: Arc<dyn SearchBackend>,
    inner: Arc<Mutex<Inner>>,
}

impl SearchState {
    pub fn new(backend: Arc<dyn SearchBackend>, page_size: u32) -> Self {
        Self {
            backend,
            inner: Arc::new(Mutex::new(Inner {
                query: String::new(),
                page: 1,
                page_size: page_size.max(1),
                total_pages: 0,
                total_results: 0,
                filters: SearchFilters::default(),
                results: Vec::new(),
                generation: 0,
                in_flight: None,
                error: None,
            })),
        }
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        let inner = lock(&self.inner);
        SearchSnapshot {
            query: inner.query.clone(),
            page: inner.page,
            page_size: inner.page_size,
            total_pages: inner.total_pages,
            total_results: inner.total_results,
            filters: inner.filters.clone(),
            results: inner.results.clone(),
            loading: inner.in_flight == Some(inner.generation),
            error: inner.error.clone(),
        }
    }

    /// Search for `query` from the first page.
    pub async fn submit(&self, query: &str) -> ApiResult<SearchOutcome> {
        self.change(|inner| inner.query = query.trim().to_string())
            .await
    }

    pub async fn set_sort(&self, sort: SortOrder) -> ApiResult<SearchOutcome> {
        self.change(|inner| inner.filters.sort = sort).await
    }

    pub async fn set_date_range(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> ApiResult<SearchOutcome> {
        self.change(|inner| {
            inner.filters.date_start = start;
            inner.filters.date_end = end;
        })
        .await
    }

    /// Include or exclude a file type (`pdf`, `doc`, ...).
    pub async fn toggle_type(&self, file_type: &str) -> ApiResult<SearchOutcome> {
        self.change(|inner| toggle(&mut inner.filters.included_types, file_type))
            .await
    }

    pub async fn toggle_tag(&self, tag: &str) -> ApiResult<SearchOutcome> {
        self.change(|inner| toggle(&mut inner.filters.tags, tag)).await
    }

    pub async fn next_page(&self) -> ApiResult<SearchOutcome> {
        self.go_to(|page| page.checked_add(1)).await
    }

    pub async fn prev_page(&self) -> ApiResult<SearchOutcome> {
        self.go_to(|page| page.checked_sub(1)).await
    }

    /// The page only moves once its results have arrived.
    async fn go_to(&self, step: impl FnOnce(u32) -> Option<u32>) -> ApiResult<SearchOutcome> {
        let page = {
            let inner = lock(&self.inner);
            match step(inner.page) {
                Some(page) if page >= 1 && page <= inner.total_pages => page,
                _ => return Ok(SearchOutcome::OutOfRange),
            }
        };
        self.run(page).await
    }

    async fn change(&self, apply: impl FnOnce(&mut Inner)) -> ApiResult<SearchOutcome> {
        {
            let mut inner = lock(&self.inner);
            apply(&mut inner);
            inner.page = 1;
        }
        self.run(1).await
    }

    async fn run(&self, page: u32) -> ApiResult<SearchOutcome> {
        let (request, generation) = {
            let mut inner = lock(&self.inner);
            inner.generation += 1;
            if inner.query.is_empty() {
                inner.results.clear();
                inner.total_pages = 0;
                inner.total_results = 0;
                return Ok(SearchOutcome::EmptyQuery);
            }
            inner.in_flight = Some(inner.generation);
            let request = SearchRequest {
                q: inner.query.clone(),
                page,
                page_size: inner.page_size,
                sort: inner.filters.sort.to_string(),
                date_start: inner.filters.date_start,
                date_end: inner.filters.date_end,
                included_types: inner.filters.included_types.clone(),
                tags: inner.filters.tags.clone(),
            };
            (request, inner.generation)
        };
        let _guard = InFlightGuard {
            inner: self.inner.clone(),
            generation,
        };

        debug!("search: '{}' page {}", request.q, request.page);
        let result = self.backend.search(&request).await;

        let mut inner = lock(&self.inner);
        if inner.generation != generation {
            debug!("search: discarding results for '{}'", request.q);
            return Err(ApiError::Stale {
                requested: generation,
                current: inner.generation,
            });
        }

        match result {
            Ok(results) => {
                let count = results.items.len();
                inner.page = page;
                inner.results = results.items;
                inner.total_results = results.total_results;
                inner.total_pages = results.total_pages;
                inner.error = None;
                Ok(SearchOutcome::Results(count))
            }
            Err(e) => {
                warn!("Search failed: {}", e);
                inner.error = Some(e.user_message());
                Err(e)
            }
        }
    }
}

fn toggle(values: &mut Vec<String>, value: &str) {
    match values.iter().position(|v| v == value) {
        Some(index) => {
            values.remove(index);
        }
        None => values.push(value.to_string()),
    }
}
