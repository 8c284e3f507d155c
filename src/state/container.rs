//! Feature State Container: one paged, filtered, sorted listing.
//!
//! Loads are guarded so at most one fetch per generation is in flight. Filter
//! and sort changes advance the generation, which lets a new load start at
//! once and turns the result of any superseded fetch into
//! [`ApiError::Stale`].

use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{lock, optimistic};
use crate::error::{ApiError, ApiResult};
use crate::models::{ListQuery, Listable, Page, QueryParam, SortOrder};

/// Where a container gets its pages from.
#[async_trait]
pub trait PageSource<T, F>: Send + Sync {
    async fn fetch_page(&self, query: ListQuery<F>) -> ApiResult<Page<T>>;
}

/// What a load call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The page arrived and was applied; carries the number of items received.
    Loaded(usize),
    /// Another load for the same generation was already running.
    AlreadyLoading,
    /// `load_more` with nothing left to fetch.
    NoMorePages,
}

/// Previous value of an item, returned by an optimistic patch.
#[must_use = "an undo token must be applied if the change is rejected"]
#[derive(Debug, Clone)]
pub struct UndoToken<T> {
    id: String,
    previous: T,
    /// Value of the replacement counter when the patch was applied.
    epoch: u64,
}

impl<T> UndoToken<T> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn previous(&self) -> &T {
        &self.previous
    }
}

/// Read-only copy of a container's state for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSnapshot<T, F> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub has_more: bool,
    pub filter: F,
    pub sort: SortOrder,
    pub loading: bool,
    pub error: Option<String>,
}

struct FeatureState<T, F> {
    items: Vec<T>,
    page: u32,
    page_size: u32,
    has_more: bool,
    filter: F,
    sort: SortOrder,
    generation: u64,
    /// Bumped whenever a first page replaces the items.
    epoch: u64,
    /// Generation of the fetch currently in flight.
    in_flight: Option<u64>,
    error: Option<String>,
}

impl<T, F> FeatureState<T, F> {
    fn loading(&self) -> bool {
        self.in_flight == Some(self.generation)
    }

    fn position(&self, id: &str) -> Option<usize>
    where
        T: Listable,
    {
        self.items.iter().position(|item| item.id() == id)
    }
}

/// Clears the in-flight marker when a load finishes or its future is dropped.
struct LoadingGuard<T, F> {
    state: Arc<Mutex<FeatureState<T, F>>>,
    generation: u64,
}

impl<T, F> Drop for LoadingGuard<T, F> {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        if state.in_flight == Some(self.generation) {
            state.in_flight = None;
        }
    }
}

/// A paged listing for one feature.
pub struct FeatureStore<T, F> {
    name: &'static str,
    source: Arc<dyn PageSource<T, F>>,
    state: Arc<Mutex<FeatureState<T, F>>>,
}

impl<T, F> Clone for FeatureStore<T, F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            source: self.source.clone(),
            state: self.state.clone(),
        }
    }
}

impl<T: Listable, F: QueryParam> FeatureStore<T, F> {
    pub fn new(
        name: &'static str,
        source: Arc<dyn PageSource<T, F>>,
        page_size: u32,
        filter: F,
        sort: SortOrder,
    ) -> Self {
        Self {
            name,
            source,
            state: Arc::new(Mutex::new(FeatureState {
                items: Vec::new(),
                page: 1,
                page_size: page_size.max(1),
                has_more: false,
                filter,
                sort,
                generation: 0,
                epoch: 0,
                in_flight: None,
                error: None,
            })),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn snapshot(&self) -> ContainerSnapshot<T, F> {
        let state = lock(&self.state);
        ContainerSnapshot {
            items: state.items.clone(),
            page: state.page,
            page_size: state.page_size,
            has_more: state.has_more,
            filter: state.filter,
            sort: state.sort,
            loading: state.loading(),
            error: state.error.clone(),
        }
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.state).loading()
    }

    pub fn get(&self, id: &str) -> Option<T> {
        let state = lock(&self.state);
        state.position(id).map(|i| state.items[i].clone())
    }

    /// Fetch `page` with the current filter and sort.
    ///
    /// Page 1 replaces the items; later pages are appended. Failures keep the
    /// items as they were and record the error for display.
    pub async fn load(&self, page: u32) -> ApiResult<LoadOutcome> {
        let page = page.max(1);
        let (query, generation) = {
            let mut state = lock(&self.state);
            if state.loading() {
                debug!("{}: load(page {}) suppressed, already loading", self.name, page);
                return Ok(LoadOutcome::AlreadyLoading);
            }
            state.in_flight = Some(state.generation);
            let query = ListQuery {
                page,
                page_size: state.page_size,
                filter: state.filter,
                sort: state.sort,
            };
            (query, state.generation)
        };
        let _guard = LoadingGuard {
            state: self.state.clone(),
            generation,
        };

        debug!(
            "{}: loading page {} (filter={}, sort={})",
            self.name,
            page,
            query.filter.as_str(),
            query.sort
        );
        let result = self.source.fetch_page(query).await;

        let mut state = lock(&self.state);
        if state.generation != generation {
            debug!(
                "{}: discarding page {} from generation {} (now {})",
                self.name, page, generation, state.generation
            );
            return Err(ApiError::Stale {
                requested: generation,
                current: state.generation,
            });
        }

        match result {
            Ok(fetched) => {
                let count = fetched.items.len();
                if page == 1 {
                    state.items = fetched.items;
                    state.epoch += 1;
                } else {
                    state.items.extend(fetched.items);
                }
                state.page = page;
                state.has_more = fetched.has_more;
                state.error = None;
                Ok(LoadOutcome::Loaded(count))
            }
            Err(e) => {
                warn!("{}: failed to load page {}: {}", self.name, page, e);
                state.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Reload the first page.
    pub async fn refresh(&self) -> ApiResult<LoadOutcome> {
        self.load(1).await
    }

    /// Fetch the page after the current one, if the server said there is one.
    pub async fn load_more(&self) -> ApiResult<LoadOutcome> {
        let next = {
            let state = lock(&self.state);
            if state.loading() {
                return Ok(LoadOutcome::AlreadyLoading);
            }
            if !state.has_more {
                return Ok(LoadOutcome::NoMorePages);
            }
            state.page + 1
        };
        self.load(next).await
    }

    pub async fn set_filter(&self, filter: F) -> ApiResult<LoadOutcome> {
        self.reset_with(|state| state.filter = filter);
        self.load(1).await
    }

    pub async fn set_sort(&self, sort: SortOrder) -> ApiResult<LoadOutcome> {
        self.reset_with(|state| state.sort = sort);
        self.load(1).await
    }

    fn reset_with(&self, change: impl FnOnce(&mut FeatureState<T, F>)) {
        let mut state = lock(&self.state);
        change(&mut state);
        state.page = 1;
        state.generation += 1;
    }

    /// Patch an item in place and return the value it had before.
    ///
    /// Returns `None` when no item has that id.
    pub fn mutate_item_optimistic(
        &self,
        id: &str,
        patch: impl FnOnce(&mut T),
    ) -> Option<UndoToken<T>> {
        let mut state = lock(&self.state);
        let index = state.position(id)?;
        let previous = state.items[index].clone();
        patch(&mut state.items[index]);
        Some(UndoToken {
            id: id.to_string(),
            previous,
            epoch: state.epoch,
        })
    }

    /// Restore an item from its undo token.
    ///
    /// Returns false if the item is gone or the items were reloaded since the
    /// patch; a reloaded item is already the server's copy.
    pub fn undo(&self, token: UndoToken<T>) -> bool {
        let mut state = lock(&self.state);
        if state.epoch != token.epoch {
            debug!("{}: skipping undo of {}, items were reloaded", self.name, token.id);
            return false;
        }
        match state.position(&token.id) {
            Some(index) => {
                state.items[index] = token.previous;
                true
            }
            None => false,
        }
    }

    /// Replace an item with the server's copy of it.
    pub fn replace_item(&self, item: T) -> bool {
        let mut state = lock(&self.state);
        match state.position(item.id()) {
            Some(index) => {
                state.items[index] = item;
                true
            }
            None => false,
        }
    }

    /// Patch an item, send the patched copy with `commit`, and reconcile with
    /// the server's answer. The patch is undone if `commit` fails.
    ///
    /// Returns `Ok(None)` without a request when no item has that id.
    pub async fn mutate_and_commit<P, C, Fut>(
        &self,
        id: &str,
        patch: P,
        commit: C,
    ) -> ApiResult<Option<T>>
    where
        P: FnOnce(&mut T),
        C: FnOnce(T) -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let result = optimistic(
            || {
                let token = self.mutate_item_optimistic(id, patch)?;
                let current = self.get(id)?;
                Some((token, current))
            },
            |(_, current)| commit(current.clone()),
            |(token, _)| {
                self.undo(token);
            },
        )
        .await?;

        if let Some(ref confirmed) = result {
            self.replace_item(confirmed.clone());
        }
        Ok(result)
    }

    /// Remove an item and delete it remotely.
    ///
    /// If the delete fails the item goes back to the index it was removed
    /// from, unless the items were reloaded meanwhile or already hold that id.
    /// Returns `Ok(false)` without a request when no item has that id.
    pub async fn remove<D, Fut>(&self, id: &str, delete: D) -> ApiResult<bool>
    where
        D: FnOnce(String) -> Fut,
        Fut: Future<Output = ApiResult<()>>,
    {
        let removed = optimistic(
            || {
                let mut state = lock(&self.state);
                let index = state.position(id)?;
                let item = state.items.remove(index);
                Some((index, item, state.epoch))
            },
            |(_, item, _)| delete(item.id().to_string()),
            |(index, item, epoch)| {
                let mut state = lock(&self.state);
                if state.epoch != epoch || state.position(item.id()).is_some() {
                    debug!("{}: not restoring {}, items were reloaded", self.name, item.id());
                    return;
                }
                let index = index.min(state.items.len());
                state.items.insert(index, item);
            },
        )
        .await;

        match removed {
            Ok(outcome) => Ok(outcome.is_some()),
            Err(e) => {
                lock(&self.state).error = Some(e.user_message());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, DocumentFilter};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn doc(id: &str) -> Document {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": format!("Paper {}", id),
            "createdAt": Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }))
        .unwrap()
    }

    /// Serves three fixed pages of two documents and counts calls.
    struct Pages {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageSource<Document, DocumentFilter> for Pages {
        async fn fetch_page(&self, query: ListQuery<DocumentFilter>) -> ApiResult<Page<Document>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let base = (query.page - 1) * 2;
            let items = vec![doc(&format!("{}", base + 1)), doc(&format!("{}", base + 2))];
            Ok(Page::new(items, query.page < 3))
        }
    }

    fn store() -> (FeatureStore<Document, DocumentFilter>, Arc<Pages>) {
        let pages = Arc::new(Pages {
            calls: AtomicUsize::new(0),
        });
        let store = FeatureStore::new(
            "documents",
            pages.clone(),
            2,
            DocumentFilter::All,
            SortOrder::DateDesc,
        );
        (store, pages)
    }

    fn ids(store: &FeatureStore<Document, DocumentFilter>) -> Vec<String> {
        store.snapshot().items.into_iter().map(|d| d.id).collect()
    }

    #[tokio::test]
    async fn test_load_more_appends_until_exhausted() {
        let (store, pages) = store();
        assert_eq!(store.load(1).await.unwrap(), LoadOutcome::Loaded(2));
        assert_eq!(store.load_more().await.unwrap(), LoadOutcome::Loaded(2));
        assert_eq!(store.load_more().await.unwrap(), LoadOutcome::Loaded(2));
        assert_eq!(ids(&store), vec!["1", "2", "3", "4", "5", "6"]);
        assert_eq!(store.snapshot().page, 3);

        assert_eq!(store.load_more().await.unwrap(), LoadOutcome::NoMorePages);
        assert_eq!(pages.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_undo_restores_previous_value() {
        let (store, _) = store();
        store.load(1).await.unwrap();

        let token = store
            .mutate_item_optimistic("1", |d| d.is_favorite = true)
            .unwrap();
        assert!(store.get("1").unwrap().is_favorite);
        assert!(!token.previous().is_favorite);

        assert!(store.undo(token));
        assert!(!store.get("1").unwrap().is_favorite);
        assert!(store.mutate_item_optimistic("missing", |_| {}).is_none());
    }

    #[tokio::test]
    async fn test_remove_unknown_id_makes_no_request() {
        let (store, _) = store();
        store.load(1).await.unwrap();

        let called = AtomicUsize::new(0);
        let removed = store
            .remove("nope", |_| {
                called.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await
            .unwrap();
        assert!(!removed);
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }
}
