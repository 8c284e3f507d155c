use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::Notify;

use scisummarize::models::{Document, DocumentFilter, ListQuery, Page, SortOrder};
use scisummarize::state::{FeatureStore, LoadOutcome, PageSource};
use scisummarize::{ApiError, ApiResult};

fn doc(id: &str) -> Document {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "title": format!("Paper {}", id),
        "createdAt": "2024-01-01T00:00:00Z",
    }))
    .unwrap()
}

fn server_error() -> ApiError {
    ApiError::Http {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: "boom".to_string(),
        payload: None,
    }
}

/// Pages of two documents whose ids encode the filter. Fetches for the
/// `All` filter wait on `gate` when `hold` is set.
struct GatedSource {
    calls: AtomicUsize,
    queries: Mutex<Vec<ListQuery<DocumentFilter>>>,
    hold: bool,
    gate: Notify,
}

impl GatedSource {
    fn new(hold: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
            hold,
            gate: Notify::new(),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource<Document, DocumentFilter> for GatedSource {
    async fn fetch_page(&self, query: ListQuery<DocumentFilter>) -> ApiResult<Page<Document>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query);
        if self.hold && query.filter == DocumentFilter::All {
            self.gate.notified().await;
        }
        let prefix = match query.filter {
            DocumentFilter::All => "all",
            DocumentFilter::Recent => "recent",
            DocumentFilter::Favorites => "fav",
        };
        let base = (query.page - 1) * 2;
        Ok(Page::new(
            vec![
                doc(&format!("{}-{}", prefix, base + 1)),
                doc(&format!("{}-{}", prefix, base + 2)),
            ],
            query.page < 2,
        ))
    }
}

fn container(source: Arc<GatedSource>) -> FeatureStore<Document, DocumentFilter> {
    FeatureStore::new("documents", source, 2, DocumentFilter::All, SortOrder::DateDesc)
}

fn ids(store: &FeatureStore<Document, DocumentFilter>) -> Vec<String> {
    store.snapshot().items.into_iter().map(|d| d.id).collect()
}

async fn wait_for_calls(source: &GatedSource, n: usize) {
    for _ in 0..200 {
        if source.calls() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("source never reached {} calls", n);
}

#[tokio::test]
async fn test_concurrent_loads_issue_one_request() {
    let source = GatedSource::new(true);
    let store = container(source.clone());

    let first = tokio::spawn({
        let store = store.clone();
        async move { store.load(1).await }
    });
    wait_for_calls(&source, 1).await;
    assert!(store.is_loading());

    assert_eq!(store.load(1).await.unwrap(), LoadOutcome::AlreadyLoading);
    assert_eq!(store.load_more().await.unwrap(), LoadOutcome::AlreadyLoading);

    source.gate.notify_one();
    assert_eq!(first.await.unwrap().unwrap(), LoadOutcome::Loaded(2));
    assert_eq!(source.calls(), 1);
    assert!(!store.is_loading());
}

#[tokio::test]
async fn test_load_more_without_more_pages_makes_no_request() {
    let source = GatedSource::new(false);
    let store = container(source.clone());

    store.load(1).await.unwrap();
    assert_eq!(store.load_more().await.unwrap(), LoadOutcome::Loaded(2));
    assert!(!store.snapshot().has_more);

    assert_eq!(store.load_more().await.unwrap(), LoadOutcome::NoMorePages);
    assert_eq!(source.calls(), 2);
    assert_eq!(ids(&store), vec!["all-1", "all-2", "all-3", "all-4"]);
}

#[tokio::test]
async fn test_filter_change_resets_to_first_page_and_replaces_items() {
    let source = GatedSource::new(false);
    let store = container(source.clone());

    store.load(1).await.unwrap();
    store.load_more().await.unwrap();
    assert_eq!(store.snapshot().page, 2);

    store.set_filter(DocumentFilter::Favorites).await.unwrap();
    let snapshot = store.snapshot();
    assert_eq!(snapshot.page, 1);
    assert_eq!(snapshot.filter, DocumentFilter::Favorites);
    assert_eq!(ids(&store), vec!["fav-1", "fav-2"]);

    store.set_sort(SortOrder::NameAsc).await.unwrap();
    let last = *source.queries.lock().unwrap().last().unwrap();
    assert_eq!(last.page, 1);
    assert_eq!(last.sort, SortOrder::NameAsc);
    assert_eq!(last.filter, DocumentFilter::Favorites);
}

#[tokio::test]
async fn test_superseded_fetch_is_discarded() {
    let source = GatedSource::new(true);
    let store = container(source.clone());

    let stale = tokio::spawn({
        let store = store.clone();
        async move { store.load(1).await }
    });
    wait_for_calls(&source, 1).await;

    // Not blocked by the superseded fetch
    assert_eq!(
        store.set_filter(DocumentFilter::Recent).await.unwrap(),
        LoadOutcome::Loaded(2)
    );

    source.gate.notify_one();
    let err = stale.await.unwrap().unwrap_err();
    assert!(matches!(err, ApiError::Stale { .. }));
    assert_eq!(ids(&store), vec!["recent-1", "recent-2"]);
    assert!(!store.is_loading());
}

#[tokio::test]
async fn test_failed_commit_rolls_back_patch() {
    let source = GatedSource::new(false);
    let store = container(source);
    store.load(1).await.unwrap();

    let err = store
        .mutate_and_commit(
            "all-1",
            |d| d.is_favorite = true,
            |patched| async move {
                assert!(patched.is_favorite);
                Err::<Document, _>(server_error())
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert!(!store.get("all-1").unwrap().is_favorite);
}

#[tokio::test]
async fn test_commit_applies_server_copy() {
    let source = GatedSource::new(false);
    let store = container(source);
    store.load(1).await.unwrap();

    let confirmed = store
        .mutate_and_commit(
            "all-2",
            |d| d.is_favorite = true,
            |mut patched| async move {
                patched.title = "Renamed by server".to_string();
                Ok(patched)
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(confirmed.is_favorite);
    assert_eq!(store.get("all-2").unwrap().title, "Renamed by server");
}

#[tokio::test]
async fn test_failed_remove_restores_original_position() {
    let source = GatedSource::new(false);
    let store = container(source);
    store.load(1).await.unwrap();
    store.load_more().await.unwrap();

    let err = store
        .remove("all-3", |id| async move {
            assert_eq!(id, "all-3");
            Err(server_error())
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Http { .. }));
    assert_eq!(ids(&store), vec!["all-1", "all-2", "all-3", "all-4"]);
    assert_eq!(store.snapshot().error.as_deref(), Some("boom"));

    assert!(store.remove("all-3", |_| async { Ok(()) }).await.unwrap());
    assert_eq!(ids(&store), vec!["all-1", "all-2", "all-4"]);
}

#[tokio::test]
async fn test_failed_remove_after_reload_does_not_duplicate() {
    let source = GatedSource::new(false);
    let store = container(source);
    store.load(1).await.unwrap();

    let release = Arc::new(Notify::new());
    let pending = tokio::spawn({
        let store = store.clone();
        let release = release.clone();
        async move {
            store
                .remove("all-1", |_| async move {
                    release.notified().await;
                    Err(server_error())
                })
                .await
        }
    });
    for _ in 0..200 {
        if store.get("all-1").is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(ids(&store), vec!["all-2"]);

    // The server still has the document, so the reload brings it back
    store.load(1).await.unwrap();
    assert_eq!(ids(&store), vec!["all-1", "all-2"]);

    release.notify_one();
    assert!(pending.await.unwrap().is_err());
    assert_eq!(ids(&store), vec!["all-1", "all-2"]);
}

#[tokio::test]
async fn test_undo_after_reload_keeps_server_copy() {
    let source = GatedSource::new(false);
    let store = container(source);
    store.load(1).await.unwrap();

    let token = store
        .mutate_item_optimistic("all-1", |d| d.title = "Local edit".to_string())
        .unwrap();
    store.load(1).await.unwrap();
    let _ = store.mutate_item_optimistic("all-1", |d| d.is_favorite = true);

    assert!(!store.undo(token));
    let current = store.get("all-1").unwrap();
    assert_eq!(current.title, "Paper all-1");
    assert!(current.is_favorite);
}
