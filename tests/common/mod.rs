//! Shared helpers: an in-process backend and contexts pointed at it.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use scisummarize::config::Settings;
use scisummarize::gateway::Gateway;
use scisummarize::storage::{KeyValueStore, MemoryStore};
use scisummarize::AppContext;

/// Serve `app` on an ephemeral port and return its origin.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    format!("http://{}", addr)
}

pub fn settings_for(origin: &str) -> Settings {
    let mut settings = Settings::with_data_dir(PathBuf::from("/nonexistent/scisum-tests"));
    settings.base_url = origin.to_string();
    settings.request_timeout = 5;
    settings.page_size = 2;
    settings.dismiss_delay_ms = 0;
    settings
}

pub fn context(origin: &str) -> (AppContext, Arc<dyn KeyValueStore>) {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let ctx = AppContext::with_store(settings_for(origin), store.clone()).expect("context");
    (ctx, store)
}

pub fn gateway(origin: &str) -> Gateway {
    Gateway::with_base_url(
        &format!("{}/api", origin),
        "scisum-tests",
        Duration::from_secs(5),
        Arc::new(MemoryStore::new()),
    )
    .expect("gateway")
}

/// A JSON document as the backend would send it.
pub fn document_json(id: &str, title: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": title,
        "createdAt": "2024-03-01T12:00:00Z",
        "isFavorite": false,
        "hasSummary": false,
    })
}
