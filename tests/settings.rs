mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use scisummarize::services::SettingsSource;
use scisummarize::state::UserSettings;
use scisummarize::storage::{KeyValueStore, SETTINGS_KEY};

#[derive(Default)]
struct Backend {
    down: AtomicBool,
    saved: Mutex<Vec<Value>>,
}

fn app(backend: Arc<Backend>) -> Router {
    let reader = backend.clone();
    let writer = backend;
    Router::new().route(
        "/api/users/settings",
        get(move || {
            let backend = reader.clone();
            async move {
                if backend.down.load(Ordering::SeqCst) {
                    return StatusCode::SERVICE_UNAVAILABLE.into_response();
                }
                Json(json!({
                    "theme": "dark",
                    "displayPreferences": {"compactView": true},
                    "shortcuts": {"custom": {"search": "ctrl+k"}}
                }))
                .into_response()
            }
        })
        .put(move |Json(body): Json<Value>| {
            let backend = writer.clone();
            async move {
                if backend.down.load(Ordering::SeqCst) {
                    return StatusCode::SERVICE_UNAVAILABLE.into_response();
                }
                backend.saved.lock().unwrap().push(body);
                Response::new(axum::body::Body::empty())
            }
        }),
    )
}

async fn setup() -> (scisummarize::AppContext, Arc<dyn KeyValueStore>, Arc<Backend>) {
    let backend = Arc::new(Backend::default());
    let origin = common::serve(app(backend.clone())).await;
    let (ctx, store) = common::context(&origin);
    (ctx, store, backend)
}

#[tokio::test]
async fn test_server_settings_are_completed_with_defaults_and_cached() {
    let (ctx, store, _) = setup().await;

    let (settings, source) = ctx.user_settings.load().await;
    assert_eq!(source, SettingsSource::Server);
    assert_eq!(settings.theme, "dark");
    assert!(settings.display_preferences.compact_view);
    assert!(settings.display_preferences.show_sidebar);
    assert_eq!(settings.font_size, "medium");
    assert_eq!(settings.shortcuts.custom.get("search").map(String::as_str), Some("ctrl+k"));

    let cached: UserSettings = store.get_json(SETTINGS_KEY).unwrap().unwrap();
    assert_eq!(cached, settings);
    assert_eq!(ctx.user_settings.current(), settings);
}

#[tokio::test]
async fn test_unreachable_server_falls_back_to_cache_then_defaults() {
    let (ctx, store, backend) = setup().await;
    backend.down.store(true, Ordering::SeqCst);

    let (settings, source) = ctx.user_settings.load().await;
    assert_eq!(source, SettingsSource::Defaults);
    assert_eq!(settings, UserSettings::default());

    store
        .set(SETTINGS_KEY, r#"{"theme": "dark", "fontSize": 14}"#)
        .unwrap();
    let (settings, source) = ctx.user_settings.load().await;
    assert_eq!(source, SettingsSource::Cache);
    assert_eq!(settings.theme, "dark");
    // Ill-typed value dropped in favor of the default
    assert_eq!(settings.font_size, "medium");
}

#[tokio::test]
async fn test_save_sends_complete_settings() {
    let (ctx, _, backend) = setup().await;
    ctx.user_settings.load().await;

    let saved = ctx
        .user_settings
        .set_path("summarizationPreferences.length", json!("long"))
        .await;
    assert!(saved.server_error.is_none());
    assert_eq!(saved.settings.summarization_preferences.length, "long");
    assert_eq!(saved.settings.theme, "dark");

    let sent = backend.saved.lock().unwrap().last().cloned().unwrap();
    assert_eq!(sent["summarizationPreferences"]["length"], "long");
    assert_eq!(sent["summarizationPreferences"]["style"], "academic");
    assert_eq!(sent["displayPreferences"]["compactView"], true);
    assert_eq!(sent["shortcuts"]["custom"]["search"], "ctrl+k");
}

#[tokio::test]
async fn test_failed_save_still_applies_and_caches_locally() {
    let (ctx, store, backend) = setup().await;
    backend.down.store(true, Ordering::SeqCst);

    let saved = ctx.user_settings.save(&json!({"theme": "dark"})).await;
    let err = saved.server_error.expect("server refused the save");
    assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    assert_eq!(ctx.user_settings.current().theme, "dark");

    let cached: UserSettings = store.get_json(SETTINGS_KEY).unwrap().unwrap();
    assert_eq!(cached.theme, "dark");

    let reset = ctx.user_settings.reset().await;
    assert_eq!(reset.settings, UserSettings::default());
}
