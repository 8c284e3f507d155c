mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::Path;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::Notify;

use scisummarize::models::{Notification, NotificationPreferences, NotificationsResponse};
use scisummarize::state::{LoadOutcome, NotificationCenter, NotificationSource};
use scisummarize::ApiResult;

fn note(id: &str, read: bool) -> Notification {
    Notification {
        id: id.to_string(),
        kind: "documentProcessed".to_string(),
        title: None,
        message: Some(format!("Document {} is ready", id)),
        timestamp: Utc::now(),
        read,
        action_url: None,
    }
}

/// Lists three notifications; while `hold` is set each list waits on `gate`.
struct HeldSource {
    lists: AtomicUsize,
    hold: AtomicBool,
    gate: Notify,
}

impl HeldSource {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            lists: AtomicUsize::new(0),
            hold: AtomicBool::new(true),
            gate: Notify::new(),
        })
    }

    fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSource for HeldSource {
    async fn list(&self) -> ApiResult<NotificationsResponse> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if self.hold.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        Ok(NotificationsResponse {
            notifications: vec![note("a", false), note("b", false), note("c", true)],
            preferences: None,
        })
    }

    async fn mark_read(&self, _id: &str, _dismiss: bool) -> ApiResult<()> {
        Ok(())
    }

    async fn clear_all(&self) -> ApiResult<()> {
        Ok(())
    }

    async fn update_preferences(&self, _p: &NotificationPreferences) -> ApiResult<()> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_auto_refresh_skips_ticks_while_a_load_is_running() {
    let source = HeldSource::new();
    let center = NotificationCenter::new(source.clone(), Duration::ZERO);

    let manual = tokio::spawn({
        let center = center.clone();
        async move { center.load().await }
    });
    while source.lists() == 0 {
        tokio::task::yield_now().await;
    }

    let refresh = center.spawn_auto_refresh(Duration::from_secs(60));
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(source.lists(), 1);
    assert!(center.snapshot().loading);

    source.hold.store(false, Ordering::SeqCst);
    source.gate.notify_one();
    assert_eq!(manual.await.unwrap().unwrap(), LoadOutcome::Loaded(3));

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(source.lists() >= 2);

    // Refreshes replace the list rather than appending
    let snapshot = center.snapshot();
    assert_eq!(snapshot.items.len(), 3);
    assert_eq!(snapshot.unread, 2);
    refresh.stop();
}

#[tokio::test(start_paused = true)]
async fn test_dismissed_notification_stays_visible_during_delay() {
    let source = HeldSource::new();
    source.hold.store(false, Ordering::SeqCst);
    let center = NotificationCenter::new(source, Duration::from_millis(300));
    center.load().await.unwrap();

    let dismiss = tokio::spawn({
        let center = center.clone();
        async move { center.dismiss("a").await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(center.snapshot().items.len(), 3);

    assert!(dismiss.await.unwrap().unwrap());
    let snapshot = center.snapshot();
    let ids: Vec<_> = snapshot.items.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c"]);
    assert_eq!(snapshot.unread, 1);
}

#[tokio::test]
async fn test_http_source_marks_and_dismisses() {
    let reads: Arc<Mutex<Vec<(String, Value)>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = reads.clone();
    let app = Router::new()
        .route(
            "/api/notifications",
            get(|| async {
                Json(json!({
                    "notifications": [
                        {"id": "n1", "type": "summaryCompleted", "timestamp": "2024-05-01T10:00:00Z"},
                        {"id": "n2", "type": "systemUpdate", "message": "Maintenance tonight",
                         "timestamp": "2024-05-01T09:00:00Z", "read": true}
                    ],
                    "preferences": {"emailNotifications": true}
                }))
            }),
        )
        .route(
            "/api/notifications/:id/read",
            post(move |Path(id): Path<String>, Json(body): Json<Value>| {
                let recorded = recorded.clone();
                async move {
                    recorded.lock().unwrap().push((id, body));
                }
            }),
        );
    let origin = common::serve(app).await;
    let (ctx, _) = common::context(&origin);
    let center = &ctx.notifications;

    assert_eq!(center.load().await.unwrap(), LoadOutcome::Loaded(2));
    let snapshot = center.snapshot();
    assert_eq!(snapshot.badge, Some(1));
    assert!(snapshot.preferences.email_notifications);

    assert!(center.mark_read("n1").await.unwrap());
    assert!(!center.mark_read("n1").await.unwrap());
    assert!(center.dismiss("n2").await.unwrap());
    assert!(center.clear_all(&true).await.unwrap());

    let reads = reads.lock().unwrap();
    let sent: Vec<(&str, bool)> = reads
        .iter()
        .map(|(id, body)| (id.as_str(), body["dismiss"].as_bool().unwrap()))
        .collect();
    assert_eq!(sent, vec![("n1", false), ("n2", true), ("all", true)]);
}
