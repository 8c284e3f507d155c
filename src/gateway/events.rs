//! Global error broadcast.
//!
//! Every gateway failure is published here in addition to being returned to
//! the caller, so cross-cutting listeners (a toast area, a log sink) can react
//! without the failing component knowing about them.

use tokio::sync::broadcast;

use crate::error::ApiError;

const CHANNEL_CAPACITY: usize = 64;

/// Snapshot of a failed request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiErrorEvent {
    pub endpoint: String,
    pub message: String,
    pub status: Option<u16>,
    pub payload: Option<serde_json::Value>,
}

impl ApiErrorEvent {
    pub fn new(endpoint: &str, error: &ApiError) -> Self {
        let payload = match error {
            ApiError::Http { payload, .. } => payload.clone(),
            _ => None,
        };
        Self {
            endpoint: endpoint.to_string(),
            message: error.user_message(),
            status: error.status().map(|s| s.as_u16()),
            payload,
        }
    }
}

/// Fire-and-forget fan-out of [`ApiErrorEvent`]s.
#[derive(Debug, Clone)]
pub struct ErrorBus {
    sender: broadcast::Sender<ApiErrorEvent>,
}

impl Default for ErrorBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ApiErrorEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Having no listeners is fine.
    pub fn publish(&self, event: ApiErrorEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_without_listeners_is_silent() {
        let bus = ErrorBus::new();
        bus.publish(ApiErrorEvent::new("/x", &ApiError::Network("down".into())));
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = ErrorBus::new();
        let mut rx = bus.subscribe();
        let err = ApiError::Http {
            status: reqwest::StatusCode::NOT_FOUND,
            message: "Not Found".into(),
            payload: Some(serde_json::json!({"detail": "Not Found"})),
        };
        bus.publish(ApiErrorEvent::new("/documents/9", &err));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.endpoint, "/documents/9");
        assert_eq!(event.status, Some(404));
        assert_eq!(event.message, "Not Found");
    }
}
