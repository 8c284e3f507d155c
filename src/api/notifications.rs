use serde::Serialize;

use super::segment;
use crate::error::ApiResult;
use crate::gateway::{Gateway, RequestOptions};
use crate::models::{NotificationPreferences, NotificationsResponse};

/// Id accepted by the read endpoint to address every notification at once.
pub const ALL_NOTIFICATIONS: &str = "all";

#[derive(Serialize)]
struct ReadBody {
    dismiss: bool,
}

/// `/notifications` endpoints.
#[derive(Clone)]
pub struct NotificationsApi {
    gateway: Gateway,
}

impl NotificationsApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub async fn list(&self) -> ApiResult<NotificationsResponse> {
        self.gateway.get_json("/notifications").await
    }

    /// Mark one notification read, optionally dismissing it.
    pub async fn mark_read(&self, id: &str, dismiss: bool) -> ApiResult<()> {
        self.gateway
            .request_unit(
                &format!("/notifications/{}/read", segment(id)),
                RequestOptions::post().json(&ReadBody { dismiss })?,
            )
            .await
    }

    /// Dismiss everything in one call.
    pub async fn clear_all(&self) -> ApiResult<()> {
        self.mark_read(ALL_NOTIFICATIONS, true).await
    }

    pub async fn update_preferences(&self, preferences: &NotificationPreferences) -> ApiResult<()> {
        self.gateway
            .request_unit(
                "/notifications/preferences",
                RequestOptions::put().json(preferences)?,
            )
            .await
    }
}
