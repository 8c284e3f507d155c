use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::gateway::{Gateway, RequestOptions};
use crate::models::{PasswordChange, ProfileUpdate, UserProfile};

/// Dashboard counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    #[serde(default)]
    pub total_documents: u64,
    #[serde(default)]
    pub total_summaries: u64,
    #[serde(default)]
    pub favorite_topics: Vec<String>,
}

/// `/users/*` account endpoints.
#[derive(Clone)]
pub struct UsersApi {
    gateway: Gateway,
}

impl UsersApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub async fn profile(&self) -> ApiResult<UserProfile> {
        self.gateway.get_json("/users/profile").await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<UserProfile> {
        self.gateway
            .request_json("/users/profile", RequestOptions::put().json(update)?)
            .await
    }

    pub async fn change_password(&self, change: &PasswordChange) -> ApiResult<()> {
        self.gateway
            .request_unit("/users/password", RequestOptions::put().json(change)?)
            .await
    }

    /// Raw settings object; merging with defaults is the caller's job.
    pub async fn settings(&self) -> ApiResult<serde_json::Value> {
        self.gateway.get_json("/users/settings").await
    }

    pub async fn update_settings(&self, settings: &serde_json::Value) -> ApiResult<()> {
        self.gateway
            .request_unit("/users/settings", RequestOptions::put().json(settings)?)
            .await
    }

    pub async fn stats(&self) -> ApiResult<UserStats> {
        self.gateway.get_json("/users/stats").await
    }
}
