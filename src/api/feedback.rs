use crate::error::ApiResult;
use crate::gateway::{Gateway, RequestOptions};
use crate::models::{FeedbackEntry, NewFeedback};

/// `/feedback` endpoints.
#[derive(Clone)]
pub struct FeedbackApi {
    gateway: Gateway,
}

impl FeedbackApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub async fn submit(&self, feedback: &NewFeedback) -> ApiResult<()> {
        self.gateway
            .request_unit("/feedback", RequestOptions::post().json(feedback)?)
            .await
    }

    pub async fn history(&self) -> ApiResult<Vec<FeedbackEntry>> {
        self.gateway.get_json("/feedback").await
    }
}
