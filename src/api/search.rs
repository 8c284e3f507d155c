use async_trait::async_trait;

use crate::error::ApiResult;
use crate::gateway::{Gateway, RequestOptions};
use crate::models::{SearchRequest, SearchResults};
use crate::state::SearchBackend;

/// `POST /search`.
#[derive(Clone)]
pub struct SearchApi {
    gateway: Gateway,
}

impl SearchApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub async fn search(&self, request: &SearchRequest) -> ApiResult<SearchResults> {
        self.gateway
            .request_json("/search", RequestOptions::post().json(request)?)
            .await
    }
}

#[async_trait]
impl SearchBackend for SearchApi {
    async fn search(&self, request: &SearchRequest) -> ApiResult<SearchResults> {
        SearchApi::search(self, request).await
    }
}
