use async_trait::async_trait;

use crate::error::ApiResult;
use crate::gateway::{Gateway, RequestOptions};
use crate::models::{ListQuery, Page, Summary, SummaryFilter, SummaryListResponse};
use crate::state::PageSource;

/// `/summaries` listing used by the dashboard.
#[derive(Clone)]
pub struct SummariesApi {
    gateway: Gateway,
}

impl SummariesApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub async fn list(&self, query: ListQuery<SummaryFilter>) -> ApiResult<Page<Summary>> {
        let response: SummaryListResponse = self
            .gateway
            .request_json("/summaries", RequestOptions::get().query(query.to_pairs()))
            .await?;
        Ok(Page::new(response.summaries, response.has_more))
    }
}

#[async_trait]
impl PageSource<Summary, SummaryFilter> for SummariesApi {
    async fn fetch_page(&self, query: ListQuery<SummaryFilter>) -> ApiResult<Page<Summary>> {
        self.list(query).await
    }
}
