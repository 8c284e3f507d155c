//! Dashboard: the documents and summaries listings and their item actions.

use std::sync::Arc;

use tracing::{debug, info};

use crate::api::{DocumentsApi, SummariesApi, UserStats, UsersApi};
use crate::error::{ApiResult, ValidationError};
use crate::models::{
    Document, DocumentFilter, DocumentUpdate, SortOrder, SummarizeOptions, Summary, SummaryFilter,
};
use crate::state::{Confirm, FeatureStore};

#[derive(Clone)]
pub struct DashboardService {
    api: DocumentsApi,
    users: UsersApi,
    documents: FeatureStore<Document, DocumentFilter>,
    summaries: FeatureStore<Summary, SummaryFilter>,
}

impl DashboardService {
    pub fn new(api: DocumentsApi, summaries: SummariesApi, users: UsersApi, page_size: u32) -> Self {
        Self {
            documents: FeatureStore::new(
                "documents",
                Arc::new(api.clone()),
                page_size,
                DocumentFilter::All,
                SortOrder::DateDesc,
            ),
            summaries: FeatureStore::new(
                "summaries",
                Arc::new(summaries),
                page_size,
                SummaryFilter::All,
                SortOrder::DateDesc,
            ),
            api,
            users,
        }
    }

    pub fn documents(&self) -> &FeatureStore<Document, DocumentFilter> {
        &self.documents
    }

    pub fn summaries(&self) -> &FeatureStore<Summary, SummaryFilter> {
        &self.summaries
    }

    pub async fn stats(&self) -> ApiResult<UserStats> {
        self.users.stats().await
    }

    /// Fetch one document, preferring the copy already listed.
    pub async fn view_document(&self, id: &str) -> ApiResult<Document> {
        if let Some(document) = self.documents.get(id) {
            return Ok(document);
        }
        self.api.get(id).await
    }

    /// Flip the favorite flag at once and confirm it with the server.
    ///
    /// Returns the new flag, or `None` if the document is not listed.
    pub async fn toggle_favorite(&self, id: &str) -> ApiResult<Option<bool>> {
        let api = self.api.clone();
        let confirmed = self
            .documents
            .mutate_and_commit(
                id,
                |document| document.is_favorite = !document.is_favorite,
                move |document| async move {
                    let update = DocumentUpdate {
                        is_favorite: Some(document.is_favorite),
                        ..Default::default()
                    };
                    api.update(&document.id, &update).await
                },
            )
            .await?;
        Ok(confirmed.map(|d| d.is_favorite))
    }

    /// Change a document's title and description.
    ///
    /// Both are trimmed, and an empty title is rejected without a request.
    /// A `None` description leaves it as it is. The listed copy, if any, is
    /// replaced with the server's answer.
    pub async fn edit_document(
        &self,
        id: &str,
        title: &str,
        description: Option<&str>,
    ) -> ApiResult<Document> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingField("title").into());
        }
        let update = DocumentUpdate {
            title: Some(title.to_string()),
            description: description.map(|d| d.trim().to_string()),
            ..Default::default()
        };

        let document = self.api.update(id, &update).await?;
        self.documents.replace_item(document.clone());
        info!("Updated document {}", id);
        Ok(document)
    }

    /// Delete a document after `confirm` agrees. Returns whether it was deleted.
    pub async fn delete_document(&self, id: &str, confirm: &dyn Confirm) -> ApiResult<bool> {
        let Some(document) = self.documents.get(id) else {
            return Ok(false);
        };
        let prompt = format!(
            "Delete \"{}\"? This action cannot be undone.",
            document.title
        );
        if !confirm.confirm(&prompt) {
            debug!("Delete of {} declined", id);
            return Ok(false);
        }

        let api = self.api.clone();
        let deleted = self
            .documents
            .remove(id, move |id| async move { api.delete(&id).await })
            .await?;
        if deleted {
            info!("Deleted document {}", id);
        }
        Ok(deleted)
    }

    /// Ask for a summary and put the returned document in the listing.
    pub async fn summarize(&self, id: &str, options: &SummarizeOptions) -> ApiResult<Document> {
        let document = self.api.summarize(id, options).await?;
        self.documents.replace_item(document.clone());
        Ok(document)
    }
}
