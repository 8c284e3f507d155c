use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use super::segment;
use crate::error::{ApiError, ApiResult};
use crate::gateway::{Gateway, RequestOptions};
use crate::models::{
    Document, DocumentFilter, DocumentInsights, DocumentListResponse, DocumentUpdate,
    ExportFormat, ExportedFile, ListQuery, Page, SummarizeOptions,
};
use crate::state::PageSource;

/// A validated upload, ready to be sent.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

impl UploadRequest {
    fn into_form(self) -> ApiResult<Form> {
        let part = Part::bytes(self.bytes)
            .file_name(self.filename)
            .mime_str(&self.mime_type)
            .map_err(|e| ApiError::Parse(format!("invalid MIME type: {}", e)))?;

        let mut form = Form::new().part("file", part).text("title", self.title);
        if let Some(description) = self.description {
            form = form.text("description", description);
        }
        if !self.tags.is_empty() {
            form = form.text("tags", serde_json::to_string(&self.tags)?);
        }
        Ok(form)
    }
}

/// `/documents` endpoints.
#[derive(Clone)]
pub struct DocumentsApi {
    gateway: Gateway,
}

impl DocumentsApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub async fn list(&self, query: ListQuery<DocumentFilter>) -> ApiResult<Page<Document>> {
        let response: DocumentListResponse = self
            .gateway
            .request_json("/documents", RequestOptions::get().query(query.to_pairs()))
            .await?;
        Ok(Page::new(response.documents, response.has_more))
    }

    pub async fn get(&self, id: &str) -> ApiResult<Document> {
        self.gateway
            .get_json(&format!("/documents/{}", segment(id)))
            .await
    }

    pub async fn update(&self, id: &str, update: &DocumentUpdate) -> ApiResult<Document> {
        self.gateway
            .request_json(
                &format!("/documents/{}", segment(id)),
                RequestOptions::put().json(update)?,
            )
            .await
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        self.gateway
            .request_unit(&format!("/documents/{}", segment(id)), RequestOptions::delete())
            .await
    }

    pub async fn upload(&self, upload: UploadRequest) -> ApiResult<Document> {
        let form = upload.into_form()?;
        self.gateway
            .request_json("/documents/upload", RequestOptions::post().multipart(form))
            .await
    }

    /// Trigger summary generation; the server answers with the updated document.
    pub async fn summarize(&self, id: &str, options: &SummarizeOptions) -> ApiResult<Document> {
        self.gateway
            .request_json(
                &format!("/documents/{}/summarize", segment(id)),
                RequestOptions::post().json(options)?,
            )
            .await
    }

    pub async fn export(&self, id: &str, format: ExportFormat) -> ApiResult<ExportedFile> {
        let download = self
            .gateway
            .download(&format!("/documents/{}/export/{}", segment(id), format))
            .await?;

        let filename = download
            .content_disposition_filename()
            .unwrap_or_else(|| format.fallback_filename());
        Ok(ExportedFile {
            filename,
            content_type: download.content_type().map(|s| s.to_string()),
            bytes: download.bytes,
        })
    }

    pub async fn insights(&self, id: &str) -> ApiResult<DocumentInsights> {
        self.gateway
            .get_json(&format!("/documents/{}/insights", segment(id)))
            .await
    }
}

#[async_trait]
impl PageSource<Document, DocumentFilter> for DocumentsApi {
    async fn fetch_page(&self, query: ListQuery<DocumentFilter>) -> ApiResult<Page<Document>> {
        self.list(query).await
    }
}
