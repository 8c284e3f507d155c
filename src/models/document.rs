//! Documents and their summaries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::listing::{Listable, QueryParam};

/// An uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(alias = "created_at", alias = "upload_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, alias = "updated_at")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "expiration_timestamp")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "is_favorite")]
    pub is_favorite: bool,
    #[serde(default, alias = "has_summary")]
    pub has_summary: bool,
    #[serde(default, alias = "file_size_kb")]
    pub file_size_kb: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl Listable for Document {
    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }

    fn name(&self) -> &str {
        &self.title
    }
}

/// `GET /documents` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentListResponse {
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub has_more: bool,
}

/// Partial update sent with `PUT /documents/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    #[default]
    Completed,
    Draft,
}

/// A generated summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub id: String,
    #[serde(alias = "document_id")]
    pub document_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: SummaryStatus,
    #[serde(default = "first_version")]
    pub version: u32,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
}

fn first_version() -> u32 {
    1
}

impl Listable for Summary {
    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }

    fn name(&self) -> &str {
        &self.title
    }
}

/// `GET /summaries` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryListResponse {
    #[serde(default)]
    pub summaries: Vec<Summary>,
    #[serde(default)]
    pub has_more: bool,
}

/// Options for `POST /documents/{id}/summarize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeOptions {
    pub length: String,
    pub style: String,
    pub include_key_points: bool,
    pub include_citations: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DocumentFilter {
    #[default]
    All,
    Recent,
    Favorites,
}

impl QueryParam for DocumentFilter {
    fn as_str(&self) -> &'static str {
        match self {
            DocumentFilter::All => "all",
            DocumentFilter::Recent => "recent",
            DocumentFilter::Favorites => "favorites",
        }
    }
}

impl FromStr for DocumentFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(DocumentFilter::All),
            "recent" => Ok(DocumentFilter::Recent),
            "favorites" => Ok(DocumentFilter::Favorites),
            other => Err(format!("unknown document filter: {other}")),
        }
    }
}

impl fmt::Display for DocumentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SummaryFilter {
    #[default]
    All,
    Completed,
    Draft,
}

impl QueryParam for SummaryFilter {
    fn as_str(&self) -> &'static str {
        match self {
            SummaryFilter::All => "all",
            SummaryFilter::Completed => "completed",
            SummaryFilter::Draft => "draft",
        }
    }
}

impl FromStr for SummaryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(SummaryFilter::All),
            "completed" => Ok(SummaryFilter::Completed),
            "draft" => Ok(SummaryFilter::Draft),
            other => Err(format!("unknown summary filter: {other}")),
        }
    }
}

impl fmt::Display for SummaryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
