use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::listing::SortOrder;

/// Filters applied to a full-text search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilters {
    pub sort: SortOrder,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub included_types: Vec<String>,
    pub tags: Vec<String>,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            sort: SortOrder::DateDesc,
            date_start: None,
            date_end: None,
            included_types: ["pdf", "doc", "docx", "txt"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            tags: Vec::new(),
        }
    }
}

/// Body of `POST /search`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub q: String,
    pub page: u32,
    pub page_size: u32,
    pub sort: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_end: Option<NaiveDate>,
    pub included_types: Vec<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default, alias = "created_at")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    #[serde(default)]
    pub items: Vec<SearchHit>,
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub total_pages: u32,
}
