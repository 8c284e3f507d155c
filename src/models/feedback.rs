use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::listing::Listable;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    #[default]
    General,
    Summary,
    Bug,
    Feature,
}

impl FromStr for FeedbackKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(FeedbackKind::General),
            "summary" => Ok(FeedbackKind::Summary),
            "bug" => Ok(FeedbackKind::Bug),
            "feature" => Ok(FeedbackKind::Feature),
            other => Err(format!("unknown feedback type: {other}")),
        }
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FeedbackKind::General => "general",
            FeedbackKind::Summary => "summary",
            FeedbackKind::Bug => "bug",
            FeedbackKind::Feature => "feature",
        };
        f.write_str(s)
    }
}

/// Body of `POST /feedback`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedback {
    #[serde(rename = "type")]
    pub kind: FeedbackKind,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
}

/// A previously submitted feedback entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: FeedbackKind,
    pub text: String,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
}

impl Listable for FeedbackEntry {
    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }

    fn name(&self) -> &str {
        &self.text
    }
}
