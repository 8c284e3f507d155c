use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::listing::Listable;

/// Known notification categories. Unknown categories render as system updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    SummaryCompleted,
    DocumentProcessed,
    SystemUpdate,
    FeedbackResponse,
    Error,
}

impl NotificationKind {
    pub fn default_title(&self) -> &'static str {
        match self {
            NotificationKind::SummaryCompleted => "Summary Completed",
            NotificationKind::DocumentProcessed => "Document Processed",
            NotificationKind::SystemUpdate => "System Update",
            NotificationKind::FeedbackResponse => "Feedback Response",
            NotificationKind::Error => "Error",
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            NotificationKind::SummaryCompleted => "Your document has been successfully summarized.",
            NotificationKind::DocumentProcessed => {
                "Your document has been processed and is ready to view."
            }
            NotificationKind::SystemUpdate => "SciSummarize has been updated with new features.",
            NotificationKind::FeedbackResponse => "Your feedback has received a response.",
            NotificationKind::Error => "An error has occurred.",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "summaryCompleted" => NotificationKind::SummaryCompleted,
            "documentProcessed" => NotificationKind::DocumentProcessed,
            "feedbackResponse" => NotificationKind::FeedbackResponse,
            "error" => NotificationKind::Error,
            _ => NotificationKind::SystemUpdate,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub action_url: Option<String>,
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        self.kind.parse().unwrap_or(NotificationKind::SystemUpdate)
    }

    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .unwrap_or_else(|| self.kind().default_title())
    }

    pub fn display_message(&self) -> &str {
        self.message
            .as_deref()
            .unwrap_or_else(|| self.kind().default_message())
    }
}

impl Listable for Notification {
    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        Some(self.timestamp)
    }

    fn name(&self) -> &str {
        self.display_title()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub summary_completed: bool,
    pub document_processed: bool,
    pub system_updates: bool,
    pub email_notifications: bool,
    pub desktop_notifications: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            summary_completed: true,
            document_processed: true,
            system_updates: true,
            email_notifications: false,
            desktop_notifications: false,
        }
    }
}

/// Partial preferences as sent by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferencesPatch {
    pub summary_completed: Option<bool>,
    pub document_processed: Option<bool>,
    pub system_updates: Option<bool>,
    pub email_notifications: Option<bool>,
    pub desktop_notifications: Option<bool>,
}

impl NotificationPreferences {
    /// Overlay the fields present in `patch`.
    pub fn apply(&mut self, patch: &NotificationPreferencesPatch) {
        if let Some(v) = patch.summary_completed {
            self.summary_completed = v;
        }
        if let Some(v) = patch.document_processed {
            self.document_processed = v;
        }
        if let Some(v) = patch.system_updates {
            self.system_updates = v;
        }
        if let Some(v) = patch.email_notifications {
            self.email_notifications = v;
        }
        if let Some(v) = patch.desktop_notifications {
            self.desktop_notifications = v;
        }
    }
}

/// `GET /notifications` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationsResponse {
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub preferences: Option<NotificationPreferencesPatch>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_kind_falls_back_to_system_update() {
        let n: Notification = serde_json::from_value(serde_json::json!({
            "id": "n1",
            "type": "somethingNew",
            "timestamp": "2024-05-01T12:00:00Z"
        }))
        .unwrap();
        assert_eq!(n.kind(), NotificationKind::SystemUpdate);
        assert_eq!(n.display_title(), "System Update");
        assert!(!n.read);
    }

    #[test]
    fn test_preferences_patch_overlays_present_fields() {
        let mut prefs = NotificationPreferences::default();
        prefs.apply(&NotificationPreferencesPatch {
            email_notifications: Some(true),
            system_updates: Some(false),
            ..Default::default()
        });
        assert!(prefs.email_notifications);
        assert!(!prefs.system_updates);
        assert!(prefs.summary_completed);
    }
}
