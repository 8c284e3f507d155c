//! Item actions as enums instead of free-form action strings.
//!
//! Front ends parse an action name with [`FromStr`] and hand the result to
//! [`AppContext::dispatch`]; every variant has exactly one handler there.

use std::fmt;
use std::str::FromStr;

use crate::context::AppContext;
use crate::error::ApiResult;
use crate::models::{Document, ExportFormat, ExportedFile};
use crate::state::Confirm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentAction {
    View,
    Favorite,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryAction {
    View,
    Edit,
    Export(ExportFormat),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    MarkRead,
    Dismiss,
}

/// An action bound to the item it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Document(DocumentAction, String),
    Summary(SummaryAction, String),
    Notification(NotificationAction, String),
    ClearNotifications,
}

/// What a dispatched action produced.
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    Document(Document),
    Favorite(Option<bool>),
    Deleted(bool),
    /// Path of a page the front end should open.
    Navigate(String),
    Exported(ExportedFile),
    Notification(bool),
}

impl FromStr for DocumentAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(DocumentAction::View),
            "favorite" => Ok(DocumentAction::Favorite),
            "delete" => Ok(DocumentAction::Delete),
            other => Err(format!("unknown document action: {other}")),
        }
    }
}

impl FromStr for SummaryAction {
    type Err = String;

    /// `export` defaults to PDF; `export:html` picks a format.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("export", format)) => format
                .parse()
                .map(SummaryAction::Export)
                .map_err(|e: crate::error::ValidationError| e.to_string()),
            Some(_) => Err(format!("unknown summary action: {s}")),
            None => match s {
                "view" => Ok(SummaryAction::View),
                "edit" => Ok(SummaryAction::Edit),
                "export" => Ok(SummaryAction::Export(ExportFormat::Pdf)),
                other => Err(format!("unknown summary action: {other}")),
            },
        }
    }
}

impl FromStr for NotificationAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" | "mark-read" => Ok(NotificationAction::MarkRead),
            "dismiss" => Ok(NotificationAction::Dismiss),
            other => Err(format!("unknown notification action: {other}")),
        }
    }
}

impl fmt::Display for DocumentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentAction::View => "view",
            DocumentAction::Favorite => "favorite",
            DocumentAction::Delete => "delete",
        })
    }
}

impl AppContext {
    /// Run an action against the right feature.
    pub async fn dispatch(&self, action: Action, confirm: &dyn Confirm) -> ApiResult<ActionOutcome> {
        let result = match action {
            Action::Document(DocumentAction::View, id) => self
                .dashboard
                .view_document(&id)
                .await
                .map(ActionOutcome::Document),
            Action::Document(DocumentAction::Favorite, id) => self
                .dashboard
                .toggle_favorite(&id)
                .await
                .map(ActionOutcome::Favorite),
            Action::Document(DocumentAction::Delete, id) => self
                .dashboard
                .delete_document(&id, confirm)
                .await
                .map(ActionOutcome::Deleted),
            Action::Summary(SummaryAction::View, id) => {
                Ok(ActionOutcome::Navigate(format!("/summaries/{}", id)))
            }
            Action::Summary(SummaryAction::Edit, id) => {
                Ok(ActionOutcome::Navigate(format!("/summaries/{}/edit", id)))
            }
            Action::Summary(SummaryAction::Export(format), id) => {
                let document_id = self
                    .dashboard
                    .summaries()
                    .get(&id)
                    .map(|s| s.document_id)
                    .unwrap_or(id);
                self.export
                    .export(&document_id, format)
                    .await
                    .map(ActionOutcome::Exported)
            }
            Action::Notification(NotificationAction::MarkRead, id) => self
                .notifications
                .mark_read(&id)
                .await
                .map(ActionOutcome::Notification),
            Action::Notification(NotificationAction::Dismiss, id) => self
                .notifications
                .dismiss(&id)
                .await
                .map(ActionOutcome::Notification),
            Action::ClearNotifications => self
                .notifications
                .clear_all(confirm)
                .await
                .map(ActionOutcome::Notification),
        };

        if let Err(ref e) = result {
            self.auth.handle_error(e);
        }
        result
    }
}
