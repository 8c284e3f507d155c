//! Feedback submission and history.

use std::sync::{Arc, Mutex};

use tracing::info;

use crate::api::FeedbackApi;
use crate::error::{ApiResult, ValidationError};
use crate::models::{FeedbackEntry, FeedbackKind, NewFeedback, SortOrder};

/// Longest accepted feedback text, in characters.
pub const MAX_FEEDBACK_CHARS: usize = 1000;

#[derive(Clone)]
pub struct FeedbackService {
    api: FeedbackApi,
    history: Arc<Mutex<Option<Vec<FeedbackEntry>>>>,
}

impl FeedbackService {
    pub fn new(api: FeedbackApi) -> Self {
        Self {
            api,
            history: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn submit(
        &self,
        kind: FeedbackKind,
        text: &str,
        document_id: Option<String>,
    ) -> ApiResult<()> {
        let feedback = validate(kind, text, document_id)?;
        self.api.submit(&feedback).await?;
        info!("Submitted {} feedback", feedback.kind);
        // Next history call picks up the new entry
        *self.history.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }

    /// Previously submitted feedback, newest first. Fetched once and cached
    /// unless `refresh` is set.
    pub async fn history(&self, refresh: bool) -> ApiResult<Vec<FeedbackEntry>> {
        if !refresh {
            let cached = self.history.lock().unwrap_or_else(|e| e.into_inner()).clone();
            if let Some(entries) = cached {
                return Ok(entries);
            }
        }

        let mut entries = self.api.history().await?;
        SortOrder::DateDesc.sort(&mut entries);
        *self.history.lock().unwrap_or_else(|e| e.into_inner()) = Some(entries.clone());
        Ok(entries)
    }
}

fn validate(
    kind: FeedbackKind,
    text: &str,
    document_id: Option<String>,
) -> Result<NewFeedback, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::MissingField("feedback"));
    }
    if text.chars().count() > MAX_FEEDBACK_CHARS {
        return Err(ValidationError::TooLong {
            field: "feedback",
            max: MAX_FEEDBACK_CHARS,
        });
    }
    Ok(NewFeedback {
        kind,
        text: text.to_string(),
        document_id: document_id.filter(|id| !id.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_length_limits() {
        assert_eq!(
            validate(FeedbackKind::Bug, "   ", None),
            Err(ValidationError::MissingField("feedback"))
        );
        let long = "é".repeat(MAX_FEEDBACK_CHARS + 1);
        assert!(matches!(
            validate(FeedbackKind::General, &long, None),
            Err(ValidationError::TooLong { max: 1000, .. })
        ));
        let exact = "é".repeat(MAX_FEEDBACK_CHARS);
        assert!(validate(FeedbackKind::General, &exact, Some(String::new()))
            .unwrap()
            .document_id
            .is_none());
    }
}
