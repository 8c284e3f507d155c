//! Typed wrappers over the gateway, one per backend resource.
//!
//! Each wrapper owns a cheap clone of the [`Gateway`] and knows the paths and
//! body shapes of its resource. Nothing here holds state.

mod auth;
mod documents;
mod feedback;
mod notifications;
mod search;
mod summaries;
mod users;

pub use auth::AuthApi;
pub use documents::{DocumentsApi, UploadRequest};
pub use feedback::FeedbackApi;
pub use notifications::NotificationsApi;
pub use search::SearchApi;
pub use summaries::SummariesApi;
pub use users::{UserStats, UsersApi};

use crate::gateway::Gateway;

/// Escape an id for use as a path segment.
pub(crate) fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

/// Every resource wrapper, built from one gateway.
#[derive(Clone)]
pub struct Api {
    pub auth: AuthApi,
    pub documents: DocumentsApi,
    pub summaries: SummariesApi,
    pub users: UsersApi,
    pub notifications: NotificationsApi,
    pub feedback: FeedbackApi,
    pub search: SearchApi,
}

impl Api {
    pub fn new(gateway: &Gateway) -> Self {
        Self {
            auth: AuthApi::new(gateway.clone()),
            documents: DocumentsApi::new(gateway.clone()),
            summaries: SummariesApi::new(gateway.clone()),
            users: UsersApi::new(gateway.clone()),
            notifications: NotificationsApi::new(gateway.clone()),
            feedback: FeedbackApi::new(gateway.clone()),
            search: SearchApi::new(gateway.clone()),
        }
    }
}
