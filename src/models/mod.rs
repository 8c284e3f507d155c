//! Wire types exchanged with the SciSummarize backend.

mod document;
mod export;
mod feedback;
mod insights;
mod listing;
mod notification;
mod search;
mod session;
mod user;

pub use document::{
    Document, DocumentFilter, DocumentListResponse, DocumentUpdate, SummarizeOptions, Summary,
    SummaryFilter, SummaryListResponse, SummaryStatus,
};
pub use export::{ExportFormat, ExportedFile};
pub use feedback::{FeedbackEntry, FeedbackKind, NewFeedback};
pub use insights::{Citation, CitationsByYear, DocumentInsights, InsightDocument, Keyword, Topic, TrendPoint};
pub use listing::{ListQuery, Listable, Page, QueryParam, SortOrder};
pub use notification::{
    Notification, NotificationKind, NotificationPreferences, NotificationPreferencesPatch,
    NotificationsResponse,
};
pub use search::{SearchFilters, SearchHit, SearchRequest, SearchResults};
pub use session::Session;
pub use user::{
    LoginRequest, LoginResponse, PasswordChange, ProfileUpdate, RegisterRequest, UserProfile,
};
