//! Service layer for SciSummarize business logic.
//!
//! This module contains domain logic separated from UI concerns.
//! Services can be used by the CLI or any other front end.

pub mod account;
pub mod auth;
pub mod dashboard;
pub mod export;
pub mod feedback;
pub mod insights;
pub mod settings;
pub mod upload;

pub use account::AccountService;
pub use auth::AuthService;
pub use dashboard::DashboardService;
pub use export::{save_export, ExportService};
pub use feedback::FeedbackService;
pub use insights::{ChartSeries, InsightCharts, InsightTab, InsightsService};
pub use settings::{SavedSettings, SettingsService, SettingsSource};
pub use upload::{UploadEvent, UploadForm, UploadService};
