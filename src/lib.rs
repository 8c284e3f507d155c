//! SciSummarize client library.
//!
//! Talks to the SciSummarize REST backend through a single [`gateway`], keeps
//! per-feature view state in sync with it ([`state`]), and exposes the feature
//! logic as [`services`] that any front end can drive.

pub mod actions;
pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;

pub use context::AppContext;
pub use error::{ApiError, ApiResult, StorageError, ValidationError};
