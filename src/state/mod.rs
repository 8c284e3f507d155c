//! In-memory view state kept in sync with the backend.
//!
//! Every container owns its state behind a mutex that is never held across an
//! `.await`; network calls capture a generation number at dispatch and their
//! results are dropped if the container moved on in the meantime.

mod container;
mod notifications;
mod optimistic;
mod search;
mod settings;

pub use container::{ContainerSnapshot, FeatureStore, LoadOutcome, PageSource, UndoToken};
pub use notifications::{
    AutoRefresh, NotificationCenter, NotificationSnapshot, NotificationSource, PanelState,
};
pub use optimistic::optimistic;
pub use search::{SearchBackend, SearchOutcome, SearchSnapshot, SearchState};
pub use settings::{
    merge_settings, merge_with_defaults, DisplayPreferences, NotificationSettings, Shortcuts,
    SummarizationPreferences, UserSettings,
};

/// A yes/no gate in front of destructive operations.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Fixed answer, for non-interactive callers (`--yes`) and tests.
impl Confirm for bool {
    fn confirm(&self, _prompt: &str) -> bool {
        *self
    }
}

/// Lock a std mutex, recovering the data if a panicking holder poisoned it.
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
