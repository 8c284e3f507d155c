//! Notification panel state machine.
//!
//! The panel is either open or closed; opening it hides the unread badge but
//! leaves items unread. Items move `unread -> read` on click and
//! `present -> dismissed` after a short delay, both confirmed remotely and
//! rolled back if the server refuses.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::container::LoadOutcome;
use super::{lock, optimistic, Confirm};
use crate::api::NotificationsApi;
use crate::error::{ApiError, ApiResult};
use crate::models::{Notification, NotificationPreferences, NotificationsResponse};

/// Remote side of the notification panel.
#[async_trait]
pub trait NotificationSource: Send + Sync {
    async fn list(&self) -> ApiResult<NotificationsResponse>;

    async fn mark_read(&self, id: &str, dismiss: bool) -> ApiResult<()>;

    async fn clear_all(&self) -> ApiResult<()>;

    async fn update_preferences(&self, preferences: &NotificationPreferences) -> ApiResult<()>;
}

#[async_trait]
impl NotificationSource for NotificationsApi {
    async fn list(&self) -> ApiResult<NotificationsResponse> {
        NotificationsApi::list(self).await
    }

    async fn mark_read(&self, id: &str, dismiss: bool) -> ApiResult<()> {
        NotificationsApi::mark_read(self, id, dismiss).await
    }

    async fn clear_all(&self) -> ApiResult<()> {
        NotificationsApi::clear_all(self).await
    }

    async fn update_preferences(&self, preferences: &NotificationPreferences) -> ApiResult<()> {
        NotificationsApi::update_preferences(self, preferences).await
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PanelState {
    #[default]
    Closed,
    Open,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationSnapshot {
    pub items: Vec<Notification>,
    pub panel: PanelState,
    pub unread: usize,
    /// Count to show on the badge; `None` while the panel is open or nothing is unread.
    pub badge: Option<usize>,
    pub preferences: NotificationPreferences,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Default)]
struct CenterState {
    items: Vec<Notification>,
    panel: PanelState,
    unread: usize,
    preferences: NotificationPreferences,
    /// Advanced when the held list is cleared, so a list fetched before that
    /// is discarded.
    generation: u64,
    in_flight: Option<u64>,
    error: Option<String>,
}

impl CenterState {
    fn loading(&self) -> bool {
        self.in_flight == Some(self.generation)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|n| n.id == id)
    }

    fn recount(&mut self) {
        self.unread = self.items.iter().filter(|n| !n.read).count();
    }
}

struct LoadingGuard {
    state: Arc<Mutex<CenterState>>,
    generation: u64,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        if state.in_flight == Some(self.generation) {
            state.in_flight = None;
        }
    }
}

/// Handle to a running auto-refresh task; stops the task when dropped.
pub struct AutoRefresh {
    handle: JoinHandle<()>,
}

impl AutoRefresh {
    /// Abort the refresh task now.
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Clone)]
pub struct NotificationCenter {
    source: Arc<dyn NotificationSource>,
    state: Arc<Mutex<CenterState>>,
    dismiss_delay: Duration,
}

impl NotificationCenter {
    pub fn new(source: Arc<dyn NotificationSource>, dismiss_delay: Duration) -> Self {
        Self {
            source,
            state: Arc::new(Mutex::new(CenterState::default())),
            dismiss_delay,
        }
    }

    pub fn snapshot(&self) -> NotificationSnapshot {
        let state = lock(&self.state);
        let badge = match state.panel {
            PanelState::Open => None,
            PanelState::Closed => Some(state.unread).filter(|n| *n > 0),
        };
        NotificationSnapshot {
            items: state.items.clone(),
            panel: state.panel,
            unread: state.unread,
            badge,
            preferences: state.preferences.clone(),
            loading: state.loading(),
            error: state.error.clone(),
        }
    }

    pub fn panel(&self) -> PanelState {
        lock(&self.state).panel
    }

    pub fn toggle_panel(&self) -> PanelState {
        let mut state = lock(&self.state);
        state.panel = match state.panel {
            PanelState::Closed => PanelState::Open,
            PanelState::Open => PanelState::Closed,
        };
        state.panel
    }

    pub fn close_panel(&self) {
        lock(&self.state).panel = PanelState::Closed;
    }

    /// Fetch notifications and preferences, replacing what is held.
    pub async fn load(&self) -> ApiResult<LoadOutcome> {
        let generation = {
            let mut state = lock(&self.state);
            if state.loading() {
                debug!("notifications: load suppressed, already loading");
                return Ok(LoadOutcome::AlreadyLoading);
            }
            state.in_flight = Some(state.generation);
            state.generation
        };
        let _guard = LoadingGuard {
            state: self.state.clone(),
            generation,
        };

        let result = self.source.list().await;

        let mut state = lock(&self.state);
        if state.generation != generation {
            debug!("notifications: discarding list fetched before a clear");
            return Err(ApiError::Stale {
                requested: generation,
                current: state.generation,
            });
        }
        match result {
            Ok(response) => {
                let count = response.notifications.len();
                state.items = response.notifications;
                state.recount();
                if let Some(patch) = response.preferences {
                    state.preferences.apply(&patch);
                }
                state.error = None;
                Ok(LoadOutcome::Loaded(count))
            }
            Err(e) => {
                warn!("Failed to load notifications: {}", e);
                state.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Mark one notification read. Returns `Ok(false)` if it was already read
    /// or is not held.
    pub async fn mark_read(&self, id: &str) -> ApiResult<bool> {
        let done = optimistic(
            || {
                let mut state = lock(&self.state);
                let index = state.position(id)?;
                if state.items[index].read {
                    return None;
                }
                state.items[index].read = true;
                state.unread = state.unread.saturating_sub(1);
                Some(())
            },
            |_| self.source.mark_read(id, false),
            |_| {
                let mut state = lock(&self.state);
                if let Some(index) = state.position(id) {
                    if state.items[index].read {
                        state.items[index].read = false;
                        state.unread += 1;
                    }
                }
            },
        )
        .await?;
        Ok(done.is_some())
    }

    /// Dismiss one notification: wait out the removal delay, drop it, then
    /// confirm. A refused dismiss puts it back where it was.
    pub async fn dismiss(&self, id: &str) -> ApiResult<bool> {
        if lock(&self.state).position(id).is_none() {
            return Ok(false);
        }
        tokio::time::sleep(self.dismiss_delay).await;

        let done = optimistic(
            || {
                let mut state = lock(&self.state);
                let index = state.position(id)?;
                let item = state.items.remove(index);
                if !item.read {
                    state.unread = state.unread.saturating_sub(1);
                }
                Some((index, item))
            },
            |_| self.source.mark_read(id, true),
            |(index, item)| {
                let mut state = lock(&self.state);
                if state.position(&item.id).is_some() {
                    return;
                }
                let index = index.min(state.items.len());
                state.items.insert(index, item);
                state.recount();
            },
        )
        .await?;
        Ok(done.is_some())
    }

    /// Dismiss everything in one call, after `confirm` agrees.
    pub async fn clear_all(&self, confirm: &dyn Confirm) -> ApiResult<bool> {
        if lock(&self.state).items.is_empty() {
            return Ok(false);
        }
        if !confirm.confirm("Are you sure you want to clear all notifications?") {
            debug!("notifications: clear all declined");
            return Ok(false);
        }

        let done = optimistic(
            || {
                let mut state = lock(&self.state);
                let items = std::mem::take(&mut state.items);
                state.unread = 0;
                state.generation += 1;
                Some(items)
            },
            |_| self.source.clear_all(),
            |items| {
                let mut state = lock(&self.state);
                state.items = items;
                state.recount();
            },
        )
        .await?;
        if done.is_some() {
            info!("Cleared all notifications");
        }
        Ok(done.is_some())
    }

    /// Replace the preferences, restoring the old ones if the server refuses.
    pub async fn update_preferences(&self, preferences: NotificationPreferences) -> ApiResult<()> {
        optimistic(
            || {
                let mut state = lock(&self.state);
                Some(std::mem::replace(&mut state.preferences, preferences.clone()))
            },
            |_| self.source.update_preferences(&preferences),
            |previous| lock(&self.state).preferences = previous,
        )
        .await?;
        Ok(())
    }

    /// Reload on a fixed period until the returned handle is dropped.
    ///
    /// Ticks share the loading guard with manual loads, so a tick that lands
    /// while a load is running does nothing.
    pub fn spawn_auto_refresh(&self, period: Duration) -> AutoRefresh {
        let center = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                match center.load().await {
                    Ok(LoadOutcome::AlreadyLoading) => debug!("notifications: refresh skipped"),
                    Ok(_) => {}
                    Err(e) => debug!("notifications: refresh failed: {}", e),
                }
            }
        });
        AutoRefresh { handle }
    }
}
