//! Explicit application context shared by every front-end handler.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::api::Api;
use crate::config::Settings;
use crate::error::ApiResult;
use crate::gateway::Gateway;
use crate::services::{
    AccountService, AuthService, DashboardService, ExportService, FeedbackService,
    InsightsService, SettingsService, UploadService,
};
use crate::state::{NotificationCenter, SearchState};
use crate::storage::{KeyValueStore, SqliteStore};

/// Everything a handler may need, built once per run.
#[derive(Clone)]
pub struct AppContext {
    pub settings: Settings,
    pub store: Arc<dyn KeyValueStore>,
    pub gateway: Gateway,
    pub api: Api,
    pub auth: AuthService,
    pub account: AccountService,
    pub user_settings: SettingsService,
    pub dashboard: DashboardService,
    pub notifications: NotificationCenter,
    pub search: SearchState,
    pub upload: UploadService,
    pub export: ExportService,
    pub feedback: FeedbackService,
    pub insights: InsightsService,
}

impl AppContext {
    /// Open the on-disk store under the configured data directory.
    pub fn open(settings: Settings) -> ApiResult<Self> {
        settings
            .ensure_directories()
            .map_err(crate::error::StorageError::from)?;
        let store = SqliteStore::open(&settings.store_path())?;
        Self::with_store(settings, Arc::new(store))
    }

    pub fn with_store(settings: Settings, store: Arc<dyn KeyValueStore>) -> ApiResult<Self> {
        let gateway = Gateway::new(&settings, store.clone())?;
        let api = Api::new(&gateway);

        Ok(Self {
            auth: AuthService::new(api.auth.clone(), store.clone()),
            account: AccountService::new(api.users.clone()),
            user_settings: SettingsService::new(api.users.clone(), store.clone()),
            dashboard: DashboardService::new(
                api.documents.clone(),
                api.summaries.clone(),
                api.users.clone(),
                settings.page_size,
            ),
            notifications: NotificationCenter::new(
                Arc::new(api.notifications.clone()),
                settings.dismiss_delay(),
            ),
            search: SearchState::new(Arc::new(api.search.clone()), settings.page_size),
            upload: UploadService::new(api.documents.clone()),
            export: ExportService::new(api.documents.clone()),
            feedback: FeedbackService::new(api.feedback.clone()),
            insights: InsightsService::new(api.documents.clone()),
            settings,
            store,
            gateway,
            api,
        })
    }

    /// Sign out whenever any request comes back 401, wherever it was made.
    pub fn spawn_session_watch(&self) -> JoinHandle<()> {
        let mut events = self.gateway.errors().subscribe();
        let auth = self.auth.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if event.status == Some(401) => {
                        info!("{} rejected the session, signing out", event.endpoint);
                        auth.force_logout();
                    }
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        debug!("Session watch skipped {} error events", n);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
