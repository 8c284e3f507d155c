//! Session lifecycle: login, registration, logout and status checks.
//!
//! The token and its optional expiry live in the key-value store; the
//! signed-in profile lives in memory. Only this service writes either.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::api::AuthApi;
use crate::error::{ApiError, ApiResult, ValidationError};
use crate::models::{LoginRequest, RegisterRequest, Session, UserProfile};
use crate::storage::{KeyValueStore, AUTH_TOKEN_KEY, TOKEN_EXPIRATION_KEY};

/// How long a "remember me" login stays valid.
pub const REMEMBER_ME_DAYS: i64 = 30;

#[derive(Clone)]
pub struct AuthService {
    api: AuthApi,
    store: Arc<dyn KeyValueStore>,
    session: Arc<RwLock<Session>>,
}

impl AuthService {
    pub fn new(api: AuthApi, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            api,
            store,
            session: Arc::new(RwLock::new(Session::default())),
        }
    }

    pub fn session(&self) -> Session {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.session().user
    }

    fn update_session(&self, f: impl FnOnce(&mut Session)) {
        let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
        f(&mut session);
    }

    /// Sign in and persist the token. With `remember_me` an expiry 30 days
    /// out is stored as well; without it any stored expiry is removed.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> ApiResult<UserProfile> {
        if email.trim().is_empty() {
            return Err(ValidationError::MissingField("email").into());
        }
        if password.is_empty() {
            return Err(ValidationError::MissingField("password").into());
        }

        let response = self
            .api
            .login(&LoginRequest {
                email: email.trim().to_string(),
                password: password.to_string(),
                remember_me,
            })
            .await?;

        let token = response
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Parse("login response carried no token".to_string()))?;
        self.store.set(AUTH_TOKEN_KEY, &token)?;

        let expires_at = if remember_me {
            let at = Utc::now() + Duration::days(REMEMBER_ME_DAYS);
            self.store.set(TOKEN_EXPIRATION_KEY, &at.to_rfc3339())?;
            Some(at)
        } else {
            self.store.remove(TOKEN_EXPIRATION_KEY)?;
            None
        };

        let user = match response.user {
            Some(user) => user,
            None => self.api.me().await?,
        };

        self.update_session(|s| {
            s.token = Some(token);
            s.user = Some(user.clone());
            s.expires_at = expires_at;
        });
        info!("Signed in as {}", user.display_name());
        Ok(user)
    }

    /// Create an account. The password and its confirmation must match.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        password_confirm: &str,
    ) -> ApiResult<()> {
        if name.trim().is_empty() {
            return Err(ValidationError::MissingField("name").into());
        }
        if email.trim().is_empty() {
            return Err(ValidationError::MissingField("email").into());
        }
        if password.is_empty() {
            return Err(ValidationError::MissingField("password").into());
        }
        if password != password_confirm {
            return Err(ValidationError::PasswordMismatch.into());
        }

        self.api
            .register(&RegisterRequest {
                name: name.trim().to_string(),
                email: email.trim().to_string(),
                password: password.to_string(),
            })
            .await?;
        info!("Registered account for {}", email.trim());
        Ok(())
    }

    /// Sign out remotely and always clear local state, even when the server
    /// call fails. The server error, if any, is still returned.
    pub async fn logout(&self) -> ApiResult<()> {
        let result = self.api.logout().await;
        if let Err(ref e) = result {
            warn!("Logout request failed, clearing local session anyway: {}", e);
        }
        self.force_logout();
        result
    }

    /// Drop the token, its expiry and the in-memory user.
    pub fn force_logout(&self) {
        for key in [AUTH_TOKEN_KEY, TOKEN_EXPIRATION_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!("Could not remove {}: {}", key, e);
            }
        }
        self.update_session(|s| *s = Session::default());
        debug!("Local session cleared");
    }

    /// The stored token, unless it has expired. An expired token is purged.
    pub fn stored_token(&self) -> Option<String> {
        let token = match self.store.get(AUTH_TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty())?,
            Err(e) => {
                warn!("Could not read auth token: {}", e);
                return None;
            }
        };

        let expiry = self
            .store
            .get(TOKEN_EXPIRATION_KEY)
            .ok()
            .flatten()
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|at| at.with_timezone(&Utc));

        if let Some(at) = expiry {
            if at <= Utc::now() {
                info!("Stored session expired at {}", at);
                self.force_logout();
                return None;
            }
        }
        Some(token)
    }

    /// Resolve the current user from the stored token.
    ///
    /// With no usable token this is `Ok(None)` and nothing is sent. A failed
    /// lookup clears the session and also yields `Ok(None)`.
    pub async fn check_status(&self) -> ApiResult<Option<UserProfile>> {
        let Some(token) = self.stored_token() else {
            self.update_session(|s| *s = Session::default());
            return Ok(None);
        };

        match self.api.me().await {
            Ok(user) => {
                let expires_at = self
                    .store
                    .get(TOKEN_EXPIRATION_KEY)?
                    .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
                    .map(|at| at.with_timezone(&Utc));
                self.update_session(|s| {
                    s.token = Some(token);
                    s.user = Some(user.clone());
                    s.expires_at = expires_at;
                });
                Ok(Some(user))
            }
            Err(e) => {
                warn!("Session check failed: {}", e);
                self.force_logout();
                Ok(None)
            }
        }
    }

    /// True when a non-expired token is stored and a user is loaded.
    pub fn is_authenticated(&self) -> bool {
        self.stored_token().is_some() && self.session().user.is_some()
    }

    /// Tear the session down if `error` says the credentials are no longer
    /// valid. Returns whether it did.
    pub fn handle_error(&self, error: &ApiError) -> bool {
        if error.is_unauthorized() {
            warn!("Credentials rejected, signing out");
            self.force_logout();
            true
        } else {
            false
        }
    }
}
