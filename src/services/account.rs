use tracing::info;

use crate::api::UsersApi;
use crate::error::{ApiResult, ValidationError};
use crate::models::{PasswordChange, ProfileUpdate, UserProfile};

/// Shortest password accepted by a password change.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Profile and password management for the signed-in user.
#[derive(Clone)]
pub struct AccountService {
    api: UsersApi,
}

impl AccountService {
    pub fn new(api: UsersApi) -> Self {
        Self { api }
    }

    pub async fn profile(&self) -> ApiResult<UserProfile> {
        self.api.profile().await
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> ApiResult<UserProfile> {
        if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ValidationError::MissingField("name").into());
        }
        self.api.update_profile(&update).await
    }

    pub async fn change_password(
        &self,
        current: &str,
        new: &str,
        confirm: &str,
    ) -> ApiResult<()> {
        check_new_password(current, new, confirm)?;
        self.api
            .change_password(&PasswordChange {
                current_password: current.to_string(),
                new_password: new.to_string(),
            })
            .await?;
        info!("Password changed");
        Ok(())
    }
}

fn check_new_password(current: &str, new: &str, confirm: &str) -> Result<(), ValidationError> {
    if current.is_empty() {
        return Err(ValidationError::MissingField("current password"));
    }
    if new != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LEN));
    }
    Ok(())
}
