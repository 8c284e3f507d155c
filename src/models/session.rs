use chrono::{DateTime, Utc};

use super::user::UserProfile;

/// The signed-in user, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}
