//! Request context carrying the authenticated caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lanyue_core::error::AppError;
use lanyue_core::result::AppResult;
use lanyue_entity::user::UserRole;

/// Context for the current authenticated request.
///
/// Built by the auth extractor from validated token claims and passed into
/// service methods so that every operation knows who is acting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Subject of the token.
    pub user_id: String,
    pub username: String,
    pub role: UserRole,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            role,
            request_time: Utc::now(),
        }
    }

    /// Context for work the server does on its own behalf, such as
    /// restoring mounts at startup.
    pub fn system() -> Self {
        Self::new("system", "system", UserRole::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Fail with an authorization error unless the caller is an admin.
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::authorization("Administrator role required"))
        }
    }
}
