//! API request/response models for users.

use crate::db::models::users::UserDBResponse;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Register (or re-resolve) a user on first contact
#[derive(Debug, Clone, Deserialize)]
pub struct UserRegister {
    pub external_id: String,
    pub handle: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: UserId,
    pub external_id: String,
    pub handle: Option<String>,
    pub is_admin: bool,
    pub credits: i64,
    pub created_at: DateTime<Utc>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(user: UserDBResponse) -> Self {
        Self {
            id: user.id,
            external_id: user.external_id,
            handle: user.handle,
            is_admin: user.is_admin,
            credits: user.credits,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub external_id: String,
    pub credits: i64,
}
