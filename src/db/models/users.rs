//! Database models for users.

use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub external_id: String,
    pub handle: Option<String>,
    pub is_admin: bool,
    pub credits: i64,
}

impl UserCreateDBRequest {
    /// A user record as created on first contact: no credits, no privileges.
    pub fn first_contact(external_id: &str, handle: Option<&str>) -> Self {
        Self {
            external_id: external_id.to_string(),
            handle: handle.map(str::to_string),
            is_admin: false,
            credits: 0,
        }
    }
}

/// Database response for a user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserDBResponse {
    pub id: UserId,
    pub external_id: String,
    pub handle: Option<String>,
    pub is_admin: bool,
    pub credits: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
