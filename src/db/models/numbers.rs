//! Database models for pool numbers.

use crate::types::NumberId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Number lifecycle status, stored as TEXT in the database.
///
/// Numbers are never deleted; a number taken out of rotation is `retired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NumberStatus {
    Free,
    Assigned,
    Retired,
}

/// Database request for inserting a number into the pool
#[derive(Debug, Clone)]
pub struct NumberCreateDBRequest {
    pub phone: String,
    pub access_token: String,
}

/// Database response for a number
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NumberDBResponse {
    pub id: NumberId,
    pub phone: String,
    pub access_token: String,
    pub status: NumberStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
