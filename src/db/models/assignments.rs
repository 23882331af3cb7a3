//! Database models for lease assignments.

use crate::types::{AssignmentId, NumberId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Explicit lease lifecycle state.
///
/// The table stores the lifecycle as nullable timestamps; this enum is the
/// single place that interpretation happens. Transition rules:
///
/// - `Active` may move to `CodeLocked` (a code was delivered) or `Released`
///   (refunded before any code).
/// - `CodeLocked` is terminal with respect to release: the lease can never be
///   refunded once a code has been consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentState {
    Active,
    CodeLocked,
    Released,
}

/// Database request for creating a lease assignment
#[derive(Debug, Clone)]
pub struct AssignmentCreateDBRequest {
    pub user_id: UserId,
    pub number_id: NumberId,
    pub assigned_at: DateTime<Utc>,
}

/// Database response for a lease assignment
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssignmentDBResponse {
    pub id: AssignmentId,
    pub user_id: UserId,
    pub number_id: NumberId,
    pub assigned_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
    pub code_fetched_at: Option<DateTime<Utc>>,
    pub last_code: Option<String>,
    pub active: bool,
}

impl AssignmentDBResponse {
    pub fn state(&self) -> AssignmentState {
        if !self.active {
            AssignmentState::Released
        } else if self.code_fetched_at.is_some() {
            AssignmentState::CodeLocked
        } else {
            AssignmentState::Active
        }
    }
}

/// Joined row for listing a user's live leases with their numbers
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActiveLeaseDBResponse {
    pub assignment_id: AssignmentId,
    pub number_id: NumberId,
    pub phone: String,
    pub assigned_at: DateTime<Utc>,
    pub code_fetched_at: Option<DateTime<Utc>>,
    pub last_code: Option<String>,
}

/// Row shape for the terminal-lease archive
#[derive(Debug, Clone)]
pub struct ArchivedAssignmentDBRequest {
    pub id: AssignmentId,
    pub user_id: UserId,
    pub number_id: NumberId,
    pub assigned_at: DateTime<Utc>,
    pub released_at: DateTime<Utc>,
    pub code_fetched_at: Option<DateTime<Utc>>,
    pub last_code: Option<String>,
}
