//! Database models for the credit ledger.

use crate::types::{AssignmentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

/// Ledger entry reason, stored as TEXT in the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionReason {
    Purchase,
    AdminGrant,
    GetAccount,
    RefundRemove,
    AdminSetAdjust,
}

/// Database request for appending a ledger entry
#[derive(Debug, Clone)]
pub struct CreditTransactionCreateDBRequest {
    pub user_id: UserId,
    pub delta: i64,
    pub reason: TransactionReason,
    pub ref_assignment_id: Option<AssignmentId>,
    pub meta: Option<serde_json::Value>,
}

impl CreditTransactionCreateDBRequest {
    /// The debit side of a lease allocation.
    pub fn lease_debit(user_id: UserId, assignment_id: AssignmentId, cost: i64) -> Self {
        Self {
            user_id,
            delta: -cost,
            reason: TransactionReason::GetAccount,
            ref_assignment_id: Some(assignment_id),
            meta: Some(serde_json::json!({ "description": "Deducted for leasing a number" })),
        }
    }

    /// The refund side of releasing a lease before any code was fetched.
    pub fn release_refund(user_id: UserId, assignment_id: AssignmentId, cost: i64) -> Self {
        Self {
            user_id,
            delta: cost,
            reason: TransactionReason::RefundRemove,
            ref_assignment_id: Some(assignment_id),
            meta: Some(serde_json::json!({ "description": "Refund for releasing a number" })),
        }
    }

    /// An operator-issued balance adjustment of either reason.
    pub fn admin_entry(user_id: UserId, delta: i64, reason: TransactionReason, admin_external_id: &str) -> Self {
        Self {
            user_id,
            delta,
            reason,
            ref_assignment_id: None,
            meta: Some(serde_json::json!({ "admin": admin_external_id })),
        }
    }
}

/// Database response for a ledger entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CreditTransactionDBResponse {
    pub id: i64,
    pub user_id: UserId,
    pub delta: i64,
    pub reason: TransactionReason,
    pub ref_assignment_id: Option<AssignmentId>,
    pub meta: Option<Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
}
