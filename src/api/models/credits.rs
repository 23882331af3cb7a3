//! API request/response models for ledger operations.

use crate::db::models::credits::{CreditTransactionDBResponse, TransactionReason};
use crate::engine::admin::LedgerReceipt;
use crate::types::{AssignmentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operator request to add (or, negative, remove) credits
#[derive(Debug, Clone, Deserialize)]
pub struct GrantCreate {
    pub admin_external_id: String,
    /// `@handle` or an opaque external id
    pub target: String,
    pub amount: i64,
}

/// Operator request to set a balance to an exact value
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceSet {
    pub admin_external_id: String,
    pub target: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerReceiptResponse {
    pub user_id: UserId,
    pub external_id: String,
    pub handle: Option<String>,
    pub delta: i64,
    pub balance: i64,
}

impl From<LedgerReceipt> for LedgerReceiptResponse {
    fn from(receipt: LedgerReceipt) -> Self {
        Self {
            user_id: receipt.user_id,
            external_id: receipt.external_id,
            handle: receipt.handle,
            delta: receipt.delta,
            balance: receipt.balance,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub id: i64,
    pub delta: i64,
    pub reason: TransactionReason,
    pub ref_assignment_id: Option<AssignmentId>,
    pub meta: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl From<CreditTransactionDBResponse> for TransactionResponse {
    fn from(tx: CreditTransactionDBResponse) -> Self {
        Self {
            id: tx.id,
            delta: tx.delta,
            reason: tx.reason,
            ref_assignment_id: tx.ref_assignment_id,
            meta: tx.meta.map(|json| json.0),
            created_at: tx.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionListResponse {
    pub data: Vec<TransactionResponse>,
    pub skip: i64,
    pub limit: i64,
}
