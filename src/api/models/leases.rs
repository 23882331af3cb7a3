//! API request/response models for leases and code delivery.

use crate::db::models::assignments::ActiveLeaseDBResponse;
use crate::engine::allocation::AllocationReceipt;
use crate::engine::delivery::CodeDelivery;
use crate::engine::release::RefundReceipt;
use crate::types::AssignmentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct LeaseCreate {
    pub user_external_id: String,
    pub handle: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseResponse {
    pub assignment_id: AssignmentId,
    pub phone: String,
    pub balance: i64,
}

impl From<AllocationReceipt> for LeaseResponse {
    fn from(receipt: AllocationReceipt) -> Self {
        Self {
            assignment_id: receipt.assignment_id,
            phone: receipt.phone,
            balance: receipt.balance,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseResponse {
    pub assignment_id: AssignmentId,
    pub phone: String,
    pub refunded: i64,
    pub balance: i64,
}

impl From<RefundReceipt> for ReleaseResponse {
    fn from(receipt: RefundReceipt) -> Self {
        Self {
            assignment_id: receipt.assignment_id,
            phone: receipt.phone,
            refunded: receipt.refunded,
            balance: receipt.balance,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeRequest {
    pub user_external_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeResponse {
    pub assignment_id: AssignmentId,
    pub phone: String,
    pub code: String,
}

impl From<CodeDelivery> for CodeResponse {
    fn from(delivery: CodeDelivery) -> Self {
        Self {
            assignment_id: delivery.assignment_id,
            phone: delivery.phone,
            code: delivery.code,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveLeaseResponse {
    pub assignment_id: AssignmentId,
    pub phone: String,
    pub assigned_at: DateTime<Utc>,
    pub last_code: Option<String>,
    /// Whether a code has been delivered, making the lease non-refundable.
    pub locked: bool,
}

impl From<ActiveLeaseDBResponse> for ActiveLeaseResponse {
    fn from(lease: ActiveLeaseDBResponse) -> Self {
        Self {
            assignment_id: lease.assignment_id,
            phone: lease.phone,
            assigned_at: lease.assigned_at,
            locked: lease.code_fetched_at.is_some(),
            last_code: lease.last_code,
        }
    }
}
