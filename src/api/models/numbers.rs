//! API request/response models for pool inventory.
//!
//! Access tokens are provider credentials; they are accepted on import and
//! never echoed back in any response.

use crate::db::models::numbers::{NumberCreateDBRequest, NumberDBResponse, NumberStatus};
use crate::engine::admin::ImportOutcome;
use crate::types::NumberId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct NumberImportEntry {
    pub phone: String,
    pub access_token: String,
}

impl From<&NumberImportEntry> for NumberCreateDBRequest {
    fn from(entry: &NumberImportEntry) -> Self {
        Self {
            phone: entry.phone.clone(),
            access_token: entry.access_token.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NumbersImport {
    pub admin_external_id: String,
    pub numbers: Vec<NumberImportEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumberResponse {
    pub id: NumberId,
    pub phone: String,
    pub status: NumberStatus,
    pub created_at: DateTime<Utc>,
}

impl From<NumberDBResponse> for NumberResponse {
    fn from(number: NumberDBResponse) -> Self {
        Self {
            id: number.id,
            phone: number.phone,
            status: number.status,
            created_at: number.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumbersImportResponse {
    pub imported: Vec<NumberResponse>,
    pub skipped: Vec<String>,
}

impl From<ImportOutcome> for NumbersImportResponse {
    fn from(outcome: ImportOutcome) -> Self {
        Self {
            imported: outcome.imported.into_iter().map(NumberResponse::from).collect(),
            skipped: outcome.skipped,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetireRequest {
    pub admin_external_id: String,
}

/// Query identity for admin GET endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct AdminQuery {
    pub admin: String,
}
