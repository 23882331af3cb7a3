//! Database repository for the credit ledger.
//!
//! The ledger is strictly append-only; there are no update or delete
//! operations here on purpose. The reconciliation invariant (a user's
//! balance equals the sum of their deltas) is what the engine's transactions
//! preserve, and [`Credits::sum_deltas`] is how tests and audits check it.

use crate::db::{
    errors::Result,
    models::credits::{CreditTransactionCreateDBRequest, CreditTransactionDBResponse},
};
use crate::types::UserId;
use chrono::Utc;
use sqlx::SqliteConnection;
use sqlx::types::Json;
use tracing::instrument;

pub struct Credits<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Credits<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Append a ledger entry.
    #[instrument(skip(self, request), fields(user_id = request.user_id, delta = request.delta), err)]
    pub async fn create_transaction(&mut self, request: &CreditTransactionCreateDBRequest) -> Result<CreditTransactionDBResponse> {
        let transaction = sqlx::query_as::<_, CreditTransactionDBResponse>(
            r#"
            INSERT INTO credit_transactions (user_id, delta, reason, ref_assignment_id, meta, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(request.delta)
        .bind(request.reason)
        .bind(request.ref_assignment_id)
        .bind(request.meta.clone().map(Json))
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(transaction)
    }

    /// List a user's ledger entries, newest first, with pagination.
    #[instrument(skip(self), err)]
    pub async fn list_user_transactions(&mut self, user_id: UserId, skip: i64, limit: i64) -> Result<Vec<CreditTransactionDBResponse>> {
        let transactions = sqlx::query_as::<_, CreditTransactionDBResponse>(
            r#"
            SELECT * FROM credit_transactions
            WHERE user_id = ?1
            ORDER BY id DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(transactions)
    }

    /// Sum of all signed deltas for a user. Always equal to the user's
    /// balance when the engine's invariants hold.
    #[instrument(skip(self), err)]
    pub async fn sum_deltas(&mut self, user_id: UserId) -> Result<i64> {
        let sum = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(delta), 0) FROM credit_transactions WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(sum)
    }
}
