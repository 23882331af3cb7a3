//! Lease allocation: match a credit-holding user to a free number.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use crate::db::errors::DbError;
use crate::db::handlers::{Assignments, Credits, Numbers, Users};
use crate::db::models::assignments::AssignmentCreateDBRequest;
use crate::db::models::credits::CreditTransactionCreateDBRequest;
use crate::engine::LEASE_COST_CREDITS;
use crate::errors::{Error, Result};
use crate::types::{AssignmentId, UserId};

/// What a successful allocation hands back to the transport.
#[derive(Debug, Clone)]
pub struct AllocationReceipt {
    pub assignment_id: AssignmentId,
    pub phone: String,
    pub balance: i64,
}

/// Lease a free number to the given user, debiting one credit.
///
/// The user record is resolved (or created, on first contact) up front and
/// survives a failed attempt; the debit, the pool claim, the new lease and
/// its ledger entry commit together or not at all. A conflict with a
/// concurrent contender is retried once against the updated pool state.
#[instrument(skip(pool), err)]
pub async fn allocate(pool: &SqlitePool, user_external_id: &str, handle: Option<&str>) -> Result<AllocationReceipt> {
    let user = {
        let mut tx = pool.begin().await.map_err(DbError::from)?;
        let user = Users::new(&mut tx).get_or_create(user_external_id, handle).await?;
        tx.commit().await.map_err(DbError::from)?;
        user
    };

    match try_allocate(pool, user.id).await {
        Err(Error::Database(db_err)) if db_err.is_retryable() => {
            debug!(user_id = user.id, "allocation lost a write race, retrying once");
            try_allocate(pool, user.id).await
        }
        other => other,
    }
}

async fn try_allocate(pool: &SqlitePool, user_id: UserId) -> Result<AllocationReceipt> {
    let mut tx = pool.begin().await.map_err(DbError::from)?;

    // Debit first: the guarded update both checks the precondition and takes
    // the write lock that serializes contenders for the pool.
    let balance = Users::new(&mut tx)
        .adjust_credits(user_id, -LEASE_COST_CREDITS)
        .await?
        .ok_or(Error::InsufficientCredits)?;

    let number = Numbers::new(&mut tx)
        .claim_free()
        .await?
        .ok_or(Error::NoResourceAvailable)?;

    let assignment = Assignments::new(&mut tx)
        .create(&AssignmentCreateDBRequest {
            user_id,
            number_id: number.id,
            assigned_at: Utc::now(),
        })
        .await?;

    Credits::new(&mut tx)
        .create_transaction(&CreditTransactionCreateDBRequest::lease_debit(
            user_id,
            assignment.id,
            LEASE_COST_CREDITS,
        ))
        .await?;

    tx.commit().await.map_err(DbError::from)?;

    Ok(AllocationReceipt {
        assignment_id: assignment.id,
        phone: number.phone,
        balance,
    })
}
