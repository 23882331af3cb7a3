//! Lease release: reverse an allocation before any code was delivered.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, instrument, warn};

use crate::db::errors::DbError;
use crate::db::handlers::{Assignments, Credits, Numbers, Users};
use crate::db::models::assignments::{ArchivedAssignmentDBRequest, AssignmentState};
use crate::db::models::credits::CreditTransactionCreateDBRequest;
use crate::db::models::numbers::NumberStatus;
use crate::engine::LEASE_COST_CREDITS;
use crate::errors::{Error, Result};
use crate::types::AssignmentId;

#[derive(Debug, Clone)]
pub struct RefundReceipt {
    pub assignment_id: AssignmentId,
    pub phone: String,
    pub refunded: i64,
    pub balance: i64,
}

/// Release a live lease, refunding the credit and returning the number to
/// the pool.
///
/// Refusal and refund are decided inside the same transaction that applies
/// the mutation, so a release racing a code fetch on the same lease resolves
/// to exactly one of "refunded" or "non-refundable". After commit the
/// terminal lease is copied to the archive, best-effort.
#[instrument(skip(pool), err)]
pub async fn release(pool: &SqlitePool, assignment_id: AssignmentId) -> Result<RefundReceipt> {
    let receipt = match try_release(pool, assignment_id).await {
        Err(Error::Database(db_err)) if db_err.is_retryable() => {
            debug!(assignment_id, "release lost a write race, retrying once");
            try_release(pool, assignment_id).await
        }
        other => other,
    }?;

    if let Err(error) = archive_released(pool, assignment_id).await {
        warn!(assignment_id, "failed to archive released lease: {error:#}");
    }

    Ok(receipt)
}

async fn try_release(pool: &SqlitePool, assignment_id: AssignmentId) -> Result<RefundReceipt> {
    let mut tx = pool.begin().await.map_err(DbError::from)?;

    let assignment = Assignments::new(&mut tx)
        .get_by_id(assignment_id)
        .await?
        .ok_or(Error::AssignmentNotFound { id: assignment_id })?;

    match assignment.state() {
        AssignmentState::Released => return Err(Error::AssignmentNotFound { id: assignment_id }),
        AssignmentState::CodeLocked => return Err(Error::NotRefundable { id: assignment_id }),
        AssignmentState::Active => {}
    }

    // The guard re-checks refundability at write time; losing it here means a
    // concurrent code fetch committed after our read.
    let released = Assignments::new(&mut tx)
        .release_guarded(assignment_id, Utc::now())
        .await?;
    if !released {
        return Err(Error::NotRefundable { id: assignment_id });
    }

    let number = Numbers::new(&mut tx)
        .get_by_id(assignment.number_id)
        .await?
        .ok_or(Error::NumberNotFound {
            id: assignment.number_id,
        })?;
    Numbers::new(&mut tx)
        .set_status(number.id, NumberStatus::Free)
        .await?;

    let balance = Users::new(&mut tx)
        .adjust_credits(assignment.user_id, LEASE_COST_CREDITS)
        .await?
        .ok_or_else(|| Error::Other(anyhow::anyhow!("refund rejected by balance guard")))?;

    Credits::new(&mut tx)
        .create_transaction(&CreditTransactionCreateDBRequest::release_refund(
            assignment.user_id,
            assignment_id,
            LEASE_COST_CREDITS,
        ))
        .await?;

    tx.commit().await.map_err(DbError::from)?;

    Ok(RefundReceipt {
        assignment_id,
        phone: number.phone,
        refunded: LEASE_COST_CREDITS,
        balance,
    })
}

/// Copy the now-terminal lease into the archive table. Runs outside the
/// release transaction; live operations never read the archive, so a failure
/// here is logged by the caller and otherwise ignored.
async fn archive_released(pool: &SqlitePool, assignment_id: AssignmentId) -> Result<()> {
    let mut conn = pool.acquire().await.map_err(DbError::from)?;

    let Some(assignment) = Assignments::new(&mut conn).get_by_id(assignment_id).await? else {
        return Ok(());
    };
    let Some(released_at) = assignment.released_at else {
        return Ok(());
    };

    Assignments::new(&mut conn)
        .archive(&ArchivedAssignmentDBRequest {
            id: assignment.id,
            user_id: assignment.user_id,
            number_id: assignment.number_id,
            assigned_at: assignment.assigned_at,
            released_at,
            code_fetched_at: assignment.code_fetched_at,
            last_code: assignment.last_code,
        })
        .await?;

    Ok(())
}
