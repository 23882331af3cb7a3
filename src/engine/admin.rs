//! Operator-only ledger and inventory operations.
//!
//! All operations here authenticate the acting user against the `is_admin`
//! flag inside the same transaction that applies the change. How a user
//! becomes an administrator is outside the engine (see
//! [`crate::seed_admin_user`]).

use std::fmt;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::instrument;

use crate::db::errors::DbError;
use crate::db::handlers::{Credits, Numbers, Users};
use crate::db::models::credits::{CreditTransactionCreateDBRequest, TransactionReason};
use crate::db::models::numbers::{NumberCreateDBRequest, NumberDBResponse, NumberStatus};
use crate::db::models::users::UserDBResponse;
use crate::errors::{Error, Result};
use crate::types::{NumberId, UserId};

/// How an operator names a target user: `@handle` resolves the display
/// handle, anything else the opaque external id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRef {
    Handle(String),
    ExternalId(String),
}

impl TargetRef {
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('@') {
            Some(handle) => TargetRef::Handle(handle.to_string()),
            None => TargetRef::ExternalId(raw.to_string()),
        }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRef::Handle(handle) => write!(f, "@{handle}"),
            TargetRef::ExternalId(external_id) => write!(f, "{external_id}"),
        }
    }
}

/// Outcome of a grant or set-balance operation.
#[derive(Debug, Clone)]
pub struct LedgerReceipt {
    pub user_id: UserId,
    pub external_id: String,
    pub handle: Option<String>,
    pub delta: i64,
    pub balance: i64,
}

/// Outcome of a bulk number import: what went in, what was already there.
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub imported: Vec<NumberDBResponse>,
    pub skipped: Vec<String>,
}

async fn require_admin(db: &mut SqliteConnection, admin_external_id: &str) -> Result<UserDBResponse> {
    match Users::new(db).get_by_external_id(admin_external_id).await? {
        Some(user) if user.is_admin => Ok(user),
        _ => Err(Error::Unauthorized),
    }
}

async fn resolve_target(db: &mut SqliteConnection, target: &TargetRef) -> Result<UserDBResponse> {
    let user = match target {
        TargetRef::Handle(handle) => Users::new(db).get_by_handle(handle).await?,
        TargetRef::ExternalId(external_id) => Users::new(db).get_by_external_id(external_id).await?,
    };
    user.ok_or_else(|| Error::UserNotFound {
        reference: target.to_string(),
    })
}

/// Add `amount` credits (any sign) to the target's balance.
///
/// A negative grant that would overdraw the balance is rejected whole; the
/// ledger never records an entry the balance cannot absorb.
#[instrument(skip(pool), err)]
pub async fn grant(pool: &SqlitePool, admin_external_id: &str, target: &TargetRef, amount: i64) -> Result<LedgerReceipt> {
    let mut tx = pool.begin().await.map_err(DbError::from)?;

    let admin = require_admin(&mut tx, admin_external_id).await?;
    let target_user = resolve_target(&mut tx, target).await?;

    let balance = Users::new(&mut tx)
        .adjust_credits(target_user.id, amount)
        .await?
        .ok_or(Error::InsufficientCredits)?;

    Credits::new(&mut tx)
        .create_transaction(&CreditTransactionCreateDBRequest::admin_entry(
            target_user.id,
            amount,
            TransactionReason::AdminGrant,
            &admin.external_id,
        ))
        .await?;

    tx.commit().await.map_err(DbError::from)?;

    Ok(LedgerReceipt {
        user_id: target_user.id,
        external_id: target_user.external_id,
        handle: target_user.handle,
        delta: amount,
        balance,
    })
}

/// Set the target's balance to exactly `amount`, recording the difference
/// as a single `admin_set_adjust` entry.
#[instrument(skip(pool), err)]
pub async fn set_balance(pool: &SqlitePool, admin_external_id: &str, target: &TargetRef, amount: i64) -> Result<LedgerReceipt> {
    if amount < 0 {
        return Err(Error::BadRequest {
            message: "Balance cannot be set below zero".to_string(),
        });
    }

    let mut tx = pool.begin().await.map_err(DbError::from)?;

    let admin = require_admin(&mut tx, admin_external_id).await?;
    let target_user = resolve_target(&mut tx, target).await?;

    // The delta is computed against the balance read in this transaction, so
    // a concurrent spend cannot desynchronize ledger and balance.
    let delta = amount - target_user.credits;
    Users::new(&mut tx).set_credits(target_user.id, amount).await?;

    Credits::new(&mut tx)
        .create_transaction(&CreditTransactionCreateDBRequest::admin_entry(
            target_user.id,
            delta,
            TransactionReason::AdminSetAdjust,
            &admin.external_id,
        ))
        .await?;

    tx.commit().await.map_err(DbError::from)?;

    Ok(LedgerReceipt {
        user_id: target_user.id,
        external_id: target_user.external_id,
        handle: target_user.handle,
        delta,
        balance: amount,
    })
}

/// Bulk-insert numbers into the pool as `free`, skipping rows whose phone or
/// token already exists.
#[instrument(skip(pool, entries), fields(count = entries.len()), err)]
pub async fn import_numbers(pool: &SqlitePool, admin_external_id: &str, entries: &[NumberCreateDBRequest]) -> Result<ImportOutcome> {
    let mut tx = pool.begin().await.map_err(DbError::from)?;

    require_admin(&mut tx, admin_external_id).await?;

    let mut imported = Vec::new();
    let mut skipped = Vec::new();
    let mut numbers = Numbers::new(&mut tx);
    for entry in entries {
        match numbers.create(entry).await? {
            Some(number) => imported.push(number),
            None => skipped.push(entry.phone.clone()),
        }
    }

    tx.commit().await.map_err(DbError::from)?;

    Ok(ImportOutcome { imported, skipped })
}

/// Inventory listing for operators.
#[instrument(skip(pool), err)]
pub async fn list_numbers(pool: &SqlitePool, admin_external_id: &str) -> Result<Vec<NumberDBResponse>> {
    let mut conn = pool.acquire().await.map_err(DbError::from)?;

    require_admin(&mut conn, admin_external_id).await?;
    let numbers = Numbers::new(&mut conn).list().await?;

    Ok(numbers)
}

/// Take a free number out of rotation. Idempotent for already-retired
/// numbers; a number under a live lease cannot be retired.
#[instrument(skip(pool), err)]
pub async fn retire_number(pool: &SqlitePool, admin_external_id: &str, number_id: NumberId) -> Result<NumberDBResponse> {
    let mut tx = pool.begin().await.map_err(DbError::from)?;

    require_admin(&mut tx, admin_external_id).await?;

    let retired = Numbers::new(&mut tx).retire_free(number_id).await?;
    if !retired {
        let number = Numbers::new(&mut tx)
            .get_by_id(number_id)
            .await?
            .ok_or(Error::NumberNotFound { id: number_id })?;
        return match number.status {
            NumberStatus::Retired => Ok(number),
            _ => Err(Error::BadRequest {
                message: format!("Number {number_id} is currently leased"),
            }),
        };
    }

    let number = Numbers::new(&mut tx)
        .get_by_id(number_id)
        .await?
        .ok_or(Error::NumberNotFound { id: number_id })?;

    tx.commit().await.map_err(DbError::from)?;

    Ok(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::allocation::allocate;
    use crate::engine::release::release;
    use crate::test_utils::*;
    use sqlx::SqlitePool;

    #[sqlx::test]
    #[test_log::test]
    async fn grant_adds_credits_and_a_ledger_entry(pool: SqlitePool) {
        seed_user(&pool, "tg-1", None, 0, true).await;
        let user = seed_user(&pool, "tg-100", None, 0, false).await;

        let receipt = grant(&pool, "tg-1", &TargetRef::parse("tg-100"), 5).await.unwrap();
        assert_eq!(receipt.delta, 5);
        assert_eq!(receipt.balance, 5);

        assert_eq!(get_user(&pool, user.id).await.credits, 5);
        assert_reconciled(&pool, user.id).await;
    }

    #[sqlx::test]
    #[test_log::test]
    async fn grant_resolves_targets_by_handle(pool: SqlitePool) {
        seed_user(&pool, "tg-1", None, 0, true).await;
        let user = seed_user(&pool, "tg-100", Some("alice"), 0, false).await;

        let receipt = grant(&pool, "tg-1", &TargetRef::parse("@alice"), 3).await.unwrap();
        assert_eq!(receipt.user_id, user.id);
        assert_eq!(get_user(&pool, user.id).await.credits, 3);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn negative_grant_cannot_overdraw(pool: SqlitePool) {
        seed_user(&pool, "tg-1", None, 0, true).await;
        let user = seed_user(&pool, "tg-100", None, 2, false).await;

        let ok = grant(&pool, "tg-1", &TargetRef::parse("tg-100"), -1).await.unwrap();
        assert_eq!(ok.balance, 1);

        let result = grant(&pool, "tg-1", &TargetRef::parse("tg-100"), -5).await;
        assert!(matches!(result, Err(Error::InsufficientCredits)));

        // The rejected grant left no ledger entry behind.
        assert_eq!(get_user(&pool, user.id).await.credits, 1);
        assert_reconciled(&pool, user.id).await;
    }

    // Setting a balance of 2 to 5 records a single delta-3 entry.
    #[sqlx::test]
    #[test_log::test]
    async fn set_balance_records_the_difference(pool: SqlitePool) {
        seed_user(&pool, "tg-1", None, 0, true).await;
        let user = seed_user(&pool, "tg-100", None, 2, false).await;

        let receipt = set_balance(&pool, "tg-1", &TargetRef::parse("tg-100"), 5).await.unwrap();
        assert_eq!(receipt.delta, 3);
        assert_eq!(receipt.balance, 5);

        let mut conn = pool.acquire().await.unwrap();
        let transactions = crate::db::handlers::Credits::new(&mut conn)
            .list_user_transactions(user.id, 0, 10)
            .await
            .unwrap();
        drop(conn);
        assert_eq!(transactions[0].delta, 3);
        assert_eq!(transactions[0].reason, TransactionReason::AdminSetAdjust);

        assert_reconciled(&pool, user.id).await;
    }

    #[sqlx::test]
    #[test_log::test]
    async fn set_balance_to_current_value_still_appends_an_entry(pool: SqlitePool) {
        seed_user(&pool, "tg-1", None, 0, true).await;
        let user = seed_user(&pool, "tg-100", None, 2, false).await;

        let receipt = set_balance(&pool, "tg-1", &TargetRef::parse("tg-100"), 2).await.unwrap();
        assert_eq!(receipt.delta, 0);

        assert_reconciled(&pool, user.id).await;
    }

    #[sqlx::test]
    #[test_log::test]
    async fn set_balance_rejects_negative_targets(pool: SqlitePool) {
        seed_user(&pool, "tg-1", None, 0, true).await;
        seed_user(&pool, "tg-100", None, 2, false).await;

        let result = set_balance(&pool, "tg-1", &TargetRef::parse("tg-100"), -1).await;
        assert!(matches!(result, Err(Error::BadRequest { .. })));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn non_admins_are_rejected(pool: SqlitePool) {
        seed_user(&pool, "tg-100", None, 0, false).await;
        seed_user(&pool, "tg-200", None, 0, false).await;

        let result = grant(&pool, "tg-100", &TargetRef::parse("tg-200"), 5).await;
        assert!(matches!(result, Err(Error::Unauthorized)));

        let result = set_balance(&pool, "unknown", &TargetRef::parse("tg-200"), 5).await;
        assert!(matches!(result, Err(Error::Unauthorized)));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn unknown_targets_are_reported(pool: SqlitePool) {
        seed_user(&pool, "tg-1", None, 0, true).await;

        let result = grant(&pool, "tg-1", &TargetRef::parse("@nobody"), 5).await;
        assert!(matches!(result, Err(Error::UserNotFound { .. })));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn import_skips_duplicates(pool: SqlitePool) {
        seed_user(&pool, "tg-1", None, 0, true).await;
        seed_number(&pool, "+15550000001", "tok-1").await;

        let entries = vec![
            NumberCreateDBRequest {
                phone: "+15550000001".to_string(),
                access_token: "tok-other".to_string(),
            },
            NumberCreateDBRequest {
                phone: "+15550000002".to_string(),
                access_token: "tok-2".to_string(),
            },
        ];

        let outcome = import_numbers(&pool, "tg-1", &entries).await.unwrap();
        assert_eq!(outcome.imported.len(), 1);
        assert_eq!(outcome.imported[0].phone, "+15550000002");
        assert_eq!(outcome.skipped, vec!["+15550000001".to_string()]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn retire_only_touches_free_numbers(pool: SqlitePool) {
        seed_user(&pool, "tg-1", None, 0, true).await;
        seed_user(&pool, "tg-100", None, 1, false).await;
        let free = seed_number(&pool, "+15550000001", "tok-1").await;
        seed_number(&pool, "+15550000002", "tok-2").await;

        let retired = retire_number(&pool, "tg-1", free.id).await.unwrap();
        assert_eq!(retired.status, NumberStatus::Retired);
        // Idempotent second retire.
        retire_number(&pool, "tg-1", free.id).await.unwrap();

        // The leased number (lowest free id is now +...2) cannot be retired.
        let lease = allocate(&pool, "tg-100", None).await.unwrap();
        let leased_id = get_assignment(&pool, lease.assignment_id).await.number_id;
        let result = retire_number(&pool, "tg-1", leased_id).await;
        assert!(matches!(result, Err(Error::BadRequest { .. })));

        let result = retire_number(&pool, "tg-1", 4242).await;
        assert!(matches!(result, Err(Error::NumberNotFound { .. })));
    }

    // The invariant survives a mixed sequence of engine operations.
    #[sqlx::test]
    #[test_log::test]
    async fn ledger_stays_reconciled_across_mixed_operations(pool: SqlitePool) {
        seed_user(&pool, "tg-1", None, 0, true).await;
        let user = seed_user(&pool, "tg-100", None, 0, false).await;
        seed_number(&pool, "+15550000001", "tok-1").await;

        grant(&pool, "tg-1", &TargetRef::parse("tg-100"), 4).await.unwrap();
        let lease = allocate(&pool, "tg-100", None).await.unwrap();
        release(&pool, lease.assignment_id).await.unwrap();
        allocate(&pool, "tg-100", None).await.unwrap();
        set_balance(&pool, "tg-1", &TargetRef::parse("tg-100"), 10).await.unwrap();
        grant(&pool, "tg-1", &TargetRef::parse("tg-100"), -2).await.unwrap();

        assert_eq!(get_user(&pool, user.id).await.credits, 8);
        assert_reconciled(&pool, user.id).await;
    }
}
