//! Read-side operations: balances, live leases, ledger history.

use sqlx::SqlitePool;
use tracing::instrument;

use crate::db::errors::DbError;
use crate::db::handlers::{Assignments, Credits, Users};
use crate::db::models::assignments::ActiveLeaseDBResponse;
use crate::db::models::credits::CreditTransactionDBResponse;
use crate::db::models::users::UserDBResponse;
use crate::errors::{Error, Result};

/// Resolve a user by external identity, creating the record on first contact.
/// This is what the transport's entry command calls.
#[instrument(skip(pool), err)]
pub async fn ensure_user(pool: &SqlitePool, external_id: &str, handle: Option<&str>) -> Result<UserDBResponse> {
    let mut tx = pool.begin().await.map_err(DbError::from)?;
    let user = Users::new(&mut tx).get_or_create(external_id, handle).await?;
    tx.commit().await.map_err(DbError::from)?;
    Ok(user)
}

/// Current balance for a known user. First contact is not implied here: a
/// user who has never interacted is reported as not found.
#[instrument(skip(pool), err)]
pub async fn get_balance(pool: &SqlitePool, external_id: &str) -> Result<UserDBResponse> {
    let mut conn = pool.acquire().await.map_err(DbError::from)?;
    Users::new(&mut conn)
        .get_by_external_id(external_id)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            reference: external_id.to_string(),
        })
}

/// All live leases for a user, joined with their numbers.
#[instrument(skip(pool), err)]
pub async fn list_active_leases(pool: &SqlitePool, external_id: &str) -> Result<Vec<ActiveLeaseDBResponse>> {
    let mut conn = pool.acquire().await.map_err(DbError::from)?;
    let user = Users::new(&mut conn)
        .get_by_external_id(external_id)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            reference: external_id.to_string(),
        })?;
    let leases = Assignments::new(&mut conn).list_active_for_user(user.id).await?;
    Ok(leases)
}

/// A user's ledger, newest first.
#[instrument(skip(pool), err)]
pub async fn list_transactions(
    pool: &SqlitePool,
    external_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<CreditTransactionDBResponse>> {
    let mut conn = pool.acquire().await.map_err(DbError::from)?;
    let user = Users::new(&mut conn)
        .get_by_external_id(external_id)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            reference: external_id.to_string(),
        })?;
    let transactions = Credits::new(&mut conn)
        .list_user_transactions(user.id, skip, limit)
        .await?;
    Ok(transactions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::allocation::allocate;
    use crate::engine::rate_limit::RateLimiter;
    use crate::test_utils::*;
    use std::time::Duration;

    #[sqlx::test]
    #[test_log::test]
    async fn ensure_user_is_idempotent(pool: SqlitePool) {
        let first = ensure_user(&pool, "tg-100", Some("alice")).await.unwrap();
        let second = ensure_user(&pool, "tg-100", Some("renamed")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.handle.as_deref(), Some("alice"));
        assert_eq!(second.credits, 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn balance_of_unknown_user_is_not_found(pool: SqlitePool) {
        let result = get_balance(&pool, "tg-404").await;
        assert!(matches!(result, Err(Error::UserNotFound { .. })));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn active_leases_carry_code_state(pool: SqlitePool) {
        seed_user(&pool, "tg-100", None, 2, false).await;
        seed_number(&pool, "+15550000001", "tok-1").await;
        seed_number(&pool, "+15550000002", "tok-2").await;

        let first = allocate(&pool, "tg-100", None).await.unwrap();
        allocate(&pool, "tg-100", None).await.unwrap();

        let provider = StaticProvider::with_code("483920");
        crate::engine::delivery::fetch_code(
            &pool,
            &provider,
            &RateLimiter::new(Duration::ZERO),
            first.assignment_id,
            "tg-100",
        )
        .await
        .unwrap();

        let leases = list_active_leases(&pool, "tg-100").await.unwrap();
        assert_eq!(leases.len(), 2);
        let locked = leases.iter().find(|l| l.assignment_id == first.assignment_id).unwrap();
        assert_eq!(locked.last_code.as_deref(), Some("483920"));
        assert!(locked.code_fetched_at.is_some());
        let open = leases.iter().find(|l| l.assignment_id != first.assignment_id).unwrap();
        assert!(open.code_fetched_at.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn transactions_list_newest_first(pool: SqlitePool) {
        let user = seed_user(&pool, "tg-100", None, 3, false).await;
        seed_number(&pool, "+15550000001", "tok-1").await;
        allocate(&pool, "tg-100", None).await.unwrap();

        let transactions = list_transactions(&pool, "tg-100", 0, 10).await.unwrap();
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].delta, -1);
        assert_eq!(transactions[1].delta, 3);
        assert!(transactions.iter().all(|t| t.user_id == user.id));

        // Pagination slices the same ordering.
        let page = list_transactions(&pool, "tg-100", 1, 10).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].delta, 3);
    }
}
