//! Code delivery: fetch a one-time code for a lease and lock it against
//! refund.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, instrument, warn};

use crate::db::errors::DbError;
use crate::db::handlers::{Assignments, Numbers};
use crate::db::models::assignments::AssignmentState;
use crate::engine::rate_limit::RateLimiter;
use crate::errors::{Error, Result};
use crate::provider::CodeProvider;
use crate::types::AssignmentId;

#[derive(Debug, Clone)]
pub struct CodeDelivery {
    pub assignment_id: AssignmentId,
    pub phone: String,
    pub code: String,
}

/// Fetch the current verification code for a lease.
///
/// The cooldown check happens first and records the attempt regardless of
/// outcome. The provider call runs outside any transaction with a bounded
/// timeout; only a non-empty code mutates state. That mutation, `last_code`
/// plus the one-shot `code_fetched_at` lock, is committed on a spawned task,
/// because once the provider has handed the SMS over it is consumed: a caller
/// abandoning the request must not be able to cancel the commit.
#[instrument(skip(pool, provider, limiter), err)]
pub async fn fetch_code(
    pool: &SqlitePool,
    provider: &dyn CodeProvider,
    limiter: &RateLimiter,
    assignment_id: AssignmentId,
    user_external_id: &str,
) -> Result<CodeDelivery> {
    limiter
        .check_and_update(user_external_id)
        .map_err(|retry_after_secs| Error::RateLimited { retry_after_secs })?;

    let number = {
        let mut conn = pool.acquire().await.map_err(DbError::from)?;
        let assignment = Assignments::new(&mut conn)
            .get_by_id(assignment_id)
            .await?
            .ok_or(Error::AssignmentNotFound { id: assignment_id })?;
        if assignment.state() == AssignmentState::Released {
            return Err(Error::AssignmentNotFound { id: assignment_id });
        }
        Numbers::new(&mut conn)
            .get_by_id(assignment.number_id)
            .await?
            .ok_or(Error::NumberNotFound {
                id: assignment.number_id,
            })?
    };

    let code = provider
        .fetch_code(&number.access_token)
        .await
        .map_err(|error| {
            warn!(assignment_id, "provider call failed: {error}");
            Error::DeliveryUnavailable {
                reason: error.to_string(),
            }
        })?
        .ok_or(Error::NoCodeAvailable)?;

    let commit_pool = pool.clone();
    let commit_code = code.clone();
    let commit = tokio::spawn(async move { record_code(&commit_pool, assignment_id, &commit_code).await });
    match commit.await {
        Ok(result) => result?,
        Err(join_error) => {
            return Err(Error::Other(anyhow::anyhow!(
                "code commit task failed: {join_error}"
            )));
        }
    }

    Ok(CodeDelivery {
        assignment_id,
        phone: number.phone,
        code,
    })
}

async fn record_code(pool: &SqlitePool, assignment_id: AssignmentId, code: &str) -> Result<()> {
    match try_record_code(pool, assignment_id, code).await {
        Err(Error::Database(db_err)) if db_err.is_retryable() => {
            debug!(assignment_id, "code commit lost a write race, retrying once");
            try_record_code(pool, assignment_id, code).await
        }
        other => other,
    }
}

async fn try_record_code(pool: &SqlitePool, assignment_id: AssignmentId, code: &str) -> Result<()> {
    let mut tx = pool.begin().await.map_err(DbError::from)?;

    let recorded = Assignments::new(&mut tx)
        .record_code(assignment_id, code, Utc::now())
        .await?;
    if !recorded {
        // A concurrent release won; the lease is gone.
        return Err(Error::AssignmentNotFound { id: assignment_id });
    }

    tx.commit().await.map_err(DbError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::allocation::allocate;
    use crate::engine::release::release;
    use crate::test_utils::*;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn no_cooldown() -> RateLimiter {
        RateLimiter::new(Duration::ZERO)
    }

    async fn leased_pool(pool: &SqlitePool) -> AssignmentId {
        seed_user(pool, "tg-100", None, 2, false).await;
        seed_number(pool, "+15550000001", "tok-1").await;
        allocate(pool, "tg-100", None).await.unwrap().assignment_id
    }

    #[sqlx::test]
    #[test_log::test]
    async fn delivered_code_is_recorded_and_locks_the_lease(pool: SqlitePool) {
        let assignment_id = leased_pool(&pool).await;
        let provider = StaticProvider::with_code("483920");

        let delivery = fetch_code(&pool, &provider, &no_cooldown(), assignment_id, "tg-100")
            .await
            .unwrap();
        assert_eq!(delivery.code, "483920");
        assert_eq!(delivery.phone, "+15550000001");

        let assignment = get_assignment(&pool, assignment_id).await;
        assert_eq!(assignment.last_code.as_deref(), Some("483920"));
        assert!(assignment.code_fetched_at.is_some());

        let result = release(&pool, assignment_id).await;
        assert!(matches!(result, Err(Error::NotRefundable { .. })));
    }

    // Re-fetching refreshes the code but the lock timestamp is written once.
    #[sqlx::test]
    #[test_log::test]
    async fn refetch_updates_code_without_touching_the_lock(pool: SqlitePool) {
        let assignment_id = leased_pool(&pool).await;

        fetch_code(&pool, &StaticProvider::with_code("111111"), &no_cooldown(), assignment_id, "tg-100")
            .await
            .unwrap();
        let locked_at = get_assignment(&pool, assignment_id)
            .await
            .code_fetched_at
            .unwrap();

        fetch_code(&pool, &StaticProvider::with_code("222222"), &no_cooldown(), assignment_id, "tg-100")
            .await
            .unwrap();

        let assignment = get_assignment(&pool, assignment_id).await;
        assert_eq!(assignment.last_code.as_deref(), Some("222222"));
        assert_eq!(assignment.code_fetched_at, Some(locked_at));

        let result = release(&pool, assignment_id).await;
        assert!(matches!(result, Err(Error::NotRefundable { .. })));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn empty_provider_response_leaves_the_lease_refundable(pool: SqlitePool) {
        let assignment_id = leased_pool(&pool).await;
        let provider = StaticProvider::empty();

        let result = fetch_code(&pool, &provider, &no_cooldown(), assignment_id, "tg-100").await;
        assert!(matches!(result, Err(Error::NoCodeAvailable)));

        let assignment = get_assignment(&pool, assignment_id).await;
        assert!(assignment.code_fetched_at.is_none());
        assert!(assignment.last_code.is_none());

        // Still refundable.
        release(&pool, assignment_id).await.unwrap();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn provider_failure_is_transient_and_mutates_nothing(pool: SqlitePool) {
        let assignment_id = leased_pool(&pool).await;
        let provider = StaticProvider::failing();

        let result = fetch_code(&pool, &provider, &no_cooldown(), assignment_id, "tg-100").await;
        assert!(matches!(result, Err(Error::DeliveryUnavailable { .. })));

        let assignment = get_assignment(&pool, assignment_id).await;
        assert!(assignment.code_fetched_at.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn cooldown_rejects_before_any_work_happens(pool: SqlitePool) {
        let assignment_id = leased_pool(&pool).await;
        let provider = StaticProvider::with_code("483920");
        let limiter = RateLimiter::new(Duration::from_secs(10));

        fetch_code(&pool, &provider, &limiter, assignment_id, "tg-100")
            .await
            .unwrap();

        let result = fetch_code(&pool, &provider, &limiter, assignment_id, "tg-100").await;
        match result {
            Err(Error::RateLimited { retry_after_secs }) => {
                assert!((1..=10).contains(&retry_after_secs));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }

        // The provider was only reached once.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn unknown_or_released_leases_report_not_found(pool: SqlitePool) {
        let assignment_id = leased_pool(&pool).await;
        let provider = StaticProvider::with_code("483920");

        let result = fetch_code(&pool, &provider, &no_cooldown(), 4242, "tg-100").await;
        assert!(matches!(result, Err(Error::AssignmentNotFound { id: 4242 })));

        release(&pool, assignment_id).await.unwrap();
        let result = fetch_code(&pool, &provider, &no_cooldown(), assignment_id, "tg-100").await;
        assert!(matches!(result, Err(Error::AssignmentNotFound { .. })));

        // Neither path consumed a provider call.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }
}
