//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::db::handlers::{Assignments, Credits, Numbers, Users};
use crate::db::models::assignments::AssignmentDBResponse;
use crate::db::models::credits::{CreditTransactionCreateDBRequest, TransactionReason};
use crate::db::models::numbers::{NumberCreateDBRequest, NumberDBResponse, NumberStatus};
use crate::db::models::users::{UserCreateDBRequest, UserDBResponse};
use crate::provider::{CodeProvider, ProviderError};
use crate::types::{AssignmentId, UserId};

/// Create a user, optionally with a starting balance. The balance is seeded
/// through the ledger so the reconciliation invariant holds from the start.
pub(crate) async fn seed_user(
    pool: &SqlitePool,
    external_id: &str,
    handle: Option<&str>,
    credits: i64,
    is_admin: bool,
) -> UserDBResponse {
    let mut tx = pool.begin().await.expect("begin");
    let mut users = Users::new(&mut tx);
    let mut user = if is_admin {
        users.ensure_admin(external_id, handle).await.expect("create admin")
    } else {
        users
            .create(&UserCreateDBRequest::first_contact(external_id, handle))
            .await
            .expect("create user")
    };
    if credits != 0 {
        users.set_credits(user.id, credits).await.expect("seed balance");
        Credits::new(&mut tx)
            .create_transaction(&CreditTransactionCreateDBRequest::admin_entry(
                user.id,
                credits,
                TransactionReason::AdminGrant,
                "seed",
            ))
            .await
            .expect("seed ledger entry");
        user.credits = credits;
    }
    tx.commit().await.expect("commit");
    user
}

pub(crate) async fn seed_number(pool: &SqlitePool, phone: &str, access_token: &str) -> NumberDBResponse {
    let mut tx = pool.begin().await.expect("begin");
    let number = Numbers::new(&mut tx)
        .create(&NumberCreateDBRequest {
            phone: phone.to_string(),
            access_token: access_token.to_string(),
        })
        .await
        .expect("insert number")
        .expect("number not duplicated");
    tx.commit().await.expect("commit");
    number
}

pub(crate) async fn get_user(pool: &SqlitePool, id: UserId) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("acquire");
    Users::new(&mut conn)
        .get_by_id(id)
        .await
        .expect("query user")
        .expect("user exists")
}

pub(crate) async fn get_assignment(pool: &SqlitePool, id: AssignmentId) -> AssignmentDBResponse {
    let mut conn = pool.acquire().await.expect("acquire");
    Assignments::new(&mut conn)
        .get_by_id(id)
        .await
        .expect("query assignment")
        .expect("assignment exists")
}

pub(crate) async fn ledger_sum(pool: &SqlitePool, user_id: UserId) -> i64 {
    let mut conn = pool.acquire().await.expect("acquire");
    Credits::new(&mut conn).sum_deltas(user_id).await.expect("sum ledger")
}

pub(crate) async fn count_free_numbers(pool: &SqlitePool) -> i64 {
    let mut conn = pool.acquire().await.expect("acquire");
    Numbers::new(&mut conn)
        .count_by_status(NumberStatus::Free)
        .await
        .expect("count free")
}

/// Asserts the reconciliation invariant for one user.
pub(crate) async fn assert_reconciled(pool: &SqlitePool, user_id: UserId) {
    let user = get_user(pool, user_id).await;
    let sum = ledger_sum(pool, user_id).await;
    assert_eq!(
        user.credits, sum,
        "balance {} does not reconcile against ledger sum {}",
        user.credits, sum
    );
}

/// Canned delivery provider for engine tests.
pub(crate) struct StaticProvider {
    code: Option<String>,
    fail: bool,
    pub calls: AtomicUsize,
}

impl StaticProvider {
    pub fn with_code(code: &str) -> Self {
        Self {
            code: Some(code.to_string()),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self {
            code: None,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            code: None,
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CodeProvider for StaticProvider {
    async fn fetch_code(&self, _access_token: &str) -> Result<Option<String>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::Status(reqwest::StatusCode::BAD_GATEWAY));
        }
        Ok(self.code.clone())
    }
}
