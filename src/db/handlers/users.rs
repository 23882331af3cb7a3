//! Database repository for users.

use crate::db::{
    errors::Result,
    models::users::{UserCreateDBRequest, UserDBResponse},
};
use crate::types::UserId;
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::instrument;

pub struct Users<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(external_id = %request.external_id), err)]
    pub async fn create(&mut self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, UserDBResponse>(
            r#"
            INSERT INTO users (external_id, handle, is_admin, credits, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            RETURNING *
            "#,
        )
        .bind(&request.external_id)
        .bind(&request.handle)
        .bind(request.is_admin)
        .bind(request.credits)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: UserId) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_external_id(&mut self, external_id: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE external_id = ?1")
            .bind(external_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_handle(&mut self, handle: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE handle = ?1")
            .bind(handle)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }

    /// Resolve a user by external identity, creating the record on first
    /// contact with zero balance and no privileges.
    #[instrument(skip(self), err)]
    pub async fn get_or_create(&mut self, external_id: &str, handle: Option<&str>) -> Result<UserDBResponse> {
        if let Some(user) = self.get_by_external_id(external_id).await? {
            return Ok(user);
        }
        self.create(&UserCreateDBRequest::first_contact(external_id, handle)).await
    }

    /// Apply a signed credit delta, guarded so the balance never goes
    /// negative. Returns the new balance, or `None` when the guard rejected
    /// the update (insufficient credits for the debit).
    #[instrument(skip(self), err)]
    pub async fn adjust_credits(&mut self, id: UserId, delta: i64) -> Result<Option<i64>> {
        let balance = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE users
            SET credits = credits + ?1, updated_at = ?2
            WHERE id = ?3 AND credits + ?1 >= 0
            RETURNING credits
            "#,
        )
        .bind(delta)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(balance)
    }

    /// Overwrite the balance. The caller is responsible for having appended a
    /// matching ledger entry in the same transaction.
    #[instrument(skip(self), err)]
    pub async fn set_credits(&mut self, id: UserId, credits: i64) -> Result<()> {
        sqlx::query("UPDATE users SET credits = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(credits)
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }

    /// Idempotently create-or-promote an operator account. Used at startup to
    /// seed the configured administrator.
    #[instrument(skip(self), err)]
    pub async fn ensure_admin(&mut self, external_id: &str, handle: Option<&str>) -> Result<UserDBResponse> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, UserDBResponse>(
            r#"
            INSERT INTO users (external_id, handle, is_admin, credits, created_at, updated_at)
            VALUES (?1, ?2, TRUE, 0, ?3, ?3)
            ON CONFLICT (external_id) DO UPDATE SET is_admin = TRUE, updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(external_id)
        .bind(handle)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(user)
    }
}
