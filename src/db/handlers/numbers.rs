//! Database repository for the number pool.

use crate::db::{
    errors::Result,
    models::numbers::{NumberCreateDBRequest, NumberDBResponse, NumberStatus},
};
use crate::types::NumberId;
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::instrument;

pub struct Numbers<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Numbers<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Insert a number into the pool as `free`. Returns `None` when the phone
    /// or access token already exists (duplicate imports are skipped, matching
    /// the import tooling contract).
    #[instrument(skip(self, request), fields(phone = %request.phone), err)]
    pub async fn create(&mut self, request: &NumberCreateDBRequest) -> Result<Option<NumberDBResponse>> {
        let now = Utc::now();
        let number = sqlx::query_as::<_, NumberDBResponse>(
            r#"
            INSERT INTO numbers (phone, access_token, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ON CONFLICT DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&request.phone)
        .bind(&request.access_token)
        .bind(NumberStatus::Free)
        .bind(now)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(number)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: NumberId) -> Result<Option<NumberDBResponse>> {
        let number = sqlx::query_as::<_, NumberDBResponse>("SELECT * FROM numbers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(number)
    }

    /// Atomically claim one free number, flipping it to `assigned`.
    ///
    /// Lowest id wins the tie-break; the selection policy is "any free
    /// number", the ordering just makes tests reproducible. Returns `None`
    /// when the pool is exhausted.
    #[instrument(skip(self), err)]
    pub async fn claim_free(&mut self) -> Result<Option<NumberDBResponse>> {
        let number = sqlx::query_as::<_, NumberDBResponse>(
            r#"
            UPDATE numbers
            SET status = ?1, updated_at = ?2
            WHERE id = (SELECT id FROM numbers WHERE status = ?3 ORDER BY id LIMIT 1)
            RETURNING *
            "#,
        )
        .bind(NumberStatus::Assigned)
        .bind(Utc::now())
        .bind(NumberStatus::Free)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(number)
    }

    #[instrument(skip(self), err)]
    pub async fn set_status(&mut self, id: NumberId, status: NumberStatus) -> Result<()> {
        sqlx::query("UPDATE numbers SET status = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(status)
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }

    /// Retire a number that is currently free. Returns `false` when the
    /// number is assigned or already retired (a live lease cannot have its
    /// number pulled out from under it).
    #[instrument(skip(self), err)]
    pub async fn retire_free(&mut self, id: NumberId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE numbers SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        )
        .bind(NumberStatus::Retired)
        .bind(Utc::now())
        .bind(id)
        .bind(NumberStatus::Free)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    pub async fn list(&mut self) -> Result<Vec<NumberDBResponse>> {
        let numbers = sqlx::query_as::<_, NumberDBResponse>("SELECT * FROM numbers ORDER BY id")
            .fetch_all(&mut *self.db)
            .await?;

        Ok(numbers)
    }

    #[instrument(skip(self), err)]
    pub async fn count_by_status(&mut self, status: NumberStatus) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM numbers WHERE status = ?1")
            .bind(status)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }
}
