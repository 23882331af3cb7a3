//! Database repository for lease assignments and their archive.

use crate::db::{
    errors::Result,
    models::assignments::{
        ActiveLeaseDBResponse, ArchivedAssignmentDBRequest, AssignmentCreateDBRequest,
        AssignmentDBResponse,
    },
};
use crate::types::{AssignmentId, UserId};
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::instrument;

pub struct Assignments<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Assignments<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(user_id = request.user_id, number_id = request.number_id), err)]
    pub async fn create(&mut self, request: &AssignmentCreateDBRequest) -> Result<AssignmentDBResponse> {
        let assignment = sqlx::query_as::<_, AssignmentDBResponse>(
            r#"
            INSERT INTO assignments (user_id, number_id, assigned_at, active)
            VALUES (?1, ?2, ?3, TRUE)
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(request.number_id)
        .bind(request.assigned_at)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(assignment)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: AssignmentId) -> Result<Option<AssignmentDBResponse>> {
        let assignment = sqlx::query_as::<_, AssignmentDBResponse>("SELECT * FROM assignments WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(assignment)
    }

    /// Deactivate a lease, guarded on it still being refundable. Returns
    /// `false` when the lease is already inactive or a code has been fetched
    /// for it; the guard is what serializes a release against a concurrent
    /// code fetch on the same lease.
    #[instrument(skip(self), err)]
    pub async fn release_guarded(&mut self, id: AssignmentId, released_at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE assignments
            SET active = FALSE, released_at = ?1
            WHERE id = ?2 AND active AND code_fetched_at IS NULL
            "#,
        )
        .bind(released_at)
        .bind(id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a delivered code on a live lease. The lock timestamp is only
    /// written the first time; later fetches refresh `last_code` without
    /// touching it. Returns `false` when the lease is no longer active.
    #[instrument(skip(self, code), err)]
    pub async fn record_code(&mut self, id: AssignmentId, code: &str, fetched_at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE assignments
            SET last_code = ?1, code_fetched_at = COALESCE(code_fetched_at, ?2)
            WHERE id = ?3 AND active
            "#,
        )
        .bind(code)
        .bind(fetched_at)
        .bind(id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    pub async fn list_active_for_user(&mut self, user_id: UserId) -> Result<Vec<ActiveLeaseDBResponse>> {
        let leases = sqlx::query_as::<_, ActiveLeaseDBResponse>(
            r#"
            SELECT
                a.id AS assignment_id,
                n.id AS number_id,
                n.phone AS phone,
                a.assigned_at AS assigned_at,
                a.code_fetched_at AS code_fetched_at,
                a.last_code AS last_code
            FROM assignments a
            JOIN numbers n ON n.id = a.number_id
            WHERE a.user_id = ?1 AND a.active
            ORDER BY a.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(leases)
    }

    /// Copy a terminal lease into the archive. Idempotent on the assignment
    /// id so a retried archive pass cannot duplicate rows.
    #[instrument(skip(self, request), fields(assignment_id = request.id), err)]
    pub async fn archive(&mut self, request: &ArchivedAssignmentDBRequest) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO archived_assignments
                (id, user_id, number_id, assigned_at, released_at, code_fetched_at, last_code)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(request.id)
        .bind(request.user_id)
        .bind(request.number_id)
        .bind(request.assigned_at)
        .bind(request.released_at)
        .bind(request.code_fetched_at)
        .bind(&request.last_code)
        .execute(&mut *self.db)
        .await?;

        Ok(())
    }
}
