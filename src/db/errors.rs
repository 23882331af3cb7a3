use thiserror::Error;

/// Unified error type for database operations that application code can handle
#[derive(Error, Debug)]
pub enum DbError {
    /// Entity not found by the given identifier
    #[error("Entity not found")]
    NotFound,

    /// Unique constraint violation
    #[error("Unique constraint violation: {message}")]
    UniqueViolation { message: String },

    /// Foreign key constraint violation
    #[error("Foreign key constraint violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Check constraint violation
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// The write lost to a concurrent transaction (SQLITE_BUSY family).
    /// Callers treat this as an optimistic-concurrency retry signal.
    #[error("Database busy: {message}")]
    Busy { message: String },

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DbError {
    /// Whether the failed unit of work can be retried against fresh state.
    ///
    /// `Busy` is the classic lost-the-write-lock case; a unique violation can
    /// also surface when two transactions race for the same row (e.g. the
    /// one-active-lease-per-number index) and the loser should re-read.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::Busy { .. } | DbError::UniqueViolation { .. })
    }
}

/// Convert from sqlx::Error using sqlx's error categorization
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                if db_err.is_unique_violation() {
                    DbError::UniqueViolation { message }
                } else if db_err.is_foreign_key_violation() {
                    DbError::ForeignKeyViolation { message }
                } else if db_err.is_check_violation() {
                    DbError::CheckViolation { message }
                } else if is_busy_code(db_err.code().as_deref()) || message.contains("database is locked") {
                    DbError::Busy { message }
                } else {
                    // All other database errors are non-recoverable
                    DbError::Other(anyhow::Error::from(err))
                }
            }
            // All other sqlx errors are non-recoverable
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

/// SQLITE_BUSY (5) and its extended codes: SQLITE_BUSY_RECOVERY (261),
/// SQLITE_BUSY_SNAPSHOT (517), SQLITE_BUSY_TIMEOUT (773).
fn is_busy_code(code: Option<&str>) -> bool {
    matches!(code, Some("5" | "261" | "517" | "773"))
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;
