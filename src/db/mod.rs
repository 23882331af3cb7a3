//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx over SQLite.
//! It follows the repository pattern to provide clean abstractions over
//! database operations.
//!
//! # Modules
//!
//! - [`handlers`]: Repository implementations per table
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Database-specific error types
//!
//! # Transactions
//!
//! Repositories work with SQLx transactions to ensure ACID properties. Every
//! engine operation opens exactly one transaction, builds its repositories
//! from it, and commits or aborts as a unit:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let user = Users::new(&mut tx).get_or_create("ext-1", None).await?;
//! // ... further repository operations on the same transaction ...
//! tx.commit().await?;
//! ```
//!
//! # Migrations
//!
//! Database migrations are managed by SQLx and located in the `migrations/`
//! directory; [`crate::migrator`] provides access to the migrator.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::instrument;

pub mod errors;
pub mod handlers;
pub mod models;

/// Open a connection pool against the configured SQLite database.
///
/// WAL journaling keeps readers from blocking the single writer, and the busy
/// timeout bounds how long a contending transaction waits for the write lock
/// before surfacing [`errors::DbError::Busy`].
#[instrument(skip_all, fields(url = %url))]
pub async fn connect(url: &str, max_connections: u32, busy_timeout: Duration) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}
