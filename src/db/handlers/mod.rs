//! Repository implementations for database access.
//!
//! Each major entity has a repository struct wrapping a SQLx connection (or
//! transaction), providing strongly-typed operations and returning the models
//! from [`crate::db::models`].
//!
//! The entities here are deliberately narrower than generic CRUD: users and
//! numbers are never deleted, assignments become immutable once inactive, and
//! the ledger is append-only, so every repository exposes exactly the
//! mutations the engine is allowed to perform and nothing else.
//!
//! # Common pattern
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let mut repo = Users::new(&mut tx);
//! // ... operations ...
//! tx.commit().await?;
//! ```

pub mod assignments;
pub mod credits;
pub mod numbers;
pub mod users;

pub use assignments::Assignments;
pub use credits::Credits;
pub use numbers::Numbers;
pub use users::Users;
