//! Database record models matching table schemas.
//!
//! Struct definitions corresponding directly to database table rows. Models
//! derive `sqlx::FromRow` for query results and are distinct from the API
//! models in [`crate::api::models`], so storage and API representations can
//! evolve independently.

pub mod assignments;
pub mod credits;
pub mod numbers;
pub mod users;
