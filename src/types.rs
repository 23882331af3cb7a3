//! Common type definitions.
//!
//! Entity identifiers are SQLite rowids wrapped in type aliases for better
//! readability at call sites:
//!
//! - [`UserId`]: user account identifier
//! - [`NumberId`]: pool number identifier
//! - [`AssignmentId`]: lease assignment identifier

// Type aliases for IDs
pub type UserId = i64;
pub type NumberId = i64;
pub type AssignmentId = i64;
