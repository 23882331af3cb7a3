//! The resource allocation and credit ledger engine.
//!
//! Every public operation here is one atomic unit: it opens exactly one
//! transaction, performs all the reads its decision needs inside it, and
//! commits or aborts as a whole. Nothing partial is ever observable: a
//! failed allocation leaves no debit, a failed release leaves no refund.
//!
//! The invariants the engine maintains:
//!
//! - a user's balance always equals the sum of their ledger deltas;
//! - a number is `assigned` iff exactly one active lease references it;
//! - a lease that has had a code delivered can never be refunded.
//!
//! Contention on the shared free pool is resolved first-committer-wins: a
//! transaction that loses the write race surfaces a retryable
//! [`crate::db::errors::DbError`] and the operation is retried once against
//! the updated state before the outcome is reported.

pub mod admin;
pub mod allocation;
pub mod delivery;
pub mod queries;
pub mod rate_limit;
pub mod release;

pub use rate_limit::RateLimiter;

use std::time::Duration;

/// Credits debited per lease. Fixed policy, deliberately not configuration.
pub const LEASE_COST_CREDITS: i64 = 1;

/// Per-user cooldown between code fetches. Fixed policy; advisory only and
/// process-local, so it resets on restart.
pub const CODE_FETCH_COOLDOWN: Duration = Duration::from_secs(10);
