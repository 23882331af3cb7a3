//! HTTP handlers, one module per functional area.

pub mod credits;
pub mod leases;
pub mod numbers;
pub mod users;
