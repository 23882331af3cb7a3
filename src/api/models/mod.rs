//! API request/response models, distinct from the database models so the
//! wire format and the schema can evolve independently. Notably, number
//! access tokens never appear in API responses.

pub mod credits;
pub mod leases;
pub mod numbers;
pub mod pagination;
pub mod users;
