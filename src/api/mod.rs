//! API layer for HTTP request handling and data models.
//!
//! The HTTP surface is the seam between the engine and the (out-of-scope)
//! chat transport: handlers deserialize the transport's requests, call one
//! engine operation, and serialize the receipt. No end-user text is rendered
//! here; the transport owns presentation.
//!
//! - **[`handlers`]**: axum route handlers for all endpoints
//! - **[`models`]**: request/response structures for API communication

pub mod handlers;
pub mod models;
