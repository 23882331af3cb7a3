use crate::db::errors::DbError;
use crate::types::{AssignmentId, NumberId};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// The caller's balance cannot cover the operation
    #[error("Insufficient credits")]
    InsufficientCredits,

    /// The free-number pool is exhausted
    #[error("No numbers available")]
    NoResourceAvailable,

    /// No live lease with this identifier
    #[error("Assignment {id} not found")]
    AssignmentNotFound { id: AssignmentId },

    /// A code has already been delivered for this lease
    #[error("Assignment {id} is no longer refundable")]
    NotRefundable { id: AssignmentId },

    /// Per-user cooldown between code fetches
    #[error("Rate limited, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The provider answered but has no code yet
    #[error("No code available yet")]
    NoCodeAvailable,

    /// The provider could not be reached or errored; transient
    #[error("Code delivery temporarily unavailable: {reason}")]
    DeliveryUnavailable { reason: String },

    /// No user matches the given reference
    #[error("User {reference} not found")]
    UserNotFound { reference: String },

    /// Caller is not an administrator
    #[error("Not authorized")]
    Unauthorized,

    /// No number with this identifier
    #[error("Number {id} not found")]
    NumberNotFound { id: NumberId },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InsufficientCredits => StatusCode::PAYMENT_REQUIRED,
            Error::NoResourceAvailable => StatusCode::CONFLICT,
            Error::AssignmentNotFound { .. } => StatusCode::NOT_FOUND,
            Error::NotRefundable { .. } => StatusCode::CONFLICT,
            Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::NoCodeAvailable => StatusCode::NOT_FOUND,
            Error::DeliveryUnavailable { .. } => StatusCode::BAD_GATEWAY,
            Error::UserNotFound { .. } => StatusCode::NOT_FOUND,
            Error::Unauthorized => StatusCode::FORBIDDEN,
            Error::NumberNotFound { .. } => StatusCode::NOT_FOUND,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Busy { .. } => StatusCode::SERVICE_UNAVAILABLE,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error tag the transport can switch on.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InsufficientCredits => "insufficient_credits",
            Error::NoResourceAvailable => "no_resource_available",
            Error::AssignmentNotFound { .. } => "assignment_not_found",
            Error::NotRefundable { .. } => "not_refundable",
            Error::RateLimited { .. } => "rate_limited",
            Error::NoCodeAvailable => "no_code_available",
            Error::DeliveryUnavailable { .. } => "delivery_unavailable",
            Error::UserNotFound { .. } => "user_not_found",
            Error::Unauthorized => "unauthorized",
            Error::NumberNotFound { .. } => "number_not_found",
            Error::BadRequest { .. } => "bad_request",
            Error::Database(_) | Error::Other(_) => "internal",
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::InsufficientCredits => "Insufficient credits".to_string(),
            Error::NoResourceAvailable => "No numbers available".to_string(),
            Error::AssignmentNotFound { id } => format!("Assignment {id} not found"),
            Error::NotRefundable { .. } => "Cannot release after a code has been fetched".to_string(),
            Error::RateLimited { retry_after_secs } => {
                format!("Please wait {retry_after_secs} seconds before requesting another code")
            }
            Error::NoCodeAvailable => "No code found".to_string(),
            Error::DeliveryUnavailable { .. } => "Temporary error fetching code, try again".to_string(),
            Error::UserNotFound { reference } => format!("User {reference} not found"),
            Error::Unauthorized => "You are not authorized to perform this action".to_string(),
            Error::NumberNotFound { id } => format!("Number {id} not found"),
            Error::BadRequest { message } => message.clone(),
            Error::Database(_) | Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - level depends on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) | Error::DeliveryUnavailable { .. } => {
                tracing::warn!("Recoverable backend error: {}", self);
            }
            Error::Unauthorized => {
                tracing::info!("Authorization error: {}", self);
            }
            _ => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        let mut body = json!({
            "error": self.kind(),
            "message": self.user_message(),
        });
        if let Error::RateLimited { retry_after_secs } = &self {
            body["retry_after_secs"] = json!(retry_after_secs);
        }

        (status, axum::response::Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
