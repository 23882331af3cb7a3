//! HTTP handlers for user registration and read-side queries.

use crate::{
    AppState,
    api::models::{
        credits::{TransactionListResponse, TransactionResponse},
        leases::ActiveLeaseResponse,
        pagination::Pagination,
        users::{BalanceResponse, UserRegister, UserResponse},
    },
    engine,
    errors::Result,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};

/// Resolve or create a user on first contact.
#[tracing::instrument(skip_all)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(data): Json<UserRegister>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let user = engine::queries::ensure_user(&state.db, &data.external_id, data.handle.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[tracing::instrument(skip_all)]
pub async fn get_balance(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> Result<Json<BalanceResponse>> {
    let user = engine::queries::get_balance(&state.db, &external_id).await?;
    Ok(Json(BalanceResponse {
        external_id: user.external_id,
        credits: user.credits,
    }))
}

#[tracing::instrument(skip_all)]
pub async fn list_leases(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> Result<Json<Vec<ActiveLeaseResponse>>> {
    let leases = engine::queries::list_active_leases(&state.db, &external_id).await?;
    Ok(Json(leases.into_iter().map(ActiveLeaseResponse::from).collect()))
}

#[tracing::instrument(skip_all)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<TransactionListResponse>> {
    let skip = pagination.skip();
    let limit = pagination.limit();
    let transactions = engine::queries::list_transactions(&state.db, &external_id, skip, limit).await?;
    Ok(Json(TransactionListResponse {
        data: transactions.into_iter().map(TransactionResponse::from).collect(),
        skip,
        limit,
    }))
}
