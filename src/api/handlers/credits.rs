//! HTTP handlers for operator ledger operations.

use crate::{
    AppState,
    api::models::credits::{BalanceSet, GrantCreate, LedgerReceiptResponse},
    engine::{self, admin::TargetRef},
    errors::Result,
};
use axum::{extract::State, http::StatusCode, response::Json};

#[tracing::instrument(skip_all)]
pub async fn create_grant(
    State(state): State<AppState>,
    Json(data): Json<GrantCreate>,
) -> Result<(StatusCode, Json<LedgerReceiptResponse>)> {
    let receipt = engine::admin::grant(
        &state.db,
        &data.admin_external_id,
        &TargetRef::parse(&data.target),
        data.amount,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(LedgerReceiptResponse::from(receipt))))
}

#[tracing::instrument(skip_all)]
pub async fn set_balance(
    State(state): State<AppState>,
    Json(data): Json<BalanceSet>,
) -> Result<Json<LedgerReceiptResponse>> {
    let receipt = engine::admin::set_balance(
        &state.db,
        &data.admin_external_id,
        &TargetRef::parse(&data.target),
        data.amount,
    )
    .await?;
    Ok(Json(LedgerReceiptResponse::from(receipt)))
}
