//! HTTP handlers for the lease lifecycle: allocate, fetch code, release.

use crate::{
    AppState,
    api::models::leases::{CodeRequest, CodeResponse, LeaseCreate, LeaseResponse, ReleaseResponse},
    engine,
    errors::Result,
    types::AssignmentId,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

#[tracing::instrument(skip_all)]
pub async fn create_lease(
    State(state): State<AppState>,
    Json(data): Json<LeaseCreate>,
) -> Result<(StatusCode, Json<LeaseResponse>)> {
    let receipt =
        engine::allocation::allocate(&state.db, &data.user_external_id, data.handle.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(LeaseResponse::from(receipt))))
}

#[tracing::instrument(skip_all, fields(assignment_id = assignment_id))]
pub async fn release_lease(
    State(state): State<AppState>,
    Path(assignment_id): Path<AssignmentId>,
) -> Result<Json<ReleaseResponse>> {
    let receipt = engine::release::release(&state.db, assignment_id).await?;
    Ok(Json(ReleaseResponse::from(receipt)))
}

#[tracing::instrument(skip_all, fields(assignment_id = assignment_id))]
pub async fn fetch_lease_code(
    State(state): State<AppState>,
    Path(assignment_id): Path<AssignmentId>,
    Json(data): Json<CodeRequest>,
) -> Result<Json<CodeResponse>> {
    let delivery = engine::delivery::fetch_code(
        &state.db,
        state.provider.as_ref(),
        &state.rate_limiter,
        assignment_id,
        &data.user_external_id,
    )
    .await?;
    Ok(Json(CodeResponse::from(delivery)))
}
