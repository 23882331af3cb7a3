//! HTTP handlers for pool inventory (operator only).

use crate::{
    AppState,
    api::models::numbers::{
        AdminQuery, NumberResponse, NumbersImport, NumbersImportResponse, RetireRequest,
    },
    db::models::numbers::NumberCreateDBRequest,
    engine,
    errors::Result,
    types::NumberId,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};

#[tracing::instrument(skip_all, fields(count = data.numbers.len()))]
pub async fn import_numbers(
    State(state): State<AppState>,
    Json(data): Json<NumbersImport>,
) -> Result<(StatusCode, Json<NumbersImportResponse>)> {
    let entries: Vec<NumberCreateDBRequest> =
        data.numbers.iter().map(NumberCreateDBRequest::from).collect();
    let outcome = engine::admin::import_numbers(&state.db, &data.admin_external_id, &entries).await?;
    Ok((StatusCode::CREATED, Json(NumbersImportResponse::from(outcome))))
}

#[tracing::instrument(skip_all)]
pub async fn list_numbers(
    State(state): State<AppState>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<Vec<NumberResponse>>> {
    let numbers = engine::admin::list_numbers(&state.db, &query.admin).await?;
    Ok(Json(numbers.into_iter().map(NumberResponse::from).collect()))
}

#[tracing::instrument(skip_all, fields(number_id = number_id))]
pub async fn retire_number(
    State(state): State<AppState>,
    Path(number_id): Path<NumberId>,
    Json(data): Json<RetireRequest>,
) -> Result<Json<NumberResponse>> {
    let number = engine::admin::retire_number(&state.db, &data.admin_external_id, number_id).await?;
    Ok(Json(NumberResponse::from(number)))
}
