use crate::models::Ledger;
use crate::models::api::ResCreateLedger;
use crate::services::QueryState;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use service_core::error::AppError;
use validator::Validate;

use super::require_session;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLedgerRequest {
    #[validate(length(min = 1, max = 128, message = "Ledger name must be 1-128 characters"))]
    pub name: String,
}

/// Ledgers of one tenant. The underlying query covers every tenant viewed so
/// far; the response is narrowed to the requested one.
pub async fn list_ledgers(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<Json<QueryState<Vec<Ledger>>>, AppError> {
    require_session(&state)?;
    let query = state.cloud.list_ledgers_by_user(&tenant_id).await;
    let ledgers = query
        .state()
        .map(|res| res.for_tenant(&tenant_id).cloned().collect());
    Ok(Json(ledgers))
}

pub async fn create_ledger(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(req): Json<CreateLedgerRequest>,
) -> Result<(StatusCode, Json<ResCreateLedger>), AppError> {
    req.validate()?;
    require_session(&state)?;

    let created = state.cloud.create_ledger(&req.name, &tenant_id).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
