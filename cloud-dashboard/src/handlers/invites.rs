use crate::models::InviteTicket;
use crate::services::QueryState;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::AppError;

use super::require_session;

pub async fn list_invites(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<Json<QueryState<Vec<InviteTicket>>>, AppError> {
    require_session(&state)?;
    let query = state.cloud.list_invites_by_tenant(&tenant_id).await;
    let invites = query
        .state()
        .map(|res| res.for_tenant(&tenant_id).to_vec());
    Ok(Json(invites))
}
