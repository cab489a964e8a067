use crate::models::api::{ResCreateTenant, ResListTenantsByUser};
use crate::services::QueryState;
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use service_core::error::AppError;
use validator::Validate;

use super::require_session;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTenantRequest {
    #[validate(length(min = 1, max = 128, message = "Tenant name must be 1-128 characters"))]
    pub name: Option<String>,
}

pub async fn list_tenants(
    State(state): State<AppState>,
) -> Result<Json<QueryState<ResListTenantsByUser>>, AppError> {
    require_session(&state)?;
    let query = state.cloud.list_tenants_by_user().await;
    Ok(Json(query.state()))
}

pub async fn create_tenant(
    State(state): State<AppState>,
    Json(req): Json<CreateTenantRequest>,
) -> Result<(StatusCode, Json<ResCreateTenant>), AppError> {
    req.validate()?;
    require_session(&state)?;

    let created = state.cloud.create_tenant(req.name).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
