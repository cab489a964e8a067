use crate::models::api::ResEnsureUser;
use crate::services::QueryState;
use crate::AppState;
use axum::{extract::State, Json};
use service_core::error::AppError;

use super::require_session;

pub async fn current_user(
    State(state): State<AppState>,
) -> Result<Json<QueryState<ResEnsureUser>>, AppError> {
    require_session(&state)?;
    let query = state.cloud.ensure_user().await;
    Ok(Json(query.state()))
}
