pub mod app;
pub mod invites;
pub mod ledgers;
pub mod tenants;
pub mod user;

use service_core::error::AppError;

/// Reject with 401 before touching the API when nobody is signed in.
pub(crate) fn require_session(state: &crate::AppState) -> Result<(), AppError> {
    if state.cloud.session_ready() {
        Ok(())
    } else {
        Err(AppError::Unauthorized(anyhow::anyhow!("No token available")))
    }
}
