use axum::{
    middleware::from_fn,
    routing::get,
    Router,
};
use service_core::middleware::{request_id_middleware, REQUEST_ID_HEADER};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::handlers::{
    app::health_check,
    invites::list_invites,
    ledgers::{create_ledger, list_ledgers},
    tenants::{create_tenant, list_tenants},
    user::current_user,
};
use crate::services::{AuthTokenProvider, CloudApi, CloudContext, SessionProvider};
use crate::AppState;

/// Wire session, API client and binding layer from settings.
pub fn build_state(settings: &Settings, session: Arc<dyn SessionProvider>) -> AppState {
    let auth = AuthTokenProvider::new(session, settings.session.token_template.clone());
    let api = Arc::new(CloudApi::new(&settings.api, auth));
    AppState::new(Arc::new(CloudContext::new(api)))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/user", get(current_user))
        .route("/api/tenants", get(list_tenants).post(create_tenant))
        .route(
            "/api/tenants/:tenant_id/ledgers",
            get(list_ledgers).post(create_ledger),
        )
        .route("/api/tenants/:tenant_id/invites", get(list_invites))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
