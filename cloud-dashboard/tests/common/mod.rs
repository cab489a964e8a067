#![allow(dead_code)]

use cloud_dashboard::config::{
    ApiSettings, ServerSettings, SessionSettings, Settings, TelemetrySettings,
};
use cloud_dashboard::services::{CloudContext, SessionProvider, StaticSession};
use cloud_dashboard::startup::build_state;
use cloud_dashboard::AppState;
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "jwt-test-token";

pub fn settings(api_url: &str) -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        api: ApiSettings {
            url: api_url.to_string(),
            timeout_seconds: Some(5),
        },
        session: SessionSettings::default(),
        telemetry: TelemetrySettings::default(),
    }
}

pub fn signed_in() -> Arc<dyn SessionProvider> {
    Arc::new(StaticSession::new(Some(Secret::new(TOKEN.to_string()))))
}

pub fn signed_out() -> Arc<dyn SessionProvider> {
    Arc::new(StaticSession::signed_out())
}

pub fn api_url(server: &MockServer) -> String {
    format!("{}/api", server.uri())
}

pub fn state_for(server: &MockServer, session: Arc<dyn SessionProvider>) -> AppState {
    build_state(&settings(&api_url(server)), session)
}

pub fn context_for(server: &MockServer, session: Arc<dyn SessionProvider>) -> Arc<CloudContext> {
    state_for(server, session).cloud
}

/// Answer every request tagged `request_tag` with `response`.
pub async fn respond_to(server: &MockServer, request_tag: &str, response: Value) {
    Mock::given(method("POST"))
        .and(path("/api"))
        .and(body_partial_json(json!({ "type": request_tag })))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .mount(server)
        .await;
}

pub async fn mount_user(server: &MockServer, status: &str) {
    respond_to(
        server,
        "reqEnsureUser",
        json!({
            "type": "resEnsureUser",
            "user": { "userId": "u1", "status": status },
            "tenants": []
        }),
    )
    .await;
}

/// Bodies of every received request carrying `request_tag`, in arrival order.
pub async fn bodies_tagged(server: &MockServer, request_tag: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|request| serde_json::from_slice::<Value>(&request.body).ok())
        .filter(|body| body["type"] == request_tag)
        .collect()
}

pub fn tenant_ids(body: &Value) -> Vec<String> {
    body["tenantIds"]
        .as_array()
        .map(|ids| {
            ids.iter()
                .filter_map(|id| id.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
