mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use cloud_dashboard::startup::build_router;
use common::{mount_user, respond_to, signed_in, signed_out, state_for};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_check_works() {
    let server = MockServer::start().await;
    let app = build_router(state_for(&server, signed_out()));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn signed_out_requests_are_unauthorized() {
    let server = MockServer::start().await;
    let app = build_router(state_for(&server, signed_out()));

    let response = app
        .oneshot(Request::builder().uri("/api/tenants").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "No token available");
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn current_user_reports_query_state() {
    let server = MockServer::start().await;
    mount_user(&server, "active").await;
    let app = build_router(state_for(&server, signed_in()));

    let response = app
        .oneshot(Request::builder().uri("/api/user").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["user"]["userId"], "u1");
}

#[tokio::test]
async fn tenant_ledgers_are_narrowed_to_the_path_tenant() {
    let server = MockServer::start().await;
    mount_user(&server, "active").await;
    respond_to(
        &server,
        "reqListLedgersByUser",
        json!({
            "type": "resListLedgersByUser",
            "userId": "u1",
            "ledgers": [
                { "ledgerId": "L1", "tenantId": "T1", "name": "db" },
                { "ledgerId": "L2", "tenantId": "T2", "name": "logs" }
            ]
        }),
    )
    .await;
    let app = build_router(state_for(&server, signed_in()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/tenants/T1/ledgers")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"], json!([{ "ledgerId": "L1", "tenantId": "T1", "name": "db" }]));
}

#[tokio::test]
async fn create_ledger_rejects_empty_name() {
    let server = MockServer::start().await;
    let app = build_router(state_for(&server, signed_in()));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/tenants/T1/ledgers")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"name":""}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn upstream_status_is_forwarded() {
    let server = MockServer::start().await;
    mount_user(&server, "active").await;
    let app = build_router(state_for(&server, signed_in()));

    // No createTenant mock, so the API answers 404.
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/tenants")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"name":"acme"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "HTTP: 404 Not Found: ");
}

#[tokio::test]
async fn current_user_recovers_after_upstream_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "type": "reqEnsureUser" })))
        .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_user(&server, "active").await;
    let app = build_router(state_for(&server, signed_in()));

    let first = app
        .clone()
        .oneshot(Request::builder().uri("/api/user").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_json(first).await["status"], "error");

    let second = app
        .oneshot(Request::builder().uri("/api/user").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(second).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["user"]["userId"], "u1");
}

#[tokio::test]
async fn create_tenant_returns_created() {
    let server = MockServer::start().await;
    mount_user(&server, "active").await;
    respond_to(
        &server,
        "reqCreateTenant",
        json!({
            "type": "resCreateTenant",
            "tenant": { "tenantId": "T7", "name": "acme" }
        }),
    )
    .await;
    respond_to(
        &server,
        "reqListTenantsByUser",
        json!({ "type": "resListTenantsByUser", "userId": "u1", "authUserId": "auth-u1" }),
    )
    .await;
    let app = build_router(state_for(&server, signed_in()));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/tenants")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"name":"acme"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["tenant"]["tenantId"], "T7");
    assert_eq!(body["tenant"]["name"], "acme");
}
