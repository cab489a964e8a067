//! Typed client for the cloud API.
//!
//! One generic [`CloudApi::request`] performs every call; the named methods
//! only pick the request type, which fixes the operation tag and the response
//! type at compile time.

use crate::config::ApiSettings;
use crate::models::api::*;
use crate::models::{ApiRequest, Credential};
use crate::result::{CloudError, CloudResult};
use crate::services::auth_token::AuthTokenProvider;
use reqwest::Client;
use serde_json::Value;
use service_core::observability::TracedClientExt;
use std::time::Duration;

pub struct CloudApi {
    client: Client,
    endpoint: String,
    timeout: Option<Duration>,
    auth: AuthTokenProvider,
}

impl CloudApi {
    pub fn new(settings: &ApiSettings, auth: AuthTokenProvider) -> Self {
        Self {
            client: Client::new(),
            endpoint: settings.url.clone(),
            timeout: settings.timeout_seconds.map(Duration::from_secs),
            auth,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn auth(&self) -> &AuthTokenProvider {
        &self.auth
    }

    /// Send one request and decode its paired response.
    ///
    /// The credential is fetched first; when that fails the endpoint is never
    /// contacted. The call is attempted exactly once.
    pub async fn request<R: ApiRequest>(&self, req: &R) -> CloudResult<R::Response> {
        let operation = R::OPERATION;
        let credential = self.auth.get_credential().await?;
        let body = encode_request(req, &credential)?;

        tracing::debug!(operation = %operation, endpoint = %self.endpoint, "Sending API request");

        let mut request = self
            .client
            .traced_post(&self.endpoint)
            .body("application/json", body);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(operation = %operation, endpoint = %self.endpoint, error = %e, "API request failed");
            CloudError::from(e)
        })?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::warn!(operation = %operation, status = %status, "API returned error status");
            return Err(CloudError::Http {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body: text,
            });
        }

        decode_response::<R>(&text)
    }

    pub async fn ensure_user(&self, req: &ReqEnsureUser) -> CloudResult<ResEnsureUser> {
        self.request(req).await
    }

    pub async fn find_user(&self, req: &ReqFindUser) -> CloudResult<ResFindUser> {
        self.request(req).await
    }

    pub async fn create_tenant(&self, req: &ReqCreateTenant) -> CloudResult<ResCreateTenant> {
        self.request(req).await
    }

    pub async fn update_tenant(&self, req: &ReqUpdateTenant) -> CloudResult<ResUpdateTenant> {
        self.request(req).await
    }

    pub async fn delete_tenant(&self, req: &ReqDeleteTenant) -> CloudResult<ResDeleteTenant> {
        self.request(req).await
    }

    pub async fn redeem_invite(&self, req: &ReqRedeemInvite) -> CloudResult<ResRedeemInvite> {
        self.request(req).await
    }

    /// Redeeming an invite is what attaches the user to its tenant.
    pub async fn connect_user_to_tenant(
        &self,
        req: &ReqRedeemInvite,
    ) -> CloudResult<ResRedeemInvite> {
        self.redeem_invite(req).await
    }

    pub async fn list_tenants_by_user(
        &self,
        req: &ReqListTenantsByUser,
    ) -> CloudResult<ResListTenantsByUser> {
        self.request(req).await
    }

    pub async fn invite_user(&self, req: &ReqInviteUser) -> CloudResult<ResInviteUser> {
        self.request(req).await
    }

    pub async fn list_invites(&self, req: &ReqListInvites) -> CloudResult<ResListInvites> {
        self.request(req).await
    }

    pub async fn delete_invite(&self, req: &ReqDeleteInvite) -> CloudResult<ResDeleteInvite> {
        self.request(req).await
    }

    pub async fn update_user_tenant(
        &self,
        req: &ReqUpdateUserTenant,
    ) -> CloudResult<ResUpdateUserTenant> {
        self.request(req).await
    }

    pub async fn create_ledger(&self, req: &ReqCreateLedger) -> CloudResult<ResCreateLedger> {
        self.request(req).await
    }

    pub async fn update_ledger(&self, req: &ReqUpdateLedger) -> CloudResult<ResUpdateLedger> {
        self.request(req).await
    }

    pub async fn delete_ledger(&self, req: &ReqDeleteLedger) -> CloudResult<ResDeleteLedger> {
        self.request(req).await
    }

    pub async fn list_ledgers_by_user(
        &self,
        req: &ReqListLedgersByUser,
    ) -> CloudResult<ResListLedgersByUser> {
        self.request(req).await
    }
}

/// Build the wire body: the payload's fields plus `type` and `auth`, which
/// always win over same-named payload fields.
pub fn encode_request<R: ApiRequest>(req: &R, credential: &Credential) -> CloudResult<String> {
    let mut body = serde_json::to_value(req)?;
    let Some(fields) = body.as_object_mut() else {
        return Err(CloudError::Decode(format!(
            "{} payload must serialize to a JSON object",
            R::OPERATION
        )));
    };

    fields.insert(
        "type".to_string(),
        Value::String(R::OPERATION.request_tag().to_string()),
    );
    fields.insert("auth".to_string(), serde_json::to_value(credential)?);

    Ok(serde_json::to_string(&body)?)
}

/// Decode a 2xx body, checking that its `type` tag answers the request.
///
/// A body tagged `error` is a rejection by the API and becomes
/// [`CloudError::Remote`].
pub fn decode_response<R: ApiRequest>(text: &str) -> CloudResult<R::Response> {
    let expected = R::OPERATION.response_tag();
    let body: Value = serde_json::from_str(text)?;

    let tag = body
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if tag == expected {
        return Ok(serde_json::from_value(body)?);
    }

    if tag == "error" {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string());
        return Err(CloudError::Remote(message));
    }

    Err(CloudError::Protocol {
        expected,
        actual: tag,
    })
}
