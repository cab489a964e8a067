use crate::models::Credential;
use crate::result::{CloudError, CloudResult, capture};
use crate::services::session::{SessionProvider, TokenOptions};
use std::sync::Arc;

/// Turns the current session into a per-request credential.
///
/// Tokens are short-lived, so one is fetched for every call and never kept.
#[derive(Clone)]
pub struct AuthTokenProvider {
    session: Arc<dyn SessionProvider>,
    options: TokenOptions,
}

impl AuthTokenProvider {
    pub fn new(session: Arc<dyn SessionProvider>, template: impl Into<String>) -> Self {
        Self {
            session,
            options: TokenOptions {
                template: template.into(),
            },
        }
    }

    pub fn session(&self) -> &Arc<dyn SessionProvider> {
        &self.session
    }

    pub async fn get_credential(&self) -> CloudResult<Credential> {
        if !self.session.is_signed_in() {
            tracing::debug!("No signed-in session, skipping token request");
            return Err(CloudError::NoToken);
        }

        let result = capture(async {
            let token = self
                .session
                .get_token(&self.options)
                .await
                .map_err(|e| CloudError::Session(e.to_string()))?;

            match token {
                Some(token) if !token.is_empty() => Ok(Credential::Clerk { token }),
                _ => Err(CloudError::NoToken),
            }
        })
        .await;

        if let Err(e) = &result {
            tracing::warn!(template = %self.options.template, error = %e, "Failed to obtain credential");
        }

        result
    }
}
