//! Session capability consumed by the dashboard.
//!
//! The identity provider owns sign-in and token refresh; the dashboard only
//! needs to know whether a session is ready and to ask it for a fresh JWT.

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};

/// Options forwarded to the identity provider when requesting a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOptions {
    /// JWT template whose claims the API expects (e.g. `with-email`).
    pub template: String,
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    fn is_loaded(&self) -> bool;

    fn is_signed_in(&self) -> bool;

    /// Fetch a token for the current session, `None` when there is none.
    async fn get_token(&self, options: &TokenOptions) -> anyhow::Result<Option<String>>;
}

/// Session backed by a token handed to the process at startup.
///
/// Without a token the session counts as loaded but signed out.
pub struct StaticSession {
    token: Option<Secret<String>>,
}

impl StaticSession {
    pub fn new(token: Option<Secret<String>>) -> Self {
        Self {
            token: token.filter(|t| !t.expose_secret().trim().is_empty()),
        }
    }

    pub fn signed_out() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    fn is_loaded(&self) -> bool {
        true
    }

    fn is_signed_in(&self) -> bool {
        self.token.is_some()
    }

    async fn get_token(&self, _options: &TokenOptions) -> anyhow::Result<Option<String>> {
        Ok(self.token.as_ref().map(|t| t.expose_secret().clone()))
    }
}
