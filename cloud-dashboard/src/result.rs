//! Error channel shared by the API client and the query layer.
//!
//! Every expected failure (missing token, HTTP error, unreachable endpoint,
//! undecodable body) is returned as a [`CloudError`] value; nothing in the
//! client raises.

use futures::FutureExt;
use service_core::error::AppError;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use thiserror::Error;

pub type CloudResult<T> = Result<T, CloudError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CloudError {
    #[error("No token available")]
    NoToken,

    #[error("Session error: {0}")]
    Session(String),

    #[error("HTTP: {status} {status_text}: {body}")]
    Http {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Unexpected response type: expected {expected}, got {actual}")]
    Protocol {
        expected: &'static str,
        actual: String,
    },

    /// Rejection carried in a successful HTTP response.
    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Panicked: {0}")]
    Panicked(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for CloudError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CloudError::Decode(err.to_string())
        } else {
            CloudError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CloudError {
    fn from(err: serde_json::Error) -> Self {
        CloudError::Decode(err.to_string())
    }
}

impl From<CloudError> for AppError {
    fn from(err: CloudError) -> Self {
        let message = err.to_string();
        match err {
            CloudError::NoToken | CloudError::Session(_) => {
                AppError::Unauthorized(anyhow::anyhow!(message))
            }
            CloudError::Http { status: 401, .. } => AppError::Unauthorized(anyhow::anyhow!(message)),
            CloudError::Http { status: 403, .. } => AppError::Forbidden(anyhow::anyhow!(message)),
            CloudError::Http { status: 404, .. } => AppError::NotFound(anyhow::anyhow!(message)),
            CloudError::Remote(_) => AppError::BadRequest(anyhow::anyhow!(message)),
            CloudError::Http { .. }
            | CloudError::Network(_)
            | CloudError::Decode(_)
            | CloudError::Protocol { .. } => AppError::BadGateway(message),
            CloudError::Cancelled => AppError::ServiceUnavailable,
            CloudError::Panicked(_) => AppError::InternalError(anyhow::anyhow!(message)),
        }
    }
}

/// Run `fut`, turning a panic raised while polling it into
/// [`CloudError::Panicked`] so callers only ever see a `CloudResult`.
pub async fn capture<F, T>(fut: F) -> CloudResult<T>
where
    F: Future<Output = CloudResult<T>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(CloudError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
