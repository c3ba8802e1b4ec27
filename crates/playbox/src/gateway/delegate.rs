//! Delegated execution
//!
//! A delegate evaluates source somewhere other than a local toolchain: a
//! remote runner reached over HTTP, or an in-process evaluator registered
//! with [`Gateway::with_delegate`](crate::gateway::Gateway::with_delegate).

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::types::{ExecutionRequest, ExecutionResult};

#[derive(Debug, Error)]
pub enum DelegateError {
    #[error("delegate request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("delegate answered with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("delegate failed: {0}")]
    Failed(String),
}

/// Something that can produce an [`ExecutionResult`] for a request
#[async_trait]
pub trait Delegate: Send + Sync {
    async fn evaluate(&self, request: &ExecutionRequest) -> Result<ExecutionResult, DelegateError>;
}

/// Forwards requests to another execution endpoint over HTTP
///
/// The endpoint accepts `{language, source}` and answers `{outcome, text}`,
/// the same contract this crate serves.
#[derive(Debug, Clone)]
pub struct RemoteDelegate {
    client: reqwest::Client,
    endpoint: String,
    language: Option<String>,
}

impl RemoteDelegate {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            language: None,
        }
    }

    /// Send `language` instead of the tag the request arrived with
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    /// Bound each HTTP exchange; the gateway applies its own deadline on top
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, DelegateError> {
        self.client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Delegate for RemoteDelegate {
    #[instrument(skip(self, request), fields(endpoint = %self.endpoint))]
    async fn evaluate(&self, request: &ExecutionRequest) -> Result<ExecutionResult, DelegateError> {
        let forwarded = ExecutionRequest {
            language: self
                .language
                .clone()
                .unwrap_or_else(|| request.language.clone()),
            source: request.source.clone(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&forwarded)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DelegateError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let result: ExecutionResult = response.json().await?;
        debug!(outcome = %result.outcome, "delegate answered");
        Ok(result)
    }
}

/// In-process delegate backed by a plain function
///
/// Useful for languages evaluated inside the host process, and in tests.
pub struct FnDelegate<F>(F);

impl<F> FnDelegate<F>
where
    F: Fn(&ExecutionRequest) -> Result<ExecutionResult, DelegateError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Delegate for FnDelegate<F>
where
    F: Fn(&ExecutionRequest) -> Result<ExecutionResult, DelegateError> + Send + Sync,
{
    async fn evaluate(&self, request: &ExecutionRequest) -> Result<ExecutionResult, DelegateError> {
        (self.0)(request)
    }
}
