//! Execution gateway
//!
//! The single entry point for running a request: resolves the language,
//! hands delegated languages to their [`Delegate`], and runs everything else
//! locally in a fresh [`Workspace`](crate::workspace::Workspace) that is
//! released before the result is returned.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

pub use crate::gateway::delegate::{Delegate, DelegateError, FnDelegate, RemoteDelegate};

mod delegate;

use crate::config::{Config, Language};
use crate::runner::Runner;
use crate::types::{ExecutionRequest, ExecutionResult, ResourceLimits};
use crate::workspace::{ScratchRoot, WorkspaceError};

/// Dispatches execution requests
///
/// Cloning is cheap and clones share nothing mutable; each call to
/// [`execute`](Self::execute) works in its own workspace.
#[derive(Clone)]
pub struct Gateway {
    runner: Arc<Runner>,
    scratch: Arc<ScratchRoot>,
    delegates: Arc<HashMap<String, Arc<dyn Delegate>>>,
}

impl Gateway {
    /// Create a gateway, preparing the scratch root
    ///
    /// Languages with a `delegate` section get a [`RemoteDelegate`].
    pub fn new(config: Config) -> Result<Self, WorkspaceError> {
        let scratch = ScratchRoot::create(&config.scratch_root)?;

        let delegates = config
            .languages
            .iter()
            .filter_map(|(id, language)| {
                let remote = language.delegate.as_ref()?;
                debug!(language = %id, endpoint = %remote.endpoint, "registering remote delegate");
                let delegate = RemoteDelegate::new(&remote.endpoint)
                    .with_language(remote.language.clone());
                Some((id.clone(), Arc::new(delegate) as Arc<dyn Delegate>))
            })
            .collect();

        Ok(Self {
            runner: Arc::new(Runner::new(config)),
            scratch: Arc::new(scratch),
            delegates: Arc::new(delegates),
        })
    }

    /// Register (or replace) the delegate for a language tag
    ///
    /// The tag does not have to be configured; unknown tags are matched
    /// case-insensitively after the configured languages.
    pub fn with_delegate(mut self, language: &str, delegate: Arc<dyn Delegate>) -> Self {
        Arc::make_mut(&mut self.delegates).insert(language.trim().to_ascii_lowercase(), delegate);
        self
    }

    pub fn config(&self) -> &Config {
        self.runner.config()
    }

    pub fn scratch_root(&self) -> &ScratchRoot {
        &self.scratch
    }

    /// Run one request to completion
    ///
    /// Always produces exactly one result; internal failures are reported as
    /// [`Outcome::InternalError`](crate::types::Outcome::InternalError).
    #[instrument(skip(self, request), fields(language = %request.language, source_len = request.source.len()))]
    pub async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        let config = self.runner.config();

        let Some((id, language)) = config.resolve_language(&request.language) else {
            let tag = request.language.trim().to_ascii_lowercase();
            if let Some(delegate) = self.delegates.get(&tag) {
                return self
                    .delegate(delegate.as_ref(), request, &config.default_limits)
                    .await;
            }
            info!("unsupported language requested");
            return ExecutionResult::unsupported(&request.language);
        };

        if let Some(delegate) = self.delegates.get(id) {
            let limits = delegate_limits(config, language);
            return self.delegate(delegate.as_ref(), request, &limits).await;
        }

        let workspace = match self.scratch.acquire().await {
            Ok(workspace) => workspace,
            Err(e) => {
                warn!(error = %e, "failed to acquire workspace");
                return ExecutionResult::internal_error(e.to_string());
            }
        };

        let result = self.runner.run(&workspace, &request.source, language).await;
        workspace.release().await;

        info!(outcome = %result.outcome, "execution finished");
        result
    }

    async fn delegate(
        &self,
        delegate: &dyn Delegate,
        request: &ExecutionRequest,
        limits: &ResourceLimits,
    ) -> ExecutionResult {
        let deadline = limits.deadline();
        let result = match tokio::time::timeout(deadline, delegate.evaluate(request)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(error = %e, "delegate failed");
                ExecutionResult::internal_error(e.to_string())
            }
            Err(_) => {
                warn!(?deadline, "delegate exceeded deadline");
                ExecutionResult::timeout()
            }
        };

        info!(outcome = %result.outcome, "delegated execution finished");
        result
    }
}

/// Delegate limits fall back to the run limits of the language
fn delegate_limits(config: &Config, language: &Language) -> ResourceLimits {
    let overrides = language
        .delegate
        .as_ref()
        .and_then(|d| d.limits.as_ref())
        .or(language.run.limits.as_ref());
    config.effective_limits(overrides)
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut delegates: Vec<_> = self.delegates.keys().collect();
        delegates.sort();
        f.debug_struct("Gateway")
            .field("scratch", &self.scratch.path())
            .field("languages", &self.runner.config().languages.len())
            .field("delegates", &delegates)
            .finish()
    }
}
