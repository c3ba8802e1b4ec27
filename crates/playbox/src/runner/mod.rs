//! Language runners
//!
//! Turns source text into an [`ExecutionResult`] by running the configured
//! toolchain inside a [`Workspace`]. Interpreted languages run once;
//! compiled languages compile first and only run when compilation succeeds.

use thiserror::Error;
use tracing::warn;

pub use crate::runner::compile::{CompileResult, compile};
pub use crate::runner::execute::{execute, execute_interpreted};

mod compile;
pub mod entry_point;
mod execute;

use crate::{
    config::{Config, Language},
    toolchain::ToolchainError,
    types::ExecutionResult,
    workspace::{Workspace, WorkspaceError},
};

/// Errors that keep a runner from producing a classified result
///
/// These never leave the public [`Runner`] API; they are turned into
/// [`Outcome::InternalError`](crate::types::Outcome::InternalError) results.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("language '{0}' does not support compilation")]
    NotCompiled(String),

    #[error("source '{0}' not found in workspace - write source first")]
    SourceMissing(String),

    #[error("workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),
}

impl ExecuteError {
    fn into_result(self) -> ExecutionResult {
        warn!(error = %self, "execution failed before classification");
        ExecutionResult::internal_error(self.to_string())
    }
}

/// High-level runner for code execution
#[derive(Debug, Clone)]
pub struct Runner {
    config: Config,
}

impl Runner {
    /// Create a new runner with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Create a new runner with default configuration
    pub fn with_defaults() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compile source code; the result says whether running may proceed
    pub async fn compile(
        &self,
        workspace: &Workspace,
        source: &str,
        language: &Language,
    ) -> Result<CompileResult, ExecuteError> {
        compile::compile(workspace, &self.config, language, source).await
    }

    /// Run an interpreted program (writes source and executes)
    pub async fn run_interpreted(
        &self,
        workspace: &Workspace,
        source: &str,
        language: &Language,
    ) -> ExecutionResult {
        execute::execute_interpreted(workspace, &self.config, language, source)
            .await
            .unwrap_or_else(ExecuteError::into_result)
    }

    /// Compile and run in one step (for compiled languages)
    ///
    /// The run step is skipped when compilation does not succeed; the
    /// compile diagnostic is the result in that case.
    pub async fn compile_and_run(
        &self,
        workspace: &Workspace,
        source: &str,
        language: &Language,
    ) -> ExecutionResult {
        let compiled = match self.compile(workspace, source, language).await {
            Ok(compiled) => compiled,
            Err(e) => return e.into_result(),
        };

        if !compiled.is_success() {
            return compiled.verdict;
        }

        execute::execute(workspace, &self.config, language, &compiled.entry)
            .await
            .unwrap_or_else(ExecuteError::into_result)
    }

    /// Run any locally executed language, picking the right path
    pub async fn run(
        &self,
        workspace: &Workspace,
        source: &str,
        language: &Language,
    ) -> ExecutionResult {
        if language.is_compiled() {
            self.compile_and_run(workspace, source, language).await
        } else {
            self.run_interpreted(workspace, source, language).await
        }
    }
}
