//! Compilation step for code execution
//!
//! Handles compiling source code using language-specific compilers.

use tracing::{debug, instrument};

use crate::config::{Config, Language};
use crate::normalize::{Phase, classify};
use crate::runner::ExecuteError;
use crate::toolchain::Invocation;
use crate::types::{ExecutionResult, ResourceLimits};
use crate::workspace::Workspace;

/// Result of a compilation
#[derive(Debug, Clone)]
pub struct CompileResult {
    /// Entry name the source was saved under
    pub entry: String,

    /// Source file name inside the workspace
    pub source_name: String,

    /// Classified compiler output
    pub verdict: ExecutionResult,
}

impl CompileResult {
    /// Check if compilation was successful
    pub fn is_success(&self) -> bool {
        self.verdict.is_success()
    }
}

/// Default compilation limits, layered over the configured defaults
///
/// Only the deadline differs from the run step; the output cap is inherited.
fn default_compile_limits() -> ResourceLimits {
    ResourceLimits::unset().with_wall_time_limit(10.0)
}

/// Compile source code in a workspace
#[instrument(skip(workspace, config, language, source), fields(language = %language.name, workspace = %workspace.id()))]
pub async fn compile(
    workspace: &Workspace,
    config: &Config,
    language: &Language,
    source: &str,
) -> Result<CompileResult, ExecuteError> {
    let compile_config = language
        .compile
        .as_ref()
        .ok_or_else(|| ExecuteError::NotCompiled(language.name.clone()))?;

    // The toolchain may require the file name to match the declared entry point
    let entry = language.entry_name(source);
    let source_name = language.source_name(&entry);
    workspace.write_file(&source_name, source.as_bytes()).await?;

    debug!(%entry, %source_name, "wrote source file");

    // config defaults → compile defaults → language compile limits
    let mut effective_limits = config
        .default_limits
        .with_overrides(&default_compile_limits());
    if let Some(ref lang_limits) = compile_config.limits {
        effective_limits = effective_limits.with_overrides(lang_limits);
    }

    let command = Language::expand_command(
        &compile_config.command,
        &source_name,
        &entry,
        workspace.path(),
    );

    let raw = Invocation::new(command)?
        .working_dir(workspace.path())
        .envs(&compile_config.env)
        .timeout(effective_limits.deadline())
        .max_output(effective_limits.max_output_bytes())
        .run()
        .await?;

    let verdict = classify(&raw, Phase::Compile, &compile_config.noise);

    debug!(
        outcome = %verdict.outcome,
        exit_code = ?raw.exit_code,
        elapsed = ?raw.elapsed,
        "compilation complete"
    );

    Ok(CompileResult {
        entry,
        source_name,
        verdict,
    })
}
