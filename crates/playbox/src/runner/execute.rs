//! Execution step for code running
//!
//! Handles running compiled or interpreted programs and classifying their output.

use tracing::{debug, instrument};

use crate::config::{Config, Language};
use crate::normalize::{Phase, classify};
use crate::runner::ExecuteError;
use crate::toolchain::Invocation;
use crate::types::ExecutionResult;
use crate::workspace::Workspace;

/// Execute a program whose source (and artifacts, if compiled) are already in the workspace
#[instrument(skip(workspace, config, language), fields(language = %language.name, workspace = %workspace.id()))]
pub async fn execute(
    workspace: &Workspace,
    config: &Config,
    language: &Language,
    entry: &str,
) -> Result<ExecutionResult, ExecuteError> {
    // Determine effective limits: config defaults → language run limits
    let effective_limits = config.effective_limits(language.run.limits.as_ref());

    let source_name = language.source_name(entry);
    if !workspace.file_exists(&source_name).await? {
        return Err(ExecuteError::SourceMissing(source_name));
    }

    let command =
        Language::expand_command(&language.run.command, &source_name, entry, workspace.path());

    debug!(?command, "executing program");

    let raw = Invocation::new(command)?
        .working_dir(workspace.path())
        .envs(&language.run.env)
        .timeout(effective_limits.deadline())
        .max_output(effective_limits.max_output_bytes())
        .run()
        .await?;

    let result = classify(&raw, Phase::Run, &language.run.noise);

    debug!(
        outcome = %result.outcome,
        exit_code = ?raw.exit_code,
        elapsed = ?raw.elapsed,
        "execution complete"
    );

    Ok(result)
}

/// Execute an interpreted program by writing source and running
#[instrument(skip(workspace, config, language, source), fields(language = %language.name))]
pub async fn execute_interpreted(
    workspace: &Workspace,
    config: &Config,
    language: &Language,
    source: &str,
) -> Result<ExecutionResult, ExecuteError> {
    let entry = language.entry_name(source);
    let source_name = language.source_name(&entry);
    workspace.write_file(&source_name, source.as_bytes()).await?;

    debug!(%source_name, "wrote source file for interpreted execution");

    execute(workspace, config, language, &entry).await
}
