//! External toolchain processes
//!
//! This module launches compilers and interpreters as subprocesses, with a
//! working directory, a wall clock deadline and capped output capture.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use crate::toolchain::invocation::Invocation;

mod invocation;

/// Errors that occur while launching a toolchain process
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("empty command")]
    EmptyCommand,

    #[error("toolchain '{0}' is not installed or not in PATH")]
    NotFound(String),

    #[error("failed to spawn '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for '{program}': {source}")]
    WaitFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Locate a program the way the shell would
///
/// Names containing a `/` are checked as paths; bare names are searched in
/// the host's `PATH`.
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    if program.contains('/') {
        let path = Path::new(program);
        return path.is_file().then(|| path.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
