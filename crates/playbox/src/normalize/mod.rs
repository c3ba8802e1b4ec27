//! Result normalization
//!
//! Turns the raw output of a toolchain process into an [`ExecutionResult`].

pub use crate::normalize::noise::NoiseFilter;

mod noise;

use tracing::debug;

use crate::types::{ExecutionResult, RawOutput};

/// Which step of an execution produced the raw output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Compile,
    Run,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Phase::Compile => "compiler",
            Phase::Run => "program",
        }
    }

    fn failure(self, text: String) -> ExecutionResult {
        match self {
            Phase::Compile => ExecutionResult::compile_error(text),
            Phase::Run => ExecutionResult::runtime_error(text),
        }
    }
}

/// Classify raw process output
///
/// Priority: timeout, then leftover stderr after noise filtering, then a
/// non-zero exit status, then success.
///
/// A compiler that exits with status 0 and leaves only lines without an
/// error signal has produced warnings, which do not fail the compile.
pub fn classify(raw: &RawOutput, phase: Phase, noise: &NoiseFilter) -> ExecutionResult {
    if raw.timed_out {
        return ExecutionResult::timeout();
    }

    let stderr = noise.apply(&raw.stderr);
    if !stderr.is_empty() {
        let warnings_only = phase == Phase::Compile
            && raw.exit_code == Some(0)
            && !noise.carries_error_signal(&stderr);
        if !warnings_only {
            return phase.failure(stderr);
        }
        debug!(lines = stderr.lines().count(), "compiler warnings ignored");
    }

    match raw.exit_code {
        Some(0) => ExecutionResult::success(raw.stdout.clone()),
        code => {
            let status = code.map_or_else(|| "a signal".to_owned(), |c| c.to_string());
            let mut text = format!("{} exited with status {status}", phase.label());
            if !raw.stdout.is_empty() {
                text.push('\n');
                text.push_str(&raw.stdout);
            }
            phase.failure(text)
        }
    }
}
