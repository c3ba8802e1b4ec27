use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Text returned when an execution is killed at its deadline
pub const TIMEOUT_MESSAGE: &str = "execution exceeded time budget.";

/// Text returned when a program succeeds without printing anything
pub const NO_OUTPUT_MESSAGE: &str = "Code executed successfully (no output)";

/// A request to run one piece of source code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Language id or alias (e.g. "python", "java")
    pub language: String,

    /// Program source text
    pub source: String,
}

impl ExecutionRequest {
    pub fn new(language: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            source: source.into(),
        }
    }
}

/// Classified outcome of one execution attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    CompileError,
    RuntimeError,
    Timeout,
    UnsupportedLanguage,
    InternalError,
}

impl Outcome {
    /// Whether the program ran to completion without an error
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Outcome::Success => "Success",
            Outcome::CompileError => "CompileError",
            Outcome::RuntimeError => "RuntimeError",
            Outcome::Timeout => "Timeout",
            Outcome::UnsupportedLanguage => "UnsupportedLanguage",
            Outcome::InternalError => "InternalError",
        };
        f.write_str(name)
    }
}

/// The single result produced for an [`ExecutionRequest`]
///
/// `text` is display-ready: the program's stdout on success, a diagnostic
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub outcome: Outcome,
    pub text: String,
}

impl ExecutionResult {
    pub fn new(outcome: Outcome, text: impl Into<String>) -> Self {
        Self {
            outcome,
            text: text.into(),
        }
    }

    /// Successful run; empty stdout is replaced with [`NO_OUTPUT_MESSAGE`]
    pub fn success(stdout: impl Into<String>) -> Self {
        let stdout = stdout.into();
        if stdout.is_empty() {
            Self::new(Outcome::Success, NO_OUTPUT_MESSAGE)
        } else {
            Self::new(Outcome::Success, stdout)
        }
    }

    pub fn compile_error(text: impl Into<String>) -> Self {
        Self::new(Outcome::CompileError, text)
    }

    pub fn runtime_error(text: impl Into<String>) -> Self {
        Self::new(Outcome::RuntimeError, text)
    }

    pub fn timeout() -> Self {
        Self::new(Outcome::Timeout, TIMEOUT_MESSAGE)
    }

    pub fn unsupported(language: &str) -> Self {
        Self::new(
            Outcome::UnsupportedLanguage,
            format!("language '{language}' is not supported"),
        )
    }

    pub fn internal_error(text: impl Into<String>) -> Self {
        Self::new(Outcome::InternalError, text)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Captured result of one toolchain process
#[derive(Debug, Clone, Default)]
pub struct RawOutput {
    pub stdout: String,
    pub stderr: String,

    /// Exit code if the process exited normally
    pub exit_code: Option<i32>,

    /// Whether the process was killed at its deadline
    pub timed_out: bool,

    /// Wall clock time until exit or kill
    pub elapsed: Duration,
}

impl RawOutput {
    /// Output of a process killed at its deadline (partial output is discarded)
    pub fn timed_out(elapsed: Duration) -> Self {
        Self {
            timed_out: true,
            elapsed,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn exited_cleanly(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Wall clock time limit in seconds
    #[serde(default)]
    pub wall_time_limit: Option<f64>,

    /// Maximum captured size per output stream in kilobytes
    #[serde(default)]
    pub max_output: Option<u64>,
}

impl ResourceLimits {
    /// Deadline used when no wall time limit is configured at any layer
    pub const FALLBACK_WALL_TIME: f64 = 5.0;

    /// Create new resource limits with the default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create limits with every field unset, for use as an override layer
    pub fn unset() -> Self {
        Self {
            wall_time_limit: None,
            max_output: None,
        }
    }

    /// Set the wall clock time limit in seconds
    pub fn with_wall_time_limit(mut self, seconds: f64) -> Self {
        self.wall_time_limit = Some(seconds);
        self
    }

    /// Set the maximum output size in kilobytes
    pub fn with_max_output(mut self, kb: u64) -> Self {
        self.max_output = Some(kb);
        self
    }

    /// Apply overrides from another ResourceLimits, preferring values from `overrides`
    pub fn with_overrides(&self, overrides: &ResourceLimits) -> ResourceLimits {
        ResourceLimits {
            wall_time_limit: overrides.wall_time_limit.or(self.wall_time_limit),
            max_output: overrides.max_output.or(self.max_output),
        }
    }

    /// The wall clock deadline as a [`Duration`]
    pub fn deadline(&self) -> Duration {
        let seconds = self
            .wall_time_limit
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(Self::FALLBACK_WALL_TIME);
        Duration::from_secs_f64(seconds)
    }

    /// Output cap in bytes, if any
    pub fn max_output_bytes(&self) -> Option<usize> {
        self.max_output
            .map(|kb| usize::try_from(kb.saturating_mul(1024)).unwrap_or(usize::MAX))
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            wall_time_limit: Some(5.0),
            max_output: Some(1024), // 1 MB
        }
    }
}
