//! A library for bounded execution of untrusted code.
//!
//! Playbox runs code submitted to an online playground with the real
//! compilers and interpreters installed on the host, and turns whatever they
//! print into a single classified [`ExecutionResult`].
//!
//! # Features
//!
//! - **Per-execution workspaces**: every run gets a uniquely named scratch directory that is removed afterwards.
//! - **Multi-language**: interpreted and compile-then-run languages configured in TOML.
//! - **Deadlines**: wall clock limits enforced by killing the whole process group.
//! - **Output normalization**: benign toolchain chatter is filtered before classification.
//! - **Delegation**: languages can be forwarded to another runner with the same contract.
//! - **Version control**: a typed client for saving playground code to GitHub.
//!
//! # Example
//!
//! ```no_run
//! use playbox::{Config, ExecutionRequest, Gateway};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = Gateway::new(Config::default())?;
//! let result = gateway
//!     .execute(&ExecutionRequest::new("python", "print('hi')"))
//!     .await;
//! println!("{}: {}", result.outcome, result.text);
//! # Ok(())
//! # }
//! ```

pub use config::{Config, ConfigError, EXAMPLE_CONFIG, Language};
pub use gateway::{Delegate, DelegateError, FnDelegate, Gateway, RemoteDelegate};
pub use normalize::{NoiseFilter, Phase, classify};
pub use runner::{CompileResult, ExecuteError, Runner};
pub use toolchain::{Invocation, ToolchainError, find_in_path};
pub use types::{ExecutionRequest, ExecutionResult, Outcome, RawOutput, ResourceLimits};
pub use vcs::{
    Account, Commit, Credential, FileContent, GitHubClient, MemoryVcs, RepoRef, Repository,
    SourceControl, VcsError,
};
pub use workspace::{ScratchRoot, Workspace, WorkspaceError};

pub mod config;
pub mod gateway;
pub mod normalize;
pub mod runner;
pub mod toolchain;
pub mod types;
pub mod vcs;
pub mod workspace;
