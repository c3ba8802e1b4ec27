//! Version-control collaborator
//!
//! The playground editor saves and loads code through a source-control
//! account. [`SourceControl`] is the typed interface it talks to;
//! [`GitHubClient`] implements it over the GitHub REST API and
//! [`MemoryVcs`] keeps everything in process.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::vcs::github::GitHubClient;
pub use crate::vcs::memory::MemoryVcs;

mod github;
mod memory;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("invalid or expired token")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl VcsError {
    /// Map an unsuccessful HTTP status to an error
    ///
    /// `rate_limit_remaining` is the `x-ratelimit-remaining` header; a 403
    /// with no remaining budget is a rate limit, not a permission problem.
    pub fn from_status(status: u16, rate_limit_remaining: Option<&str>, message: String) -> Self {
        match status {
            401 => VcsError::Unauthorized,
            403 if rate_limit_remaining.map(str::trim) == Some("0") => VcsError::RateLimited,
            429 => VcsError::RateLimited,
            404 => VcsError::NotFound(message),
            409 | 422 => VcsError::Conflict(message),
            _ => VcsError::Api { status, message },
        }
    }
}

/// Access token for a source-control account
///
/// Tokens pasted with a `Bearer ` or `token ` prefix are accepted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: &str) -> Result<Self, VcsError> {
        let token = token.trim_start();
        let token = ["Bearer", "token"]
            .iter()
            .find_map(|prefix| strip_scheme(token, prefix))
            .unwrap_or(token)
            .trim();

        if token.is_empty() {
            return Err(VcsError::Unauthorized);
        }
        Ok(Self(token.to_owned()))
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

/// Strip `scheme` plus following whitespace, case-insensitively
fn strip_scheme<'a>(token: &'a str, scheme: &str) -> Option<&'a str> {
    let head = token.get(..scheme.len())?;
    let rest = &token[scheme.len()..];
    (head.eq_ignore_ascii_case(scheme) && rest.starts_with(char::is_whitespace)).then_some(rest)
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Repository reference, `owner/name` with an optional `@branch`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
    pub branch: Option<String>,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            branch: None,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// The branch, or `default` if none was given
    pub fn branch_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.branch.as_deref().unwrap_or(default)
    }
}

impl FromStr for RepoRef {
    type Err = VcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (repo, branch) = match s.trim().split_once('@') {
            Some((repo, branch)) => (repo, Some(branch)),
            None => (s.trim(), None),
        };

        let Some((owner, name)) = repo.split_once('/') else {
            return Err(VcsError::Invalid(format!("expected owner/name, got '{s}'")));
        };
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(VcsError::Invalid(format!("expected owner/name, got '{s}'")));
        }

        let mut repo = RepoRef::new(owner, name);
        if let Some(branch) = branch.filter(|b| !b.is_empty()) {
            repo = repo.with_branch(branch);
        }
        Ok(repo)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)?;
        if let Some(ref branch) = self.branch {
            write!(f, "@{branch}")?;
        }
        Ok(())
    }
}

/// The authenticated account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub default_branch: Option<String>,
}

/// A file's text and the opaque version needed to overwrite or delete it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    pub text: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Operations the editor needs from a source-control account
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Check the credential and return its account
    async fn authenticate(&self, credential: &Credential) -> Result<Account, VcsError>;

    /// Repositories of the account, most recently updated first
    async fn list_repositories(&self, credential: &Credential)
    -> Result<Vec<Repository>, VcsError>;

    async fn create_repository(
        &self,
        credential: &Credential,
        name: &str,
        description: Option<&str>,
    ) -> Result<Repository, VcsError>;

    /// Read a file; a missing file is [`VcsError::NotFound`]
    async fn read_file(
        &self,
        credential: &Credential,
        repo: &RepoRef,
        path: &str,
    ) -> Result<FileContent, VcsError>;

    /// Create or overwrite a file
    ///
    /// `prior_version` must be the current version when the file exists and
    /// `None` when it does not; otherwise the write is a [`VcsError::Conflict`].
    async fn write_file(
        &self,
        credential: &Credential,
        repo: &RepoRef,
        path: &str,
        text: &str,
        message: &str,
        prior_version: Option<&str>,
    ) -> Result<Commit, VcsError>;

    /// Newest commits touching `path`, at most `limit`; a missing path has none
    ///
    /// GitHub serves at most 100 commits, whatever `limit` asks for.
    async fn list_history(
        &self,
        credential: &Credential,
        repo: &RepoRef,
        path: &str,
        limit: usize,
    ) -> Result<Vec<Commit>, VcsError>;

    async fn delete_file(
        &self,
        credential: &Credential,
        repo: &RepoRef,
        path: &str,
        message: &str,
        version: &str,
    ) -> Result<Commit, VcsError>;
}

/// Trim a repository name, rejecting empty ones
fn repository_name(name: &str) -> Result<&str, VcsError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(VcsError::Invalid("repository name is required".to_owned()));
    }
    Ok(name)
}
