use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::config::language::{
    CompileConfig, DEFAULT_ENTRY_NAME, DelegateConfig, EntryPoint, FileExtension, Language,
    RunConfig,
};
use crate::types::ResourceLimits;

pub mod language;
mod loader;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../playbox.example.toml");

/// Prefix for environment variable overrides (e.g. `PLAYBOX__SERVER__BIND`)
pub const ENV_PREFIX: &str = "PLAYBOX";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid characters in file extension")]
    InvalidFileExtChars,

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("language '{0}' not found in configuration")]
    LanguageNotFound(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for Playbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory under which per-execution scratch directories are created
    #[serde(default = "default_scratch_root")]
    pub scratch_root: PathBuf,

    /// Default resource limits applied to all executions.
    /// Per-language compile/run limits override these.
    #[serde(default)]
    pub default_limits: ResourceLimits,

    /// HTTP front end settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Version-control collaborator settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Language configurations keyed by language ID
    #[serde(default)]
    pub languages: HashMap<String, Language>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Base URL of the REST API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Branch used when a repository reference does not name one
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// User agent sent with every request (GitHub rejects requests without one)
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            default_branch: default_branch(),
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    /// Create a new config with embedded default languages
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty config with no languages
    pub fn empty() -> Self {
        Self {
            scratch_root: default_scratch_root(),
            default_limits: ResourceLimits::default(),
            server: ServerConfig::default(),
            github: GitHubConfig::default(),
            languages: HashMap::new(),
        }
    }

    /// Get a language by ID or alias
    pub fn get_language(&self, tag: &str) -> Result<&Language, ConfigError> {
        self.resolve_language(tag)
            .map(|(_, language)| language)
            .ok_or_else(|| ConfigError::LanguageNotFound(tag.to_string()))
    }

    /// Resolve a request tag to its language ID and configuration
    ///
    /// Tags are matched case-insensitively against IDs first, then aliases.
    pub fn resolve_language(&self, tag: &str) -> Option<(&str, &Language)> {
        let tag = tag.trim().to_ascii_lowercase();
        if let Some((id, language)) = self.languages.get_key_value(&tag) {
            return Some((id.as_str(), language));
        }
        self.languages
            .iter()
            .find(|(_, language)| language.has_alias(&tag))
            .map(|(id, language)| (id.as_str(), language))
    }

    /// Merge resource limits with defaults
    pub fn effective_limits(&self, overrides: Option<&ResourceLimits>) -> ResourceLimits {
        match overrides {
            Some(limits) => self.default_limits.with_overrides(limits),
            None => self.default_limits.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

fn default_scratch_root() -> PathBuf {
    std::env::temp_dir().join("playbox")
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_owned()
}

fn default_api_base() -> String {
    "https://api.github.com".to_owned()
}

fn default_branch() -> String {
    "main".to_owned()
}

fn default_user_agent() -> String {
    concat!("playbox/", env!("CARGO_PKG_VERSION")).to_owned()
}
