use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::config::ConfigError;
use crate::normalize::NoiseFilter;
use crate::runner::entry_point::{EntryPointPattern, derive_entry_name};
use crate::types::ResourceLimits;

const INVALID_FILE_EXT_CHARS: [char; 2] = ['/', '.'];

/// Entry name used by languages without an entry-point convention
pub const DEFAULT_ENTRY_NAME: &str = "main";

/// Configuration for a programming language
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    /// Human-readable name for the language (e.g., "Python 3")
    pub name: String,

    /// File extension
    pub extension: FileExtension,

    /// Other tags that select this language (e.g., "py", "python3")
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Compilation configuration (None for interpreted languages)
    #[serde(default)]
    pub compile: Option<CompileConfig>,

    /// Execution configuration
    #[serde(default)]
    pub run: RunConfig,

    /// Forward execution to another endpoint instead of running locally
    #[serde(default)]
    pub delegate: Option<DelegateConfig>,
}

impl Language {
    /// Check if the language is compiled
    pub fn is_compiled(&self) -> bool {
        self.compile.is_some()
    }

    /// Check if execution is handed to a delegate
    pub fn is_delegated(&self) -> bool {
        self.delegate.is_some()
    }

    /// Human-readable kind for listings
    pub fn kind(&self) -> &'static str {
        if self.is_delegated() {
            "delegated"
        } else if self.is_compiled() {
            "compiled"
        } else {
            "interpreted"
        }
    }

    /// Entry name for `source`
    ///
    /// Compiled languages with an entry-point convention derive it from the
    /// source; everything else uses [`DEFAULT_ENTRY_NAME`].
    pub fn entry_name(&self, source: &str) -> String {
        match self.compile.as_ref().and_then(|c| c.entry_point.as_ref()) {
            Some(entry) => derive_entry_name(source, &entry.pattern, &entry.default),
            None => DEFAULT_ENTRY_NAME.to_owned(),
        }
    }

    /// Source file name for the given entry name
    pub fn source_name(&self, entry: &str) -> String {
        format!("{entry}.{}", self.extension)
    }

    /// The program that must be installed for this language to run locally
    pub fn toolchain_program(&self) -> Option<&str> {
        self.compile
            .as_ref()
            .map(|c| c.command.as_slice())
            .unwrap_or(self.run.command.as_slice())
            .first()
            .map(String::as_str)
    }

    /// Whether `tag` names this language through an alias
    pub fn has_alias(&self, tag: &str) -> bool {
        self.aliases.iter().any(|a| a.eq_ignore_ascii_case(tag))
    }

    /// Expand placeholders in the given command
    pub fn expand_command(
        command: &[String],
        source: &str,
        entry: &str,
        workspace: &Path,
    ) -> Vec<String> {
        let workspace = workspace.to_string_lossy();
        command
            .iter()
            .map(|arg| {
                arg.replace("{source}", source)
                    .replace("{entry}", entry)
                    .replace("{workspace}", &workspace)
            })
            .collect()
    }
}

/// File extension without dot (e.g., "py")
#[derive(Debug, Clone, Serialize)]
pub struct FileExtension(String);

impl FileExtension {
    pub fn new(extension: &str) -> Result<Self, ConfigError> {
        let contains_invalid = extension
            .chars()
            .any(|c| INVALID_FILE_EXT_CHARS.contains(&c));
        if contains_invalid {
            return Err(ConfigError::InvalidFileExtChars);
        }
        Ok(Self(extension.to_owned()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for FileExtension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FileExtension::new(&s).map_err(|_| {
            de::Error::invalid_value(
                de::Unexpected::Str(&s),
                &"a file extension without '/' or '.' characters",
            )
        })
    }
}

impl std::fmt::Display for FileExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for the compilation step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {entry}, {workspace}
    pub command: Vec<String>,

    /// How to derive the source file name from the source text
    #[serde(default)]
    pub entry_point: Option<EntryPoint>,

    /// Environment variables to set during compilation
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Resource limits for compilation (overrides defaults)
    #[serde(default)]
    pub limits: Option<ResourceLimits>,

    /// Benign compiler diagnostics
    #[serde(default)]
    pub noise: NoiseFilter,
}

/// Entry-point convention of a compiled language
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPoint {
    /// Pattern whose first capture group is the declared identifier
    pub pattern: EntryPointPattern,

    /// Name used when the pattern does not match
    #[serde(default = "default_entry_point_name")]
    pub default: String,
}

fn default_entry_point_name() -> String {
    "Main".to_owned()
}

/// Configuration for the execution step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {entry}, {workspace}
    #[serde(default)]
    pub command: Vec<String>,

    /// Environment variables to set
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Resource limits for execution (overrides defaults)
    #[serde(default)]
    pub limits: Option<ResourceLimits>,

    /// Benign runtime diagnostics
    #[serde(default)]
    pub noise: NoiseFilter,
}

/// Configuration for delegated execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegateConfig {
    /// URL accepting `POST {language, source}` and answering `{outcome, text}`
    pub endpoint: String,

    /// Language tag sent to the endpoint (defaults to the local language id)
    #[serde(default)]
    pub language: Option<String>,

    /// Limits applied while waiting for the delegate (overrides defaults)
    #[serde(default)]
    pub limits: Option<ResourceLimits>,
}
