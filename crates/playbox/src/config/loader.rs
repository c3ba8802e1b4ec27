//! Configuration file loading for Playbox
//!
//! Handles loading and parsing configuration files using the config crate.

use std::collections::HashSet;
use std::path::Path;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};

use crate::config::{Config, ConfigError, ENV_PREFIX, EXAMPLE_CONFIG};
use crate::runner::entry_point::is_identifier;

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a file (or the embedded defaults) with `PLAYBOX__*` environment overrides
    ///
    /// Nested keys are separated by a double underscore, so
    /// `PLAYBOX__SERVER__BIND=0.0.0.0:8080` sets `server.bind`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        // File sources differ in type, so each arm starts its own builder
        let builder = match path {
            Some(path) => ConfigBuilder::builder().add_source(File::from(path)),
            None => ConfigBuilder::builder()
                .add_source(File::from_str(EXAMPLE_CONFIG, FileFormat::Toml)),
        };

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        let mut tags = HashSet::new();
        for id in self.languages.keys() {
            if *id != id.to_ascii_lowercase() {
                return Err(ConfigError::Invalid(format!(
                    "language id '{id}' must be lowercase"
                )));
            }
            tags.insert(id.clone());
        }

        for (id, lang) in &self.languages {
            if lang.name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty name"
                )));
            }
            if lang.extension.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty extension"
                )));
            }
            for alias in &lang.aliases {
                if !tags.insert(alias.to_ascii_lowercase()) {
                    return Err(ConfigError::Invalid(format!(
                        "language '{id}' alias '{alias}' is already in use"
                    )));
                }
            }

            if let Some(ref delegate) = lang.delegate {
                if delegate.endpoint.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "language '{id}' has empty delegate endpoint"
                    )));
                }
                // Delegated languages never run locally
                continue;
            }

            if lang.run.command.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty run command"
                )));
            }
            if let Some(ref compile) = lang.compile {
                if compile.command.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "language '{id}' has empty compile command"
                    )));
                }
                if let Some(ref entry) = compile.entry_point
                    && !is_identifier(&entry.default)
                {
                    return Err(ConfigError::Invalid(format!(
                        "language '{id}' has invalid default entry point '{}'",
                        entry.default
                    )));
                }
            }
        }

        Ok(())
    }
}
