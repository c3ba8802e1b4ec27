//! Noise filtering for toolchain diagnostics
//!
//! Compilers and runtimes print lines on stderr that are not errors: JVM
//! launcher banners, javac notes, warning summaries. A [`NoiseFilter`] is a
//! per-language allowlist of full-line patterns that removes those lines
//! before classification.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Lines matching this are never dropped, whatever the allowlist says
///
/// Only the end is word-bounded so class names like `IOException` match.
const ERROR_SIGNAL: &str = r"(?i)(error|exception)\b";

/// Allowlist of benign diagnostic lines
///
/// Every pattern must match a whole line (patterns are anchored on
/// construction). A line that matches a pattern but also contains an error
/// signal is kept.
#[derive(Debug, Clone)]
pub struct NoiseFilter {
    patterns: Vec<Regex>,
    sources: Vec<String>,
    error_signal: Regex,
}

impl NoiseFilter {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let sources: Vec<String> = patterns.iter().map(|p| p.as_ref().to_owned()).collect();
        let patterns = sources
            .iter()
            .map(|p| Regex::new(&format!("^(?:{p})$")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            patterns,
            sources,
            error_signal: Regex::new(ERROR_SIGNAL)?,
        })
    }

    /// A filter that keeps every line
    pub fn empty() -> Self {
        Self::new::<&str>(&[]).expect("error signal pattern is valid")
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether a single line is benign noise
    pub fn is_noise(&self, line: &str) -> bool {
        let line = line.trim_end_matches('\r');
        if self.error_signal.is_match(line) {
            return false;
        }
        self.patterns.iter().any(|p| p.is_match(line))
    }

    /// Whether any line of `text` carries an error signal
    pub fn carries_error_signal(&self, text: &str) -> bool {
        text.lines().any(|line| self.error_signal.is_match(line))
    }

    /// Remove noise lines, returning what is left with trailing whitespace trimmed
    pub fn apply(&self, text: &str) -> String {
        let kept: Vec<&str> = text.lines().filter(|line| !self.is_noise(line)).collect();
        kept.join("\n").trim_end().to_owned()
    }

    /// The patterns as written in the configuration
    pub fn patterns(&self) -> &[String] {
        &self.sources
    }
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'de> Deserialize<'de> for NoiseFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let patterns = Vec::<String>::deserialize(deserializer)?;
        NoiseFilter::new(&patterns).map_err(|e| {
            de::Error::custom(format!("invalid noise pattern: {e}"))
        })
    }
}

impl Serialize for NoiseFilter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.sources.serialize(serializer)
    }
}
