//! Entry-point name derivation for compiled languages
//!
//! Some toolchains require the source file to be named after the public
//! identifier it declares (a Java `public class Foo` must live in `Foo.java`).
//! The name is taken from the first match of a configured pattern. When the
//! pattern does not match, or captures something that is not a plain
//! identifier, the configured default is used instead.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Pattern whose first capture group is the entry-point identifier
#[derive(Debug, Clone)]
pub struct EntryPointPattern(Regex);

impl EntryPointPattern {
    pub fn new(pattern: &str) -> Result<Self, String> {
        let regex = Regex::new(pattern).map_err(|e| e.to_string())?;
        if regex.captures_len() < 2 {
            return Err(format!(
                "entry point pattern '{pattern}' must have a capture group"
            ));
        }
        Ok(Self(regex))
    }

    /// First captured identifier in `source`, if it is a valid identifier
    pub fn find(&self, source: &str) -> Option<String> {
        let name = self.0.captures(source)?.get(1)?.as_str();
        is_identifier(name).then(|| name.to_owned())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Derive the entry name for `source`, falling back to `default`
pub fn derive_entry_name(source: &str, pattern: &EntryPointPattern, default: &str) -> String {
    pattern
        .find(source)
        .unwrap_or_else(|| default.to_owned())
}

/// ASCII identifier usable as a file stem: letter, `_` or `$`, then word characters
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    name.len() <= 255 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

impl<'de> Deserialize<'de> for EntryPointPattern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EntryPointPattern::new(&s).map_err(de::Error::custom)
    }
}

impl Serialize for EntryPointPattern {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
