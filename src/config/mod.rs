//! Configuration module
//!
//! The engine reads a single typed [`Config`]. It is assembled once at startup
//! from a flat string-keyed map (see [`loader`]) and never mutated afterwards.

pub mod loader;

pub use loader::{Config, ConfigInputs, CONFIG_FILENAME};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Serialize, Serializer};

use crate::error::ConfigError;
use crate::rules::results::Severity;

/// How strictly an optional rule family is enforced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckLevel {
    Error,
    Warning,
    None,
}

impl CheckLevel {
    /// Parse `error`, `warning` or `none`; `true`/`false` are accepted as
    /// shorthands for `error`/`none`.
    pub fn parse(key: &str, value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_lowercase().as_str() {
            "error" | "true" => Ok(Self::Error),
            "warning" | "warn" => Ok(Self::Warning),
            "none" | "false" | "off" => Ok(Self::None),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
                expected: "error, warning or none",
            }),
        }
    }

    pub fn is_enabled(self) -> bool {
        self != Self::None
    }

    /// Severity of issues raised under this level
    pub fn severity(self) -> Severity {
        match self {
            Self::Warning => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// Compiled `ignore-versions` list.
///
/// Entries are globs; an entry without glob metacharacters matches only the
/// exact name.
#[derive(Debug, Clone)]
pub struct IgnoreVersions {
    patterns: Vec<String>,
    matcher: GlobSet,
}

impl IgnoreVersions {
    /// Compile the given patterns
    pub fn new(patterns: Vec<String>) -> Result<Self, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            builder.add(glob);
        }

        let matcher = builder.build().map_err(|e| ConfigError::InvalidPattern {
            pattern: patterns.join(","),
            message: e.to_string(),
        })?;

        Ok(Self { patterns, matcher })
    }

    /// Parse the raw input form: a JSON array, or a comma/newline separated list
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        let patterns: Vec<String> = if trimmed.starts_with('[') {
            serde_json::from_str::<Vec<String>>(trimmed).map_err(ConfigError::InvalidJson)?
        } else {
            trimmed
                .split([',', '\n'])
                .map(|s| s.to_string())
                .collect()
        };

        let patterns = patterns
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        Self::new(patterns)
    }

    /// Check whether a version name is ignored
    pub fn is_ignored(&self, version: &str) -> bool {
        !self.patterns.is_empty() && self.matcher.is_match(version)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for IgnoreVersions {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            matcher: GlobSet::empty(),
        }
    }
}

impl Serialize for IgnoreVersions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.patterns.serialize(serializer)
    }
}

pub(crate) fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: "true or false",
        }),
    }
}
