//! Configuration loader
//!
//! Inputs are merged from three layers, lowest priority first:
//!
//! 1. `.versionlens.toml` (a flat table using the same keys as the action inputs)
//! 2. `INPUT_*` environment variables and CLI flags (collected by `clap`)
//! 3. Explicit overrides passed by the caller
//!
//! The merged flat map is then validated once by [`Config::from_inputs`].

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::ConfigError;
use crate::version::RefType;

use super::{parse_bool, CheckLevel, IgnoreVersions};

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILENAME: &str = ".versionlens.toml";

pub const KEY_FLOATING_VERSIONS_USE: &str = "floating-versions-use";
pub const KEY_IGNORE_PREVIEW_RELEASES: &str = "ignore-preview-releases";
pub const KEY_CHECK_MINOR_VERSION: &str = "check-minor-version";
pub const KEY_CHECK_RELEASES: &str = "check-releases";
pub const KEY_CHECK_RELEASE_IMMUTABILITY: &str = "check-release-immutability";
pub const KEY_CHECK_MARKETPLACE: &str = "check-marketplace";
pub const KEY_IGNORE_VERSIONS: &str = "ignore-versions";
pub const KEY_AUTO_FIX: &str = "auto-fix";

/// All recognised input keys
pub const KNOWN_KEYS: &[&str] = &[
    KEY_FLOATING_VERSIONS_USE,
    KEY_IGNORE_PREVIEW_RELEASES,
    KEY_CHECK_MINOR_VERSION,
    KEY_CHECK_RELEASES,
    KEY_CHECK_RELEASE_IMMUTABILITY,
    KEY_CHECK_MARKETPLACE,
    KEY_IGNORE_VERSIONS,
    KEY_AUTO_FIX,
];

/// Validated engine configuration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Ref kind that floating aliases (`vX`, `vX.Y`, `latest`) must use
    pub floating_versions_use: RefType,

    /// Exclude prerelease-backed patches when resolving the highest patch
    pub ignore_preview_releases: bool,

    /// Require and track `vX.Y` aliases
    pub check_minor_version: bool,

    pub check_releases: CheckLevel,

    pub check_release_immutability: CheckLevel,

    pub check_marketplace: CheckLevel,

    pub ignore_versions: IgnoreVersions,

    /// Execute remediation actions after the audit
    pub auto_fix: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            floating_versions_use: RefType::Tag,
            ignore_preview_releases: true,
            check_minor_version: true,
            check_releases: CheckLevel::Error,
            check_release_immutability: CheckLevel::Error,
            check_marketplace: CheckLevel::None,
            ignore_versions: IgnoreVersions::default(),
            auto_fix: false,
        }
    }
}

impl Config {
    /// Build a configuration from a flat key/value map.
    ///
    /// Missing keys keep their defaults, empty values count as missing, and
    /// unknown keys are ignored with a debug log.
    pub fn from_inputs(inputs: &ConfigInputs) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (key, value) in inputs.iter() {
            if value.trim().is_empty() {
                continue;
            }

            match key {
                KEY_FLOATING_VERSIONS_USE => {
                    config.floating_versions_use = parse_ref_kind(key, value)?;
                }
                KEY_IGNORE_PREVIEW_RELEASES => {
                    config.ignore_preview_releases = parse_bool(key, value)?;
                }
                KEY_CHECK_MINOR_VERSION => {
                    config.check_minor_version = parse_bool(key, value)?;
                }
                KEY_CHECK_RELEASES => {
                    config.check_releases = CheckLevel::parse(key, value)?;
                }
                KEY_CHECK_RELEASE_IMMUTABILITY => {
                    config.check_release_immutability = CheckLevel::parse(key, value)?;
                }
                KEY_CHECK_MARKETPLACE => {
                    config.check_marketplace = CheckLevel::parse(key, value)?;
                }
                KEY_IGNORE_VERSIONS => {
                    config.ignore_versions = IgnoreVersions::parse(value)?;
                }
                KEY_AUTO_FIX => {
                    config.auto_fix = parse_bool(key, value)?;
                }
                other => debug!(key = other, "Ignoring unknown configuration key"),
            }
        }

        Ok(config)
    }

    /// Check whether a version name is on the ignore list
    pub fn is_ignored(&self, version: &str) -> bool {
        self.ignore_versions.is_ignored(version)
    }
}

fn parse_ref_kind(key: &str, value: &str) -> Result<RefType, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "tags" | "tag" => Ok(RefType::Tag),
        "branches" | "branch" => Ok(RefType::Branch),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: "tags or branches",
        }),
    }
}

/// Flat, string-keyed configuration map prior to validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigInputs {
    values: BTreeMap<String, String>,
}

impl ConfigInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key, replacing any lower-priority value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Set a key only when a value is present
    pub fn set_opt(&mut self, key: &str, value: Option<impl Into<String>>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay `other` on top of `self`
    pub fn merge(&mut self, other: ConfigInputs) {
        self.values.extend(other.values);
    }

    /// Parse a TOML document containing a flat table of inputs
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let table: BTreeMap<String, toml::Value> = toml::from_str(content)?;
        let mut inputs = Self::new();

        for (key, value) in table {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Array(items) => items
                    .into_iter()
                    .map(|item| match item {
                        toml::Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(","),
                other => other.to_string(),
            };
            inputs.set(key, value);
        }

        Ok(inputs)
    }

    /// Load inputs from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_toml_str(&content)
    }

    /// Load the explicit file, or the default file in `dir` if present
    pub fn load_or_default(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }

        let default_path = dir.join(CONFIG_FILENAME);
        if default_path.exists() {
            debug!(path = %default_path.display(), "Loading configuration file");
            Self::load_from_file(&default_path)
        } else {
            Ok(Self::new())
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigInputs {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut inputs = Self::new();
        for (k, v) in iter {
            inputs.set(k, v);
        }
        inputs
    }
}
