//! Error types for VersionLens
//!
//! This module defines custom error types using `thiserror`. Domain conditions
//! detected by the rules (a wrong SHA, a missing release) are never errors:
//! they are reported as [`ValidationIssue`](crate::rules::results::ValidationIssue)s.
//! The types below cover configuration, I/O and transport failures only.

use thiserror::Error;

/// Main error type for VersionLens
#[derive(Error, Debug)]
pub enum VersionLensError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// GitHub API errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Local checkout scanning errors
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    /// Snapshot file errors
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while building the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A key has a value outside its allowed set
    #[error("Invalid value '{value}' for '{key}' (expected {expected})")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    /// An unknown rule category was requested
    #[error("Unknown category '{value}' for --{key} (valid: {valid})")]
    InvalidCategory {
        key: String,
        value: String,
        valid: String,
    },

    /// An ignore-versions entry is not a valid glob
    #[error("Invalid ignore-versions pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// The ignore-versions JSON array could not be parsed
    #[error("Invalid ignore-versions JSON array: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// Failed to read the configuration file
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse the configuration file
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The repository is not in `owner/name` form
    #[error("Invalid repository '{0}' (expected owner/name)")]
    InvalidRepository(String),

    /// No repository was given on the command line or in the environment
    #[error("No repository specified (use --repository or set GITHUB_REPOSITORY)")]
    MissingRepository,

    /// The API base URL is malformed
    #[error("Invalid API URL '{url}': {source}")]
    InvalidApiUrl {
        url: String,
        source: url::ParseError,
    },
}

/// Errors from the GitHub REST collaborator
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Transport-level failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status that the caller did not classify
    #[error("GitHub API returned {status} for {method} {path}: {message}")]
    Status {
        method: String,
        path: String,
        status: u16,
        message: String,
    },

    /// The API gave up after repeated throttling or server errors
    #[error("GitHub API request {method} {path} failed after {attempts} attempts")]
    RetriesExhausted {
        method: String,
        path: String,
        attempts: u32,
    },

    /// Unexpected payload shape
    #[error("Unexpected response from GitHub API: {0}")]
    InvalidResponse(String),
}

/// Errors while reading the local checkout
#[derive(Error, Debug)]
pub enum ScanError {
    /// Failed to read a file
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: String,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// The action descriptor is not valid YAML
    #[error("Failed to parse '{path}': {source}")]
    Yaml {
        path: String,
        source: serde_yaml::Error,
    },
}

/// Errors while loading or saving a repository snapshot
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Failed to read the snapshot
    #[error("Failed to read snapshot '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    /// Failed to write the snapshot
    #[error("Failed to write snapshot '{path}': {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    /// The snapshot is not valid JSON
    #[error("Malformed snapshot '{path}': {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}
