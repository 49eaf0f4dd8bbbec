//! VersionLens Library
//!
//! Audits the version refs and releases of a GitHub Action repository and
//! repairs what can be repaired.
//!
//! The pipeline has three stages:
//!
//! 1. [`state::RepositoryState`] is fetched through a [`providers::GitHubApi`]
//!    (or loaded from a JSON snapshot).
//! 2. [`rules::RulesEngine`] runs every enabled rule over the state and
//!    returns typed [`rules::ValidationIssue`]s, each carrying at most one
//!    [`actions::RemediationAction`].
//! 3. [`actions::RemediationExecutor`] applies those actions in priority
//!    order and records each outcome on its issue.

pub mod actions;
pub mod cli;
pub mod config;
pub mod error;
pub mod providers;
pub mod rules;
pub mod scanner;
pub mod state;
pub mod version;

pub use error::VersionLensError;
