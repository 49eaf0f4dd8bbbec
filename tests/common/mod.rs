//! Shared helpers for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use versionlens::actions::{ExecutionSummary, RemediationExecutor};
use versionlens::config::{Config, ConfigInputs};
use versionlens::providers::memory::MemoryGitHub;
use versionlens::rules::{AuditResults, RulesEngine};
use versionlens::state::{RepoContext, RepositoryState};

pub const SHA1: &str = "1111111111111111111111111111111111111111";
pub const SHA2: &str = "2222222222222222222222222222222222222222";
pub const SHA3: &str = "3333333333333333333333333333333333333333";

pub fn context() -> RepoContext {
    RepoContext::new("octo", "action")
}

pub fn config(pairs: &[(&str, &str)]) -> Config {
    let inputs: ConfigInputs = pairs.iter().copied().collect();
    Config::from_inputs(&inputs).unwrap()
}

/// Fetch the current state of `api` and audit it
pub async fn audit(api: &MemoryGitHub, config: &Config) -> (AuditResults, RepositoryState) {
    let state = RepositoryState::fetch(api, context(), config).await.unwrap();
    let results = RulesEngine::new(config.clone()).run(&state);
    (results, state)
}

/// One full run: fetch, audit, remediate
pub async fn audit_and_fix(
    api: &MemoryGitHub,
    config: &Config,
) -> (AuditResults, ExecutionSummary) {
    let (mut results, mut state) = audit(api, config).await;
    let summary = RemediationExecutor::new(api)
        .execute(&mut results, &mut state)
        .await;
    (results, summary)
}

/// Write a snapshot file into a fresh temp dir
pub fn write_snapshot(json: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("state.json");
    fs::write(&path, json).unwrap();
    (temp_dir, path)
}
