//! Output formatting module for CLI

mod github;
pub mod json;
mod terminal;

pub use github::GitHubAnnotations;
pub use json::JsonOutput;
pub use terminal::TerminalOutput;

use super::commands::OutputFormat;
use crate::actions::{ExecutionSummary, RemediationPlan};
use crate::error::VersionLensError;
use crate::rules::results::AuditResults;
use crate::state::RepositoryState;

/// Everything a `check` run reports
pub struct CheckReport<'a> {
    pub results: &'a AuditResults,
    pub state: &'a RepositoryState,
    /// Present when fixes were attempted
    pub summary: Option<ExecutionSummary>,
}

/// Trait for rendering command output
pub trait OutputRenderer {
    fn render_check(&self, report: &CheckReport<'_>) -> Result<String, VersionLensError>;

    fn render_plan(
        &self,
        results: &AuditResults,
        plan: &RemediationPlan,
    ) -> Result<String, VersionLensError>;
}

/// Renderer for an output format
pub fn renderer(format: OutputFormat) -> Box<dyn OutputRenderer> {
    match format {
        OutputFormat::Terminal => Box::new(TerminalOutput::new()),
        OutputFormat::Json => Box::new(JsonOutput::new()),
        OutputFormat::Github => Box::new(GitHubAnnotations::new()),
    }
}
