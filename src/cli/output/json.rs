//! JSON output formatting

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{CheckReport, OutputRenderer};
use crate::actions::{ExecutionSummary, PlannedStep, RemediationPlan};
use crate::error::VersionLensError;
use crate::rules::results::{AuditResults, IssueStatus, Severity, ValidationIssue};

pub struct JsonOutput;

impl JsonOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct CheckOutput<'a> {
    version: &'static str,
    generated_at: DateTime<Utc>,
    repository: &'a str,
    audit: AuditSummary<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remediation: Option<ExecutionSummary>,
    passed: bool,
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    version: &'static str,
    generated_at: DateTime<Utc>,
    repository: &'a str,
    audit: AuditSummary<'a>,
    fixes: &'a [PlannedStep],
}

#[derive(Serialize)]
struct AuditSummary<'a> {
    error_count: usize,
    warning_count: usize,
    unresolved_count: usize,
    issues: Vec<IssueOutput<'a>>,
}

#[derive(Serialize)]
struct IssueOutput<'a> {
    #[serde(flatten)]
    issue: &'a ValidationIssue,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    manual_commands: Vec<String>,
}

impl<'a> AuditSummary<'a> {
    fn new(results: &'a AuditResults, commands: impl Fn(&ValidationIssue) -> Vec<String>) -> Self {
        Self {
            error_count: results.count_by_severity(Severity::Error),
            warning_count: results.count_by_severity(Severity::Warning),
            unresolved_count: results.unresolved().count(),
            issues: results
                .issues()
                .iter()
                .map(|issue| IssueOutput {
                    issue,
                    manual_commands: commands(issue),
                })
                .collect(),
        }
    }
}

impl OutputRenderer for JsonOutput {
    fn render_check(&self, report: &CheckReport<'_>) -> Result<String, VersionLensError> {
        let output = CheckOutput {
            version: env!("CARGO_PKG_VERSION"),
            generated_at: Utc::now(),
            repository: &report.results.repository,
            audit: AuditSummary::new(report.results, |issue| {
                if matches!(
                    issue.status,
                    IssueStatus::Failed | IssueStatus::ManualFixRequired
                ) {
                    issue.manual_commands(report.state)
                } else {
                    Vec::new()
                }
            }),
            remediation: report.summary,
            passed: !report.results.has_unresolved_errors(),
        };

        Ok(serde_json::to_string_pretty(&output)?)
    }

    fn render_plan(
        &self,
        results: &AuditResults,
        plan: &RemediationPlan,
    ) -> Result<String, VersionLensError> {
        let output = PlanOutput {
            version: env!("CARGO_PKG_VERSION"),
            generated_at: Utc::now(),
            repository: &results.repository,
            audit: AuditSummary::new(results, |_| Vec::new()),
            fixes: plan.steps(),
        };

        Ok(serde_json::to_string_pretty(&output)?)
    }
}
