//! GitHub Actions workflow command output
//!
//! Each unresolved issue becomes an `::error` or `::warning` annotation;
//! fixed issues become `::notice` lines so the job log shows what changed.

use super::{CheckReport, OutputRenderer};
use crate::actions::RemediationPlan;
use crate::error::VersionLensError;
use crate::rules::results::{AuditResults, IssueStatus, Severity, ValidationIssue};

pub struct GitHubAnnotations;

impl GitHubAnnotations {
    pub fn new() -> Self {
        Self
    }

    fn annotation(&self, issue: &ValidationIssue, commands: &[String]) -> String {
        let level = match (issue.status, issue.severity) {
            (IssueStatus::Fixed, _) => "notice",
            (_, Severity::Error) => "error",
            (_, Severity::Warning) => "warning",
        };

        let title = if issue.version.is_empty() {
            issue.rule_id.clone()
        } else {
            format!("{} ({})", issue.rule_id, issue.version)
        };

        let mut message = issue.message.clone();
        if issue.status.is_terminal() {
            message.push_str(&format!(" [{}]", issue.status));
        }
        if !commands.is_empty() {
            message.push_str("\nManual fix:\n");
            message.push_str(&commands.join("\n"));
        }

        format!(
            "::{} title={}::{}",
            level,
            escape_property(&title),
            escape_data(&message)
        )
    }
}

impl Default for GitHubAnnotations {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape a workflow command message
fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Escape a workflow command property value
fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}

impl OutputRenderer for GitHubAnnotations {
    fn render_check(&self, report: &CheckReport<'_>) -> Result<String, VersionLensError> {
        let mut lines: Vec<String> = report
            .results
            .issues()
            .iter()
            .map(|issue| {
                let commands = match issue.status {
                    IssueStatus::Failed | IssueStatus::ManualFixRequired => {
                        issue.manual_commands(report.state)
                    }
                    _ => Vec::new(),
                };
                self.annotation(issue, &commands)
            })
            .collect();

        if let Some(summary) = &report.summary {
            lines.push(format!(
                "::notice title=versionlens::{}",
                escape_data(&format!(
                    "{} fixed, {} failed, {} unfixable, {} need a manual fix",
                    summary.fixed, summary.failed, summary.unfixable, summary.manual_fix_required
                ))
            ));
        }

        Ok(lines.join("\n"))
    }

    fn render_plan(
        &self,
        results: &AuditResults,
        plan: &RemediationPlan,
    ) -> Result<String, VersionLensError> {
        let mut lines: Vec<String> = results
            .issues()
            .iter()
            .map(|issue| self.annotation(issue, &[]))
            .collect();

        lines.extend(plan.steps().iter().map(|step| {
            format!(
                "::notice title={}::{}",
                escape_property(&format!("planned fix ({})", step.version)),
                escape_data(&step.description)
            )
        }));

        Ok(lines.join("\n"))
    }
}
