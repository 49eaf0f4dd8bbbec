//! Terminal output formatting with colors

use colored::Colorize;

use super::{CheckReport, OutputRenderer};
use crate::actions::{ExecutionSummary, RemediationPlan};
use crate::error::VersionLensError;
use crate::rules::results::{AuditResults, IssueStatus, Severity, ValidationIssue};
use crate::state::RepositoryState;

pub struct TerminalOutput;

impl TerminalOutput {
    pub fn new() -> Self {
        Self
    }

    fn format_header(&self, repository: &str) -> String {
        format!(
            "\n{} v{}\n\n{} {}\n",
            "versionlens".cyan().bold(),
            env!("CARGO_PKG_VERSION"),
            "Repository:".dimmed(),
            repository.white().bold(),
        )
    }

    fn section(&self, title: &str) -> String {
        format!("\n{}\n{}\n\n", "━".repeat(50).dimmed(), format!("  {}", title).bold())
    }

    fn format_issues(&self, results: &AuditResults, state: &RepositoryState) -> String {
        let mut output = self.section("AUDIT RESULTS");

        if results.is_clean() {
            output.push_str(&format!("  {}\n", "No issues found.".green()));
            return output;
        }

        let groups = [
            (Severity::Error, "✖ ERRORS".red().bold()),
            (Severity::Warning, "⚠ WARNINGS".yellow().bold()),
        ];
        for (severity, label) in groups {
            let issues: Vec<_> = results
                .issues()
                .iter()
                .filter(|i| i.severity == severity)
                .collect();
            if issues.is_empty() {
                continue;
            }
            output.push_str(&format!("{} ({})\n", label, issues.len()));
            for issue in issues {
                output.push_str(&self.format_issue(issue, state));
            }
            output.push('\n');
        }

        output
    }

    fn format_issue(&self, issue: &ValidationIssue, state: &RepositoryState) -> String {
        let mut output = format!(
            "  {} [{}] {}{}\n",
            "•".dimmed(),
            issue.rule_id.cyan(),
            issue.message,
            self.format_status(issue.status),
        );

        if matches!(
            issue.status,
            IssueStatus::Failed | IssueStatus::ManualFixRequired
        ) {
            for command in issue.manual_commands(state) {
                output.push_str(&format!("    {} {}\n", "└─".dimmed(), command.dimmed()));
            }
        }

        output
    }

    fn format_status(&self, status: IssueStatus) -> String {
        match status {
            IssueStatus::Pending => String::new(),
            IssueStatus::Fixed => format!(" {}", "(fixed)".green()),
            IssueStatus::Failed => format!(" {}", "(fix failed)".red()),
            IssueStatus::Unfixable => format!(" {}", "(unfixable)".red()),
            IssueStatus::ManualFixRequired => format!(" {}", "(manual fix required)".yellow()),
        }
    }

    fn format_actions(&self, plan: &RemediationPlan) -> String {
        let mut output = self.section("PLANNED FIXES");

        if plan.is_empty() {
            output.push_str(&format!("  {}\n", "No fixes required.".green()));
            return output;
        }

        output.push_str("The following changes will be applied, in order:\n\n");

        for step in plan.steps() {
            output.push_str(&format!(
                "  {} [{}] {}\n",
                "+".green(),
                step.rule_id.cyan(),
                step.description
            ));
            for command in &step.manual_commands {
                output.push_str(&format!("      {} {}\n", "└─".dimmed(), command.dimmed()));
            }
        }

        output
    }

    fn format_summary(
        &self,
        results: &AuditResults,
        summary: Option<&ExecutionSummary>,
        hint: bool,
    ) -> String {
        let mut output = self.section("SUMMARY");

        let errors = results.count_by_severity(Severity::Error);
        let warnings = results.count_by_severity(Severity::Warning);
        output.push_str(&format!(
            "Errors: {} │ Warnings: {}\n",
            errors.to_string().red().bold(),
            warnings.to_string().yellow().bold(),
        ));

        if let Some(summary) = summary {
            output.push_str(&format!(
                "Fixed: {} │ Failed: {} │ Unfixable: {} │ Manual: {}\n",
                summary.fixed.to_string().green().bold(),
                summary.failed.to_string().red().bold(),
                summary.unfixable.to_string().red().bold(),
                summary.manual_fix_required.to_string().yellow().bold(),
            ));
        }

        if results.has_unresolved_errors() {
            output.push_str(&format!(
                "\n{} Unresolved errors remain.\n",
                "✖".red().bold()
            ));
        } else {
            output.push_str(&format!("\n{} No unresolved errors.\n", "✔".green().bold()));
        }

        if hint && results.issues().iter().any(|i| i.is_auto_fixable()) {
            output.push_str(&format!(
                "\nRun '{}' to apply the fixes.\n",
                "versionlens fix".cyan()
            ));
        }

        output
    }
}

impl Default for TerminalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputRenderer for TerminalOutput {
    fn render_check(&self, report: &CheckReport<'_>) -> Result<String, VersionLensError> {
        let mut output = String::new();

        output.push_str(&self.format_header(&report.results.repository));
        output.push_str(&self.format_issues(report.results, report.state));
        output.push_str(&self.format_summary(
            report.results,
            report.summary.as_ref(),
            report.summary.is_none(),
        ));

        Ok(output)
    }

    fn render_plan(
        &self,
        results: &AuditResults,
        plan: &RemediationPlan,
    ) -> Result<String, VersionLensError> {
        let mut output = String::new();

        output.push_str(&self.format_header(&results.repository));
        output.push_str(&self.format_actions(plan));
        output.push_str(&self.format_summary(results, None, true));

        Ok(output)
    }
}
