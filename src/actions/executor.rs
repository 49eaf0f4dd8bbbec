//! Remediation executor - Applies the fixes of an audit
//!
//! Actions run one at a time in plan order. Each outcome is written back
//! into the issue that owns the action; a failure never stops the run.

use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

use crate::providers::GitHubApi;
use crate::rules::results::{AuditResults, IssueStatus, ValidationIssue};
use crate::state::RepositoryState;

use super::planner::RemediationPlan;
use super::ActionOutcome;

/// Counts of one remediation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    pub attempted: usize,
    pub fixed: usize,
    pub failed: usize,
    pub unfixable: usize,
    pub manual_fix_required: usize,
}

impl ExecutionSummary {
    fn record(&mut self, outcome: ActionOutcome) {
        self.attempted += 1;
        match outcome {
            ActionOutcome::Succeeded => self.fixed += 1,
            ActionOutcome::Failed => self.failed += 1,
            ActionOutcome::Unfixable => self.unfixable += 1,
            ActionOutcome::RequiresManualFix => self.manual_fix_required += 1,
        }
    }
}

/// Applies remediation actions through a [`GitHubApi`]
pub struct RemediationExecutor<'a> {
    api: &'a dyn GitHubApi,
}

impl<'a> RemediationExecutor<'a> {
    pub fn new(api: &'a dyn GitHubApi) -> Self {
        Self { api }
    }

    /// Execute every auto-fixable issue of `results`, updating issue statuses
    /// and `state` as actions succeed.
    pub async fn execute(
        &self,
        results: &mut AuditResults,
        state: &mut RepositoryState,
    ) -> ExecutionSummary {
        let plan = RemediationPlan::from_results(results, state);
        let mut summary = ExecutionSummary::default();

        for step in plan.steps() {
            let span = info_span!("remediate", version = %step.version, priority = step.priority);
            info!("Executing: {}", step.description);
            let outcome = step.action.apply(self.api, state).instrument(span).await;
            summary.record(outcome);

            if let Some(issue) = results.issues_mut().get_mut(step.issue_index) {
                record_outcome(issue, outcome);
            }
        }

        info!(
            "Remediation finished: {} fixed, {} failed, {} unfixable, {} need a manual fix",
            summary.fixed, summary.failed, summary.unfixable, summary.manual_fix_required
        );
        summary
    }
}

/// Write an action outcome into its issue
pub fn record_outcome(issue: &mut ValidationIssue, outcome: ActionOutcome) {
    match outcome {
        ActionOutcome::Succeeded => issue.status = IssueStatus::Fixed,
        ActionOutcome::Failed => {
            warn!("Could not fix {} ({})", issue.version, issue.rule_id);
            issue.status = IssueStatus::Failed;
        }
        ActionOutcome::Unfixable => {
            issue.status = IssueStatus::Unfixable;
            issue.message = format!(
                "{}. This cannot be fixed: an immutable release permanently locks the tag. \
                 Add {} to ignore-versions to skip it.",
                issue.message, issue.version
            );
        }
        ActionOutcome::RequiresManualFix => {
            issue.status = IssueStatus::ManualFixRequired;
            issue.message = format!(
                "{}. The token lacks the workflows permission needed to move refs onto commits \
                 that change workflow files. Use a personal access token or GitHub App token \
                 with that permission, or run the manual commands.",
                issue.message
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::RemediationAction;
    use crate::providers::memory::{Fault, MemoryGitHub};
    use crate::rules::results::{IssueType, Severity};
    use crate::state::RepoContext;
    use crate::version::RefType;

    fn issue(version: &str, action: RemediationAction) -> ValidationIssue {
        ValidationIssue::new(
            "version_tracking/missing-major",
            "version_tracking",
            IssueType::MissingMajorVersion,
            Severity::Error,
            version,
            format!("{} is missing", version),
        )
        .with_remediation(action)
    }

    #[tokio::test]
    async fn test_execute_updates_statuses_and_state() {
        let api = MemoryGitHub::new()
            .with_tag("v1.0.0", "abc")
            .with_fault("refs/tags/v1.0", Fault::Fail);
        let mut state = RepositoryState::new(RepoContext::new("octo", "action"))
            .with_tag("v1.0.0", "abc");
        let mut results = AuditResults::new("octo/action");
        results.add_issues(vec![
            issue("v1", RemediationAction::push_ref(RefType::Tag, "v1", "abc", false)),
            issue(
                "v1.0",
                RemediationAction::push_ref(RefType::Tag, "v1.0", "abc", false),
            ),
        ]);

        let summary = RemediationExecutor::new(&api)
            .execute(&mut results, &mut state)
            .await;

        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.fixed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(results.issues()[0].status, IssueStatus::Fixed);
        assert_eq!(results.issues()[1].status, IssueStatus::Failed);
        assert!(state.find_ref("v1", RefType::Tag).is_some());
        assert!(state.find_ref("v1.0", RefType::Tag).is_none());
    }

    #[tokio::test]
    async fn test_execute_runs_in_priority_order() {
        let api = MemoryGitHub::new()
            .with_branch("v1", "abc")
            .with_release(crate::state::ReleaseInfo::new("v1.0.0", 1));
        let mut state = RepositoryState::new(RepoContext::new("octo", "action"))
            .with_branch("v1", "abc");
        let mut results = AuditResults::new("octo/action");
        results.add_issues(vec![
            issue(
                "v1.0.0",
                RemediationAction::SetLatestRelease {
                    tag: "v1.0.0".into(),
                    release_id: 1,
                },
            ),
            issue("v1", RemediationAction::push_ref(RefType::Tag, "v1", "abc", false)),
            issue("v1", RemediationAction::delete_ref(RefType::Branch, "v1")),
        ]);

        RemediationExecutor::new(&api)
            .execute(&mut results, &mut state)
            .await;

        assert_eq!(
            api.calls().await,
            vec![
                "delete_ref refs/heads/v1",
                "create_or_move_ref refs/tags/v1",
                "set_release_latest v1.0.0"
            ]
        );
    }

    #[test]
    fn test_record_unfixable_mentions_ignore_versions() {
        let mut issue = issue(
            "v1.0.0",
            RemediationAction::CreateRelease {
                tag: "v1.0.0".into(),
                draft: false,
                make_latest: None,
            },
        );
        record_outcome(&mut issue, ActionOutcome::Unfixable);

        assert_eq!(issue.status, IssueStatus::Unfixable);
        assert!(issue.message.contains("ignore-versions"));
    }

    #[test]
    fn test_record_manual_fix_mentions_permission() {
        let mut issue = issue("v1", RemediationAction::push_ref(RefType::Tag, "v1", "a", true));
        record_outcome(&mut issue, ActionOutcome::RequiresManualFix);

        assert_eq!(issue.status, IssueStatus::ManualFixRequired);
        assert!(issue.message.contains("workflows"));
        assert!(issue.message.contains("permission"));
    }
}
