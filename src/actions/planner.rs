//! Remediation planner - Orders the fixes of an audit
//!
//! The plan lists every pending issue carrying an action, sorted by action
//! priority. Within one priority the order issues were raised in is kept.

use serde::Serialize;

use crate::rules::results::AuditResults;
use crate::state::RepositoryState;

use super::RemediationAction;

/// One fix of a plan
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStep {
    /// Index of the owning issue in the audit results
    #[serde(skip)]
    pub issue_index: usize,
    pub rule_id: String,
    pub version: String,
    pub priority: u32,
    pub action: RemediationAction,
    pub description: String,
    pub manual_commands: Vec<String>,
}

/// Ordered list of fixes
#[derive(Debug, Clone, Default, Serialize)]
pub struct RemediationPlan {
    steps: Vec<PlannedStep>,
}

impl RemediationPlan {
    /// Build the plan for all auto-fixable issues
    pub fn from_results(results: &AuditResults, state: &RepositoryState) -> Self {
        let mut steps: Vec<PlannedStep> = results
            .issues()
            .iter()
            .enumerate()
            .filter(|(_, issue)| issue.is_auto_fixable())
            .filter_map(|(index, issue)| {
                let action = issue.remediation.as_ref()?;
                Some(PlannedStep {
                    issue_index: index,
                    rule_id: issue.rule_id.clone(),
                    version: issue.version.clone(),
                    priority: action.priority(),
                    action: action.clone(),
                    description: action.description(),
                    manual_commands: action.manual_commands(state),
                })
            })
            .collect();

        // Stable: equal priorities keep issue order
        steps.sort_by_key(|step| step.priority);
        Self { steps }
    }

    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}
