//! # Validation Results
//!
//! Typed records of detected violations and their lifecycle.
//!
//! - [`Severity`] - `error` or `warning`
//! - [`IssueStatus`] - `pending` → `fixed` | `failed` | `unfixable` | `manual_fix_required`
//! - [`IssueType`] - the violation taxonomy
//! - [`ValidationIssue`] - one violation, optionally owning its remediation
//! - [`AuditResults`] - every issue of one run, in discovery order
//!
//! ```rust
//! use versionlens::actions::RemediationAction;
//! use versionlens::rules::results::{IssueStatus, IssueType, Severity, ValidationIssue};
//!
//! let issue = ValidationIssue::new(
//!     "version_tracking/missing-major",
//!     "version_tracking",
//!     IssueType::MissingMajorVersion,
//!     Severity::Error,
//!     "v1",
//!     "Major version v1 does not exist",
//! )
//! .with_expected_sha("abc123")
//! .with_remediation(RemediationAction::CreateTag {
//!     version: "v1".into(),
//!     sha: "abc123".into(),
//! });
//!
//! assert_eq!(issue.status, IssueStatus::Pending);
//! assert!(issue.is_auto_fixable());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::actions::RemediationAction;
use crate::state::RepositoryState;

/// Severity levels for issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Fails the run while unresolved
    Error,
    /// Reported but never fails the run
    Warning,
}

impl Severity {
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "error" | "critical" => Some(Self::Error),
            "warning" | "warn" => Some(Self::Warning),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Lifecycle of an issue within one run.
///
/// `Pending` is initial; every other state is terminal for the run. Only
/// `Failed` is expected to succeed on a later run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Pending,
    Fixed,
    Failed,
    /// The platform forbids the fix (tag locked by an immutable release)
    Unfixable,
    /// A token with more permissions, or a human, has to fix it
    ManualFixRequired,
}

impl IssueStatus {
    pub fn is_terminal(self) -> bool {
        self != IssueStatus::Pending
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueStatus::Pending => "pending",
            IssueStatus::Fixed => "fixed",
            IssueStatus::Failed => "failed",
            IssueStatus::Unfixable => "unfixable",
            IssueStatus::ManualFixRequired => "manual_fix_required",
        };
        write!(f, "{}", s)
    }
}

/// Violation taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    WrongRefType,
    DuplicateRef,
    MissingMajorVersion,
    MissingMinorVersion,
    IncorrectMajorVersion,
    IncorrectMinorVersion,
    IncorrectLatestTag,
    IncorrectLatestBranch,
    DuplicateRelease,
    ReleaseOnFloatingVersion,
    MissingRelease,
    DraftRelease,
    NonImmutableRelease,
    WrongLatestRelease,
    MissingActionMetadata,
    MissingActionName,
    MissingActionDescription,
    MissingActionBranding,
    MissingReadme,
}

impl IssueType {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueType::WrongRefType => "wrong_ref_type",
            IssueType::DuplicateRef => "duplicate_ref",
            IssueType::MissingMajorVersion => "missing_major_version",
            IssueType::MissingMinorVersion => "missing_minor_version",
            IssueType::IncorrectMajorVersion => "incorrect_major_version",
            IssueType::IncorrectMinorVersion => "incorrect_minor_version",
            IssueType::IncorrectLatestTag => "incorrect_latest_tag",
            IssueType::IncorrectLatestBranch => "incorrect_latest_branch",
            IssueType::DuplicateRelease => "duplicate_release",
            IssueType::ReleaseOnFloatingVersion => "release_on_floating_version",
            IssueType::MissingRelease => "missing_release",
            IssueType::DraftRelease => "draft_release",
            IssueType::NonImmutableRelease => "non_immutable_release",
            IssueType::WrongLatestRelease => "wrong_latest_release",
            IssueType::MissingActionMetadata => "missing_action_metadata",
            IssueType::MissingActionName => "missing_action_name",
            IssueType::MissingActionDescription => "missing_action_description",
            IssueType::MissingActionBranding => "missing_action_branding",
            IssueType::MissingReadme => "missing_readme",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single detected violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Rule that raised the issue, e.g. `latest/incorrect-latest-tag`
    pub rule_id: String,

    /// Rule category, e.g. `latest`
    pub category: String,

    #[serde(rename = "type")]
    pub issue_type: IssueType,

    pub severity: Severity,

    pub message: String,

    /// Version name the issue is about
    pub version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_sha: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_sha: Option<String>,

    pub status: IssueStatus,

    /// The single mutation that would fix this issue
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<RemediationAction>,
}

impl ValidationIssue {
    /// Create a new pending issue
    pub fn new(
        rule_id: impl Into<String>,
        category: impl Into<String>,
        issue_type: IssueType,
        severity: Severity,
        version: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            category: category.into(),
            issue_type,
            severity,
            message: message.into(),
            version: version.into(),
            current_sha: None,
            expected_sha: None,
            status: IssueStatus::Pending,
            remediation: None,
        }
    }

    pub fn with_current_sha(mut self, sha: impl Into<String>) -> Self {
        self.current_sha = Some(sha.into());
        self
    }

    pub fn with_expected_sha(mut self, sha: impl Into<String>) -> Self {
        self.expected_sha = Some(sha.into());
        self
    }

    pub fn with_remediation(mut self, action: RemediationAction) -> Self {
        self.remediation = Some(action);
        self
    }

    pub fn with_status(mut self, status: IssueStatus) -> Self {
        self.status = status;
        self
    }

    /// Pending with an attached action
    pub fn is_auto_fixable(&self) -> bool {
        self.status == IssueStatus::Pending && self.remediation.is_some()
    }

    pub fn is_resolved(&self) -> bool {
        self.status == IssueStatus::Fixed
    }

    /// Commands a human could run to fix the issue. Empty when the issue is
    /// unfixable or has no action.
    pub fn manual_commands(&self, state: &RepositoryState) -> Vec<String> {
        if self.status == IssueStatus::Unfixable {
            return Vec::new();
        }
        self.remediation
            .as_ref()
            .map(|action| action.manual_commands(state))
            .unwrap_or_default()
    }
}

/// All issues of one audit run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResults {
    /// `owner/name` of the audited repository
    pub repository: String,

    issues: Vec<ValidationIssue>,
}

impl AuditResults {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            issues: Vec::new(),
        }
    }

    pub fn add_issues(&mut self, issues: impl IntoIterator<Item = ValidationIssue>) {
        self.issues.extend(issues);
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn issues_mut(&mut self) -> &mut [ValidationIssue] {
        &mut self.issues
    }

    pub fn issues_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a ValidationIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn count_by_status(&self, status: IssueStatus) -> usize {
        self.issues.iter().filter(|i| i.status == status).count()
    }

    /// Issues that are not fixed
    pub fn unresolved(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| !i.is_resolved())
    }

    /// Any `error` issue still unresolved; drives the exit status
    pub fn has_unresolved_errors(&self) -> bool {
        self.unresolved().any(|i| i.severity == Severity::Error)
    }

    pub fn total_count(&self) -> usize {
        self.issues.len()
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RepoContext;

    fn issue(severity: Severity) -> ValidationIssue {
        ValidationIssue::new(
            "releases/missing-release",
            "releases",
            IssueType::MissingRelease,
            severity,
            "v1.0.0",
            "Missing release",
        )
    }

    #[test]
    fn test_issue_builder() {
        let issue = issue(Severity::Error)
            .with_current_sha("old")
            .with_expected_sha("new");
        assert_eq!(issue.current_sha.as_deref(), Some("old"));
        assert_eq!(issue.expected_sha.as_deref(), Some("new"));
        assert_eq!(issue.status, IssueStatus::Pending);
        assert!(!issue.is_auto_fixable());
    }

    #[test]
    fn test_manual_commands_empty_when_unfixable() {
        let state = RepositoryState::new(RepoContext::new("o", "r"));
        let mut issue = issue(Severity::Error).with_remediation(RemediationAction::CreateRelease {
            tag: "v1.0.0".into(),
            draft: false,
            make_latest: Some(true),
        });
        assert!(!issue.manual_commands(&state).is_empty());

        issue.status = IssueStatus::Unfixable;
        assert!(issue.manual_commands(&state).is_empty());
    }

    #[test]
    fn test_issue_type_serializes_snake_case() {
        let json = serde_json::to_string(&issue(Severity::Warning)).unwrap();
        assert!(json.contains(r#""type":"missing_release""#));
        assert!(json.contains(r#""status":"pending""#));
        assert!(json.contains(r#""severity":"warning""#));
        assert_eq!(IssueType::IncorrectLatestTag.to_string(), "incorrect_latest_tag");
    }

    #[test]
    fn test_unresolved_errors() {
        let mut results = AuditResults::new("o/r");
        results.add_issues(vec![issue(Severity::Warning)]);
        assert!(!results.has_unresolved_errors());

        results.add_issues(vec![issue(Severity::Error).with_status(IssueStatus::Fixed)]);
        assert!(!results.has_unresolved_errors());

        results.add_issues(vec![issue(Severity::Error).with_status(IssueStatus::Failed)]);
        assert!(results.has_unresolved_errors());
        assert_eq!(results.count_by_status(IssueStatus::Failed), 1);
        assert_eq!(results.count_by_severity(Severity::Error), 2);
        assert_eq!(results.total_count(), 3);
    }

    #[test]
    fn test_severity_from_string() {
        assert_eq!(Severity::from_string("ERROR"), Some(Severity::Error));
        assert_eq!(Severity::from_string("warn"), Some(Severity::Warning));
        assert_eq!(Severity::from_string("info"), None);
    }
}
