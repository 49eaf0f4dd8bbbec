//! Ref type rules
//!
//! Patch versions must be tags. Floating aliases (`vX`, `vX.Y`, `latest`)
//! must be the ref kind selected by `floating-versions-use`. When a version
//! exists as both a tag and a branch, the duplicate rules own the fix and
//! the conversion rules pass.

use crate::actions::RemediationAction;
use crate::config::Config;
use crate::rules::engine::{Candidate, Rule};
use crate::rules::results::{IssueType, Severity, ValidationIssue};
use crate::state::RepositoryState;
use crate::version::{RefType, VersionRef};

pub const CATEGORY: &str = "ref_type";

pub fn rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(PatchBranchShouldBeTag),
        Box::new(FloatingRefType {
            mandated: RefType::Tag,
        }),
        Box::new(FloatingRefType {
            mandated: RefType::Branch,
        }),
        Box::new(DuplicatePatchRef),
        Box::new(DuplicateFloatingRef),
    ]
}

fn describe_ref(r: &VersionRef) -> &'static str {
    if r.is_patch() {
        "Patch version"
    } else if r.is_latest() {
        "Alias"
    } else {
        "Floating version"
    }
}

/// Active refs of one kind matching a predicate
fn refs_where(
    state: &RepositoryState,
    ref_type: RefType,
    predicate: impl Fn(&VersionRef) -> bool,
) -> Vec<Candidate> {
    state
        .refs_of(ref_type)
        .iter()
        .filter(|&r| !r.is_ignored && predicate(r))
        .cloned()
        .map(Candidate::Ref)
        .collect()
}

fn has_ref(state: &RepositoryState, candidate: &Candidate, ref_type: RefType) -> bool {
    state.find_ref(candidate.version(), ref_type).is_some()
}

/// A `vX.Y.Z` branch with no tag of the same name
struct PatchBranchShouldBeTag;

impl Rule for PatchBranchShouldBeTag {
    fn id(&self) -> &'static str {
        "ref_type/patch-branch-should-be-tag"
    }

    fn category(&self) -> &'static str {
        CATEGORY
    }

    fn priority(&self) -> u32 {
        10
    }

    fn candidates(&self, state: &RepositoryState, _config: &Config) -> Vec<Candidate> {
        refs_where(state, RefType::Branch, VersionRef::is_patch)
    }

    fn check(&self, candidate: &Candidate, state: &RepositoryState, _config: &Config) -> bool {
        has_ref(state, candidate, RefType::Tag)
    }

    fn describe(
        &self,
        candidate: &Candidate,
        _state: &RepositoryState,
        _config: &Config,
    ) -> ValidationIssue {
        let version = candidate.version();
        let sha = candidate.current_sha().unwrap_or_default();
        self.new_issue(
            IssueType::WrongRefType,
            Severity::Error,
            version,
            format!(
                "Patch version {} is a branch but must be a tag",
                version
            ),
        )
        .with_current_sha(sha)
        .with_remediation(RemediationAction::convert(RefType::Branch, version, sha))
    }
}

/// A floating alias of the wrong kind with no ref of the mandated kind
struct FloatingRefType {
    mandated: RefType,
}

impl Rule for FloatingRefType {
    fn id(&self) -> &'static str {
        match self.mandated {
            RefType::Tag => "ref_type/floating-branch-should-be-tag",
            RefType::Branch => "ref_type/floating-tag-should-be-branch",
        }
    }

    fn category(&self) -> &'static str {
        CATEGORY
    }

    fn priority(&self) -> u32 {
        match self.mandated {
            RefType::Tag => 11,
            RefType::Branch => 12,
        }
    }

    fn candidates(&self, state: &RepositoryState, config: &Config) -> Vec<Candidate> {
        if config.floating_versions_use != self.mandated {
            return Vec::new();
        }
        refs_where(state, self.mandated.opposite(), VersionRef::is_floating)
    }

    fn check(&self, candidate: &Candidate, state: &RepositoryState, _config: &Config) -> bool {
        has_ref(state, candidate, self.mandated)
    }

    fn describe(
        &self,
        candidate: &Candidate,
        _state: &RepositoryState,
        _config: &Config,
    ) -> ValidationIssue {
        let version = candidate.version();
        let sha = candidate.current_sha().unwrap_or_default();
        let found = self.mandated.opposite();
        let label = match candidate {
            Candidate::Ref(r) => describe_ref(r),
            _ => "Floating version",
        };
        self.new_issue(
            IssueType::WrongRefType,
            Severity::Error,
            version,
            format!(
                "{} {} is a {} but floating-versions-use requires a {}",
                label, version, found, self.mandated
            ),
        )
        .with_current_sha(sha)
        .with_remediation(RemediationAction::convert(found, version, sha))
    }
}

/// A patch version present as both a tag and a branch
struct DuplicatePatchRef;

impl Rule for DuplicatePatchRef {
    fn id(&self) -> &'static str {
        "ref_type/duplicate-patch-ref"
    }

    fn category(&self) -> &'static str {
        CATEGORY
    }

    fn priority(&self) -> u32 {
        13
    }

    fn candidates(&self, state: &RepositoryState, _config: &Config) -> Vec<Candidate> {
        refs_where(state, RefType::Branch, VersionRef::is_patch)
    }

    fn check(&self, candidate: &Candidate, state: &RepositoryState, _config: &Config) -> bool {
        !has_ref(state, candidate, RefType::Tag)
    }

    fn describe(
        &self,
        candidate: &Candidate,
        state: &RepositoryState,
        _config: &Config,
    ) -> ValidationIssue {
        let version = candidate.version();
        let mut issue = self
            .new_issue(
                IssueType::DuplicateRef,
                Severity::Error,
                version,
                format!(
                    "Patch version {} exists as both a tag and a branch; the branch should be removed",
                    version
                ),
            )
            .with_current_sha(candidate.current_sha().unwrap_or_default())
            .with_remediation(RemediationAction::delete_ref(RefType::Branch, version));
        if let Some(tag) = state.find_ref(version, RefType::Tag) {
            issue = issue.with_expected_sha(&tag.sha);
        }
        issue
    }
}

/// A floating alias present as both a tag and a branch
struct DuplicateFloatingRef;

impl Rule for DuplicateFloatingRef {
    fn id(&self) -> &'static str {
        "ref_type/duplicate-floating-ref"
    }

    fn category(&self) -> &'static str {
        CATEGORY
    }

    fn priority(&self) -> u32 {
        14
    }

    fn candidates(&self, state: &RepositoryState, config: &Config) -> Vec<Candidate> {
        refs_where(
            state,
            config.floating_versions_use.opposite(),
            VersionRef::is_floating,
        )
    }

    fn check(&self, candidate: &Candidate, state: &RepositoryState, config: &Config) -> bool {
        !has_ref(state, candidate, config.floating_versions_use)
    }

    fn describe(
        &self,
        candidate: &Candidate,
        state: &RepositoryState,
        config: &Config,
    ) -> ValidationIssue {
        let version = candidate.version();
        let mandated = config.floating_versions_use;
        let extra = mandated.opposite();
        let mut issue = self
            .new_issue(
                IssueType::DuplicateRef,
                Severity::Error,
                version,
                format!(
                    "{} exists as both a tag and a branch; the {} should be removed",
                    version, extra
                ),
            )
            .with_current_sha(candidate.current_sha().unwrap_or_default())
            .with_remediation(RemediationAction::delete_ref(extra, version));
        if let Some(kept) = state.find_ref(version, mandated) {
            issue = issue.with_expected_sha(&kept.sha);
        }
        issue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigInputs;
    use crate::state::RepoContext;

    fn state() -> RepositoryState {
        RepositoryState::new(RepoContext::new("octo", "action"))
    }

    fn branches_config() -> Config {
        let inputs: ConfigInputs = [("floating-versions-use", "branches")]
            .into_iter()
            .collect();
        Config::from_inputs(&inputs).unwrap()
    }

    fn run(state: &RepositoryState, config: &Config) -> Vec<ValidationIssue> {
        rules()
            .iter()
            .flat_map(|rule| rule.evaluate(state, config))
            .collect()
    }

    #[test]
    fn test_patch_branch_should_be_tag() {
        let state = state().with_branch("v1.2.3", "abc");
        let issues = run(&state, &Config::default());

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::WrongRefType);
        assert_eq!(
            issues[0].remediation,
            Some(RemediationAction::ConvertBranchToTag {
                version: "v1.2.3".into(),
                sha: "abc".into()
            })
        );
    }

    #[test]
    fn test_patch_branch_applies_in_branches_mode() {
        let state = state().with_branch("v1.2.3", "abc");
        let issues = run(&state, &branches_config());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].rule_id, "ref_type/patch-branch-should-be-tag");
    }

    #[test]
    fn test_floating_branch_should_be_tag() {
        let state = state().with_branch("v1", "abc").with_branch("latest", "abc");
        let issues = run(&state, &Config::default());

        assert_eq!(issues.len(), 2);
        assert!(issues
            .iter()
            .all(|i| i.rule_id == "ref_type/floating-branch-should-be-tag"));
    }

    #[test]
    fn test_floating_tag_should_be_branch() {
        let state = state().with_tag("v1.0", "abc").with_tag("v1.0.0", "abc");
        let issues = run(&state, &branches_config());

        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].remediation,
            Some(RemediationAction::ConvertTagToBranch {
                version: "v1.0".into(),
                sha: "abc".into()
            })
        );
    }

    #[test]
    fn test_conversion_defers_to_duplicate_rule() {
        let state = state().with_tag("v1", "aaa").with_branch("v1", "bbb");
        let issues = run(&state, &Config::default());

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::DuplicateRef);
        assert_eq!(
            issues[0].remediation,
            Some(RemediationAction::DeleteBranch {
                version: "v1".into()
            })
        );
        assert_eq!(issues[0].expected_sha.as_deref(), Some("aaa"));
    }

    #[test]
    fn test_duplicate_floating_in_branches_mode_deletes_tag() {
        let state = state().with_tag("v1", "aaa").with_branch("v1", "bbb");
        let issues = run(&state, &branches_config());

        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].remediation,
            Some(RemediationAction::DeleteTag {
                version: "v1".into()
            })
        );
    }

    #[test]
    fn test_duplicate_patch_ref() {
        let state = state().with_tag("v1.0.0", "aaa").with_branch("v1.0.0", "aaa");
        let issues = run(&state, &Config::default());

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].rule_id, "ref_type/duplicate-patch-ref");
    }

    #[test]
    fn test_ignored_refs_are_skipped() {
        let inputs: ConfigInputs = [("ignore-versions", "v1*")].into_iter().collect();
        let config = Config::from_inputs(&inputs).unwrap();
        let mut state = state().with_branch("v1.0.0", "abc").with_branch("v1", "abc");
        state.apply_ignore(&config.ignore_versions);

        assert!(run(&state, &config).is_empty());
    }
}
