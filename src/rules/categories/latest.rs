//! `latest` alias rules
//!
//! When a `latest` ref of the mandated kind exists it must point at the
//! globally highest qualifying patch. Without any patch it is left alone.

use crate::actions::RemediationAction;
use crate::config::Config;
use crate::rules::engine::{Candidate, Rule};
use crate::rules::results::{IssueType, Severity, ValidationIssue};
use crate::state::RepositoryState;
use crate::version::{RefType, LATEST};

pub const CATEGORY: &str = "latest";

pub fn rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(IncorrectLatest {
            mandated: RefType::Tag,
        }),
        Box::new(IncorrectLatest {
            mandated: RefType::Branch,
        }),
    ]
}

struct IncorrectLatest {
    mandated: RefType,
}

impl Rule for IncorrectLatest {
    fn id(&self) -> &'static str {
        match self.mandated {
            RefType::Tag => "latest/incorrect-latest-tag",
            RefType::Branch => "latest/incorrect-latest-branch",
        }
    }

    fn category(&self) -> &'static str {
        CATEGORY
    }

    fn priority(&self) -> u32 {
        match self.mandated {
            RefType::Tag => 30,
            RefType::Branch => 31,
        }
    }

    fn candidates(&self, state: &RepositoryState, config: &Config) -> Vec<Candidate> {
        if config.floating_versions_use != self.mandated {
            return Vec::new();
        }
        let Some(current) = state
            .find_ref(LATEST, self.mandated)
            .filter(|r| !r.is_ignored)
        else {
            return Vec::new();
        };
        let Some(highest) = state.highest_patch(config) else {
            return Vec::new();
        };

        vec![Candidate::Alias {
            version: LATEST.to_string(),
            expected_sha: highest.sha.clone(),
            current_sha: Some(current.sha.clone()),
        }]
    }

    fn check(&self, candidate: &Candidate, _state: &RepositoryState, _config: &Config) -> bool {
        candidate.current_sha() == candidate.expected_sha()
    }

    fn describe(
        &self,
        candidate: &Candidate,
        state: &RepositoryState,
        config: &Config,
    ) -> ValidationIssue {
        let expected = candidate.expected_sha().unwrap_or_default();
        let highest = state
            .highest_patch(config)
            .map(|r| r.version.clone())
            .unwrap_or_default();
        let issue_type = match self.mandated {
            RefType::Tag => IssueType::IncorrectLatestTag,
            RefType::Branch => IssueType::IncorrectLatestBranch,
        };

        self.new_issue(
            issue_type,
            Severity::Error,
            LATEST,
            format!(
                "latest {} points at {} but should point at {} ({})",
                self.mandated,
                candidate.current_sha().unwrap_or_default(),
                highest,
                expected
            ),
        )
        .with_current_sha(candidate.current_sha().unwrap_or_default())
        .with_expected_sha(expected)
        .with_remediation(RemediationAction::push_ref(
            self.mandated,
            LATEST,
            expected,
            true,
        ))
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

    fn config(pairs: &[(&str, &str)]) -> Config {
        let inputs: ConfigInputs = pairs.iter().copied().collect();
        Config::from_inputs(&inputs).unwrap()
    }

    fn run(state: &RepositoryState, config: &Config) -> Vec<ValidationIssue> {
        rules()
            .iter()
            .flat_map(|rule| rule.evaluate(state, config))
            .collect()
    }

    #[test]
    fn test_latest_tag_behind_highest_patch() {
        let state = state()
            .with_tag("v1.0.0", "sha1")
            .with_tag("v1.1.0", "sha2")
            .with_tag("latest", "sha1");
        let issues = run(&state, &config(&[("ignore-preview-releases", "false")]));

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::IncorrectLatestTag);
        assert_eq!(issues[0].expected_sha.as_deref(), Some("sha2"));
        assert_eq!(
            issues[0].remediation,
            Some(RemediationAction::UpdateTag {
                version: "latest".into(),
                sha: "sha2".into()
            })
        );
        assert!(issues[0].remediation.as_ref().unwrap().is_force());
    }

    #[test]
    fn test_latest_across_majors() {
        let state = state()
            .with_branch("v2.0.0", "two")
            .with_tag("v1.9.9", "one")
            .with_branch("latest", "one");
        let issues = run(&state, &config(&[("floating-versions-use", "branches")]));

        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].remediation,
            Some(RemediationAction::UpdateBranch {
                version: "latest".into(),
                sha: "two".into()
            })
        );
    }

    #[test]
    fn test_latest_is_optional() {
        let state = state().with_tag("v1.0.0", "sha1");
        assert!(run(&state, &Config::default()).is_empty());
    }

    #[test]
    fn test_latest_without_patches_is_exempt() {
        let state = state().with_tag("latest", "sha1").with_tag("v1", "sha1");
        assert!(run(&state, &Config::default()).is_empty());
    }

    #[test]
    fn test_latest_of_other_kind_is_left_to_ref_type_rules() {
        let state = state().with_tag("v1.0.0", "sha1").with_branch("latest", "old");
        assert!(run(&state, &Config::default()).is_empty());
    }
}
