//! Version tracking rules
//!
//! Every qualifying patch `vX.Y.Z` requires a major alias `vX` and a minor
//! alias `vX.Y`, each pointing at the highest qualifying patch of its series.

use std::collections::BTreeSet;

use crate::actions::RemediationAction;
use crate::config::Config;
use crate::rules::engine::{Candidate, Rule};
use crate::rules::results::{IssueType, Severity, ValidationIssue};
use crate::state::RepositoryState;
use crate::version::{major_name, minor_name};

pub const CATEGORY: &str = "version_tracking";

pub fn rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(MissingAlias {
            series: Series::Major,
        }),
        Box::new(MissingAlias {
            series: Series::Minor,
        }),
        Box::new(IncorrectAlias {
            series: Series::Major,
        }),
        Box::new(IncorrectAlias {
            series: Series::Minor,
        }),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Series {
    Major,
    Minor,
}

impl Series {
    fn label(self) -> &'static str {
        match self {
            Series::Major => "Major",
            Series::Minor => "Minor",
        }
    }

    fn enabled(self, config: &Config) -> bool {
        match self {
            Series::Major => true,
            Series::Minor => config.check_minor_version,
        }
    }
}

/// An alias that should exist, and the patch it should track
struct Target {
    alias: String,
    patch: String,
    sha: String,
}

/// Required aliases of a series, in version order
fn targets(state: &RepositoryState, config: &Config, series: Series) -> Vec<Target> {
    let keys: BTreeSet<(u64, Option<u64>)> = state
        .qualifying_patches(config)
        .filter_map(|r| match series {
            Series::Major => r.major.map(|major| (major, None)),
            Series::Minor => r.major.zip(r.minor).map(|(major, minor)| (major, Some(minor))),
        })
        .collect();

    keys.into_iter()
        .filter_map(|(major, minor)| {
            let (alias, highest) = match minor {
                None => (major_name(major), state.highest_patch_in_major(major, config)?),
                Some(minor) => (
                    minor_name(major, minor),
                    state.highest_patch_in_minor(major, minor, config)?,
                ),
            };
            Some(Target {
                alias,
                patch: highest.version.clone(),
                sha: highest.sha.clone(),
            })
        })
        .filter(|target| !config.is_ignored(&target.alias))
        .collect()
}

fn patch_of(state: &RepositoryState, config: &Config, series: Series, alias: &str) -> String {
    targets(state, config, series)
        .into_iter()
        .find(|t| t.alias == alias)
        .map(|t| t.patch)
        .unwrap_or_default()
}

/// A required alias with no ref of either kind
struct MissingAlias {
    series: Series,
}

impl Rule for MissingAlias {
    fn id(&self) -> &'static str {
        match self.series {
            Series::Major => "version_tracking/missing-major",
            Series::Minor => "version_tracking/missing-minor",
        }
    }

    fn category(&self) -> &'static str {
        CATEGORY
    }

    fn priority(&self) -> u32 {
        match self.series {
            Series::Major => 20,
            Series::Minor => 21,
        }
    }

    fn candidates(&self, state: &RepositoryState, config: &Config) -> Vec<Candidate> {
        if !self.series.enabled(config) {
            return Vec::new();
        }
        targets(state, config, self.series)
            .into_iter()
            .map(|t| Candidate::Alias {
                version: t.alias,
                expected_sha: t.sha,
                current_sha: None,
            })
            .collect()
    }

    fn check(&self, candidate: &Candidate, state: &RepositoryState, _config: &Config) -> bool {
        state.has_any_ref(candidate.version())
    }

    fn describe(
        &self,
        candidate: &Candidate,
        state: &RepositoryState,
        config: &Config,
    ) -> ValidationIssue {
        let version = candidate.version();
        let expected = candidate.expected_sha().unwrap_or_default();
        let issue_type = match self.series {
            Series::Major => IssueType::MissingMajorVersion,
            Series::Minor => IssueType::MissingMinorVersion,
        };
        self.new_issue(
            issue_type,
            Severity::Error,
            version,
            format!(
                "{} version {} is missing; it should point at {}",
                self.series.label(),
                version,
                patch_of(state, config, self.series, version)
            ),
        )
        .with_expected_sha(expected)
        .with_remediation(RemediationAction::push_ref(
            config.floating_versions_use,
            version,
            expected,
            false,
        ))
    }
}

/// A required alias of the mandated kind pointing at the wrong commit
struct IncorrectAlias {
    series: Series,
}

impl Rule for IncorrectAlias {
    fn id(&self) -> &'static str {
        match self.series {
            Series::Major => "version_tracking/incorrect-major",
            Series::Minor => "version_tracking/incorrect-minor",
        }
    }

    fn category(&self) -> &'static str {
        CATEGORY
    }

    fn priority(&self) -> u32 {
        match self.series {
            Series::Major => 22,
            Series::Minor => 23,
        }
    }

    fn candidates(&self, state: &RepositoryState, config: &Config) -> Vec<Candidate> {
        if !self.series.enabled(config) {
            return Vec::new();
        }
        let mandated = config.floating_versions_use;
        targets(state, config, self.series)
            .into_iter()
            .filter_map(|t| {
                let current = state.find_ref(&t.alias, mandated)?;
                Some(Candidate::Alias {
                    current_sha: Some(current.sha.clone()),
                    version: t.alias,
                    expected_sha: t.sha,
                })
            })
            .collect()
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
        let version = candidate.version();
        let expected = candidate.expected_sha().unwrap_or_default();
        let issue_type = match self.series {
            Series::Major => IssueType::IncorrectMajorVersion,
            Series::Minor => IssueType::IncorrectMinorVersion,
        };
        self.new_issue(
            issue_type,
            Severity::Error,
            version,
            format!(
                "{} version {} points at {} but should point at {} ({})",
                self.series.label(),
                version,
                candidate.current_sha().unwrap_or_default(),
                patch_of(state, config, self.series, version),
                expected
            ),
        )
        .with_current_sha(candidate.current_sha().unwrap_or_default())
        .with_expected_sha(expected)
        .with_remediation(RemediationAction::push_ref(
            config.floating_versions_use,
            version,
            expected,
            true,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigInputs;
    use crate::state::{ReleaseInfo, RepoContext};
    use crate::version::RefType;

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
    fn test_single_patch_requires_major_and_minor() {
        let state = state().with_tag("v1.0.0", "sha1");
        let issues = run(&state, &Config::default());

        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].issue_type, IssueType::MissingMajorVersion);
        assert_eq!(issues[0].version, "v1");
        assert_eq!(issues[1].issue_type, IssueType::MissingMinorVersion);
        assert_eq!(issues[1].version, "v1.0");
        assert!(issues
            .iter()
            .all(|i| i.expected_sha.as_deref() == Some("sha1")));
        assert_eq!(
            issues[0].remediation,
            Some(RemediationAction::CreateTag {
                version: "v1".into(),
                sha: "sha1".into()
            })
        );
    }

    #[test]
    fn test_minor_rules_can_be_disabled() {
        let state = state().with_tag("v1.0.0", "sha1");
        let issues = run(&state, &config(&[("check-minor-version", "false")]));

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].version, "v1");
    }

    #[test]
    fn test_branches_mode_creates_branches() {
        let state = state().with_tag("v2.1.0", "sha");
        let issues = run(&state, &config(&[("floating-versions-use", "branches")]));

        assert_eq!(
            issues[0].remediation,
            Some(RemediationAction::CreateBranch {
                version: "v2".into(),
                sha: "sha".into()
            })
        );
    }

    #[test]
    fn test_incorrect_major_tracks_highest_patch() {
        let state = state()
            .with_tag("v1.0.0", "old")
            .with_tag("v1.2.0", "new")
            .with_tag("v1", "old")
            .with_tag("v1.0", "old")
            .with_tag("v1.2", "new");
        let issues = run(&state, &Config::default());

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::IncorrectMajorVersion);
        assert_eq!(issues[0].current_sha.as_deref(), Some("old"));
        assert_eq!(
            issues[0].remediation,
            Some(RemediationAction::UpdateTag {
                version: "v1".into(),
                sha: "new".into()
            })
        );
    }

    #[test]
    fn test_alias_of_other_kind_is_not_missing() {
        let state = state()
            .with_tag("v1.0.0", "sha1")
            .with_branch("v1", "other")
            .with_tag("v1.0", "sha1");

        // The ref type rules convert the branch; tracking stays quiet
        assert!(run(&state, &Config::default()).is_empty());
    }

    #[test]
    fn test_prerelease_patches_are_skipped() {
        let state = state()
            .with_tag("v1.0.0", "stable")
            .with_tag("v1.1.0", "beta")
            .with_tag("v1", "stable")
            .with_tag("v1.0", "stable")
            .with_release(ReleaseInfo::new("v1.1.0", 2).prerelease());

        assert!(run(&state, &Config::default()).is_empty());

        let issues = run(&state, &config(&[("ignore-preview-releases", "false")]));
        let versions: Vec<&str> = issues.iter().map(|i| i.version.as_str()).collect();
        assert_eq!(versions, vec!["v1.1", "v1"]);
    }

    #[test]
    fn test_ignored_alias_is_not_required() {
        let config = config(&[("ignore-versions", "v1.0")]);
        let state = state().with_tag("v1.0.0", "sha1").with_tag("v1", "sha1");

        assert!(run(&state, &config).is_empty());
    }

    #[test]
    fn test_highest_patch_prefers_tag_over_branch_on_tie() {
        let state = state()
            .with_branch("v1.0.0", "branch-sha")
            .with_tag("v1.0.0", "tag-sha");
        let issues = run(&state, &Config::default());

        assert!(issues
            .iter()
            .all(|i| i.expected_sha.as_deref() == Some("tag-sha")));
        assert!(state.find_ref("v1.0.0", RefType::Branch).is_some());
    }
}
