//! Release rules
//!
//! Every patch tag needs exactly one published release, floating aliases
//! need none, and published releases should be immutable. When a tag has
//! several releases the canonical one (published, then immutable, then lowest
//! id) is kept and only it is checked for draft, immutability and latest.

use crate::actions::RemediationAction;
use crate::config::{CheckLevel, Config};
use crate::rules::engine::{Candidate, Rule};
use crate::rules::results::{IssueType, ValidationIssue};
use crate::state::{ReleaseInfo, RepositoryState};
use crate::version::{parse_version, RefType, VersionKind};

pub const CATEGORY: &str = "releases";

pub fn rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(DuplicateRelease),
        Box::new(FloatingRelease),
        Box::new(MissingRelease),
        Box::new(DraftRelease),
        Box::new(MutableRelease),
        Box::new(LatestRelease),
    ]
}

fn is_patch_tag(name: &str) -> bool {
    parse_version(name).map(|p| p.kind) == Some(VersionKind::Patch)
}

fn is_canonical(state: &RepositoryState, release: &ReleaseInfo) -> bool {
    state
        .canonical_release(&release.tag_name)
        .map(|c| c.id == release.id)
        .unwrap_or(false)
}

fn is_highest(state: &RepositoryState, config: &Config, tag: &str) -> bool {
    state
        .highest_patch(config)
        .map(|r| r.version == tag)
        .unwrap_or(false)
}

/// Non-ignored releases matching a predicate, as candidates
fn releases_where(
    state: &RepositoryState,
    level: CheckLevel,
    predicate: impl Fn(&ReleaseInfo) -> bool,
) -> Vec<Candidate> {
    if !level.is_enabled() {
        return Vec::new();
    }
    state
        .releases
        .iter()
        .filter(|&r| !r.is_ignored && predicate(r))
        .cloned()
        .map(Candidate::Release)
        .collect()
}

/// Canonical releases of patch tags
fn canonical_patch_releases(state: &RepositoryState, level: CheckLevel) -> Vec<Candidate> {
    releases_where(state, level, |r| {
        is_patch_tag(&r.tag_name) && is_canonical(state, r)
    })
}

fn release_id(candidate: &Candidate) -> u64 {
    candidate.release().map(|r| r.id).unwrap_or_default()
}

/// Extra releases on a patch tag
struct DuplicateRelease;

impl Rule for DuplicateRelease {
    fn id(&self) -> &'static str {
        "releases/duplicate-release"
    }

    fn category(&self) -> &'static str {
        CATEGORY
    }

    fn priority(&self) -> u32 {
        40
    }

    fn candidates(&self, state: &RepositoryState, config: &Config) -> Vec<Candidate> {
        releases_where(state, config.check_releases, |r| is_patch_tag(&r.tag_name))
    }

    fn check(&self, candidate: &Candidate, state: &RepositoryState, _config: &Config) -> bool {
        candidate
            .release()
            .map(|r| is_canonical(state, r))
            .unwrap_or(true)
    }

    fn describe(
        &self,
        candidate: &Candidate,
        state: &RepositoryState,
        config: &Config,
    ) -> ValidationIssue {
        let tag = candidate.version();
        let id = release_id(candidate);
        let kept = state
            .canonical_release(tag)
            .map(|c| c.id)
            .unwrap_or_default();
        self.new_issue(
            IssueType::DuplicateRelease,
            config.check_releases.severity(),
            tag,
            format!(
                "{} has several releases; release {} duplicates release {}",
                tag, id, kept
            ),
        )
        .with_remediation(RemediationAction::DeleteRelease {
            tag: tag.to_string(),
            release_id: id,
        })
    }
}

/// A release attached to a floating alias
struct FloatingRelease;

impl Rule for FloatingRelease {
    fn id(&self) -> &'static str {
        "releases/floating-release"
    }

    fn category(&self) -> &'static str {
        CATEGORY
    }

    fn priority(&self) -> u32 {
        41
    }

    fn candidates(&self, state: &RepositoryState, config: &Config) -> Vec<Candidate> {
        releases_where(state, config.check_releases, |r| {
            parse_version(&r.tag_name).is_some()
        })
    }

    fn check(&self, candidate: &Candidate, _state: &RepositoryState, _config: &Config) -> bool {
        parse_version(candidate.version())
            .map(|p| !p.kind.is_floating())
            .unwrap_or(true)
    }

    fn describe(
        &self,
        candidate: &Candidate,
        _state: &RepositoryState,
        config: &Config,
    ) -> ValidationIssue {
        let tag = candidate.version();
        self.new_issue(
            IssueType::ReleaseOnFloatingVersion,
            config.check_releases.severity(),
            tag,
            format!(
                "{} is a floating version and should not have a release",
                tag
            ),
        )
        .with_remediation(RemediationAction::DeleteRelease {
            tag: tag.to_string(),
            release_id: release_id(candidate),
        })
    }
}

/// A patch tag without any release
struct MissingRelease;

impl Rule for MissingRelease {
    fn id(&self) -> &'static str {
        "releases/missing-release"
    }

    fn category(&self) -> &'static str {
        CATEGORY
    }

    fn priority(&self) -> u32 {
        42
    }

    fn candidates(&self, state: &RepositoryState, config: &Config) -> Vec<Candidate> {
        if !config.check_releases.is_enabled() {
            return Vec::new();
        }
        state
            .refs_of(RefType::Tag)
            .iter()
            .filter(|r| r.is_patch() && !r.is_ignored)
            .cloned()
            .map(Candidate::Ref)
            .collect()
    }

    fn check(&self, candidate: &Candidate, state: &RepositoryState, _config: &Config) -> bool {
        state.releases_for(candidate.version()).next().is_some()
    }

    fn describe(
        &self,
        candidate: &Candidate,
        state: &RepositoryState,
        config: &Config,
    ) -> ValidationIssue {
        let tag = candidate.version();
        self.new_issue(
            IssueType::MissingRelease,
            config.check_releases.severity(),
            tag,
            format!("Patch version {} has no release", tag),
        )
        .with_current_sha(candidate.current_sha().unwrap_or_default())
        .with_remediation(RemediationAction::CreateRelease {
            tag: tag.to_string(),
            draft: false,
            make_latest: Some(is_highest(state, config, tag)),
        })
    }
}

/// The release of a patch tag is still a draft
struct DraftRelease;

impl Rule for DraftRelease {
    fn id(&self) -> &'static str {
        "releases/draft-release"
    }

    fn category(&self) -> &'static str {
        CATEGORY
    }

    fn priority(&self) -> u32 {
        43
    }

    fn candidates(&self, state: &RepositoryState, config: &Config) -> Vec<Candidate> {
        canonical_patch_releases(state, config.check_releases)
    }

    fn check(&self, candidate: &Candidate, _state: &RepositoryState, _config: &Config) -> bool {
        candidate.release().map(|r| !r.is_draft).unwrap_or(true)
    }

    fn describe(
        &self,
        candidate: &Candidate,
        state: &RepositoryState,
        config: &Config,
    ) -> ValidationIssue {
        let tag = candidate.version();
        let prerelease = candidate.release().map(|r| r.is_prerelease).unwrap_or(false);
        self.new_issue(
            IssueType::DraftRelease,
            config.check_releases.severity(),
            tag,
            format!("Release for {} is still a draft", tag),
        )
        .with_remediation(RemediationAction::PublishRelease {
            tag: tag.to_string(),
            release_id: release_id(candidate),
            make_latest: Some(!prerelease && is_highest(state, config, tag)),
        })
    }
}

/// A published release of a patch tag that is not immutable
struct MutableRelease;

impl Rule for MutableRelease {
    fn id(&self) -> &'static str {
        "releases/mutable-release"
    }

    fn category(&self) -> &'static str {
        CATEGORY
    }

    fn priority(&self) -> u32 {
        44
    }

    fn candidates(&self, state: &RepositoryState, config: &Config) -> Vec<Candidate> {
        canonical_patch_releases(state, config.check_release_immutability)
    }

    fn check(&self, candidate: &Candidate, _state: &RepositoryState, _config: &Config) -> bool {
        candidate
            .release()
            .map(|r| r.is_draft || r.is_immutable)
            .unwrap_or(true)
    }

    fn describe(
        &self,
        candidate: &Candidate,
        state: &RepositoryState,
        config: &Config,
    ) -> ValidationIssue {
        let tag = candidate.version();
        let prerelease = candidate.release().map(|r| r.is_prerelease).unwrap_or(false);
        self.new_issue(
            IssueType::NonImmutableRelease,
            config.check_release_immutability.severity(),
            tag,
            format!(
                "Release for {} is not immutable; republish it with release immutability enabled",
                tag
            ),
        )
        .with_remediation(RemediationAction::RepublishRelease {
            tag: tag.to_string(),
            release_id: release_id(candidate),
            make_latest: Some(!prerelease && is_highest(state, config, tag)),
        })
    }
}

/// The highest patch's release is not marked latest
struct LatestRelease;

impl Rule for LatestRelease {
    fn id(&self) -> &'static str {
        "releases/latest-release"
    }

    fn category(&self) -> &'static str {
        CATEGORY
    }

    fn priority(&self) -> u32 {
        45
    }

    fn candidates(&self, state: &RepositoryState, config: &Config) -> Vec<Candidate> {
        if !config.check_releases.is_enabled() {
            return Vec::new();
        }
        state
            .highest_patch(config)
            .and_then(|highest| state.canonical_release(&highest.version))
            .filter(|r| !r.is_ignored && !r.is_draft && !r.is_prerelease)
            .cloned()
            .map(Candidate::Release)
            .into_iter()
            .collect()
    }

    fn check(&self, candidate: &Candidate, _state: &RepositoryState, _config: &Config) -> bool {
        candidate.release().map(|r| r.is_latest).unwrap_or(true)
    }

    fn describe(
        &self,
        candidate: &Candidate,
        state: &RepositoryState,
        config: &Config,
    ) -> ValidationIssue {
        let tag = candidate.version();
        let current = state
            .releases
            .iter()
            .find(|r| r.is_latest)
            .map(|r| r.tag_name.clone())
            .unwrap_or_else(|| "none".to_string());
        self.new_issue(
            IssueType::WrongLatestRelease,
            config.check_releases.severity(),
            tag,
            format!(
                "Release {} is the highest version but {} is marked latest",
                tag, current
            ),
        )
        .with_remediation(RemediationAction::SetLatestRelease {
            tag: tag.to_string(),
            release_id: release_id(candidate),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigInputs;
    use crate::rules::results::Severity;
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
    fn test_missing_release_latest_only_for_highest() {
        let state = state().with_tag("v1.0.0", "a").with_tag("v1.1.0", "b");
        let issues = run(&state, &Config::default());

        assert_eq!(issues.len(), 2);
        assert_eq!(
            issues[0].remediation,
            Some(RemediationAction::CreateRelease {
                tag: "v1.0.0".into(),
                draft: false,
                make_latest: Some(false)
            })
        );
        assert_eq!(
            issues[1].remediation,
            Some(RemediationAction::CreateRelease {
                tag: "v1.1.0".into(),
                draft: false,
                make_latest: Some(true)
            })
        );
    }

    #[test]
    fn test_duplicate_release_keeps_published() {
        let state = state()
            .with_tag("v1.0.0", "a")
            .with_release(ReleaseInfo::new("v1.0.0", 1).draft())
            .with_release(ReleaseInfo::new("v1.0.0", 2).immutable().latest());
        let issues = run(&state, &Config::default());

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::DuplicateRelease);
        assert_eq!(
            issues[0].remediation,
            Some(RemediationAction::DeleteRelease {
                tag: "v1.0.0".into(),
                release_id: 1
            })
        );
    }

    #[test]
    fn test_floating_release() {
        let state = state().with_release(ReleaseInfo::new("v1", 9).immutable());
        let issues = run(&state, &Config::default());

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::ReleaseOnFloatingVersion);
    }

    #[test]
    fn test_draft_release_published_as_latest() {
        let state = state()
            .with_tag("v1.0.0", "a")
            .with_release(ReleaseInfo::new("v1.0.0", 5).draft());
        let issues = run(&state, &Config::default());

        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].remediation,
            Some(RemediationAction::PublishRelease {
                tag: "v1.0.0".into(),
                release_id: 5,
                make_latest: Some(true)
            })
        );
    }

    #[test]
    fn test_mutable_release_severity_follows_config() {
        let state = state()
            .with_tag("v1.0.0", "a")
            .with_release(ReleaseInfo::new("v1.0.0", 5).latest());

        let issues = run(&state, &config(&[("check-release-immutability", "warning")]));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::NonImmutableRelease);
        assert_eq!(issues[0].severity, Severity::Warning);

        let issues = run(&state, &config(&[("check-release-immutability", "none")]));
        assert!(issues.is_empty());
    }

    #[test]
    fn test_republish_keeps_latest_on_highest_patch() {
        let state = state()
            .with_tag("v1.0.0", "a")
            .with_tag("v2.0.0", "b")
            .with_release(ReleaseInfo::new("v1.0.0", 1).latest())
            .with_release(ReleaseInfo::new("v2.0.0", 2).draft());
        let issues = run(&state, &Config::default());

        let republish = issues
            .iter()
            .find(|i| i.issue_type == IssueType::NonImmutableRelease)
            .unwrap();
        assert_eq!(
            republish.remediation,
            Some(RemediationAction::RepublishRelease {
                tag: "v1.0.0".into(),
                release_id: 1,
                make_latest: Some(false)
            })
        );
    }

    #[test]
    fn test_wrong_latest_release() {
        let state = state()
            .with_tag("v1.0.0", "a")
            .with_tag("v2.0.0", "b")
            .with_release(ReleaseInfo::new("v1.0.0", 1).immutable().latest())
            .with_release(ReleaseInfo::new("v2.0.0", 2).immutable());
        let issues = run(&state, &Config::default());

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::WrongLatestRelease);
        assert_eq!(issues[0].version, "v2.0.0");
    }

    #[test]
    fn test_releases_disabled() {
        let state = state()
            .with_tag("v1.0.0", "a")
            .with_release(ReleaseInfo::new("v1", 1));
        assert!(run(&state, &config(&[("check-releases", "false")])).is_empty());
    }

    #[test]
    fn test_ignored_release_is_skipped() {
        let config = config(&[("ignore-versions", "v1")]);
        let mut state = state().with_release(ReleaseInfo::new("v1", 1));
        state.apply_ignore(&config.ignore_versions);

        assert!(run(&state, &config).is_empty());
    }
}
