//! Remediation actions
//!
//! Every fix is one variant of the closed [`RemediationAction`] enum. An action
//! knows its execution priority, how to describe itself, how to apply itself
//! through a [`GitHubApi`], and which shell commands a human would run instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::providers::GitHubApi;
use crate::state::RepositoryState;
use crate::version::RefType;

use super::{refs, releases};

/// Deletes must run before anything that depends on absence
pub const PRIORITY_DELETE: u32 = 10;
/// Creating and moving refs
pub const PRIORITY_REF_UPDATE: u32 = 20;
/// Composite delete + create, after pure deletes
pub const PRIORITY_CONVERT: u32 = 25;
/// Needs the tag to exist
pub const PRIORITY_CREATE_RELEASE: u32 = 30;
/// Needs the release to exist
pub const PRIORITY_PUBLISH_RELEASE: u32 = 40;
/// Must follow the initial publish
pub const PRIORITY_REPUBLISH_RELEASE: u32 = 45;
/// Cosmetic, last
pub const PRIORITY_SET_LATEST: u32 = 50;

/// Result of applying one action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Succeeded,
    /// Retryable on a later run
    Failed,
    /// The platform permanently forbids the change
    Unfixable,
    /// The token lacks the permission; someone with more rights can fix it
    RequiresManualFix,
}

/// A single mutation that fixes one issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemediationAction {
    DeleteTag {
        version: String,
    },
    DeleteBranch {
        version: String,
    },
    DeleteRelease {
        tag: String,
        release_id: u64,
    },
    /// Fails if the tag already exists
    CreateTag {
        version: String,
        sha: String,
    },
    /// Force-moves the tag
    UpdateTag {
        version: String,
        sha: String,
    },
    CreateBranch {
        version: String,
        sha: String,
    },
    UpdateBranch {
        version: String,
        sha: String,
    },
    ConvertTagToBranch {
        version: String,
        sha: String,
    },
    ConvertBranchToTag {
        version: String,
        sha: String,
    },
    CreateRelease {
        tag: String,
        draft: bool,
        make_latest: Option<bool>,
    },
    PublishRelease {
        tag: String,
        release_id: u64,
        make_latest: Option<bool>,
    },
    /// Draft + publish again so the release picks up immutability
    RepublishRelease {
        tag: String,
        release_id: u64,
        make_latest: Option<bool>,
    },
    SetLatestRelease {
        tag: String,
        release_id: u64,
    },
}

impl RemediationAction {
    /// Build the create-or-update action for a ref of the given kind
    pub fn push_ref(ref_type: RefType, version: &str, sha: &str, force: bool) -> Self {
        let version = version.to_string();
        let sha = sha.to_string();
        match (ref_type, force) {
            (RefType::Tag, false) => Self::CreateTag { version, sha },
            (RefType::Tag, true) => Self::UpdateTag { version, sha },
            (RefType::Branch, false) => Self::CreateBranch { version, sha },
            (RefType::Branch, true) => Self::UpdateBranch { version, sha },
        }
    }

    /// Build the delete action for a ref of the given kind
    pub fn delete_ref(ref_type: RefType, version: &str) -> Self {
        let version = version.to_string();
        match ref_type {
            RefType::Tag => Self::DeleteTag { version },
            RefType::Branch => Self::DeleteBranch { version },
        }
    }

    /// Build the conversion action moving `version` away from `from`
    pub fn convert(from: RefType, version: &str, sha: &str) -> Self {
        let version = version.to_string();
        let sha = sha.to_string();
        match from {
            RefType::Tag => Self::ConvertTagToBranch { version, sha },
            RefType::Branch => Self::ConvertBranchToTag { version, sha },
        }
    }

    /// Execution bucket; lower runs first
    pub fn priority(&self) -> u32 {
        match self {
            Self::DeleteTag { .. } | Self::DeleteBranch { .. } | Self::DeleteRelease { .. } => {
                PRIORITY_DELETE
            }
            Self::CreateTag { .. }
            | Self::UpdateTag { .. }
            | Self::CreateBranch { .. }
            | Self::UpdateBranch { .. } => PRIORITY_REF_UPDATE,
            Self::ConvertTagToBranch { .. } | Self::ConvertBranchToTag { .. } => PRIORITY_CONVERT,
            Self::CreateRelease { .. } => PRIORITY_CREATE_RELEASE,
            Self::PublishRelease { .. } => PRIORITY_PUBLISH_RELEASE,
            Self::RepublishRelease { .. } => PRIORITY_REPUBLISH_RELEASE,
            Self::SetLatestRelease { .. } => PRIORITY_SET_LATEST,
        }
    }

    /// Version or tag name the action touches
    pub fn version(&self) -> &str {
        match self {
            Self::DeleteTag { version }
            | Self::DeleteBranch { version }
            | Self::CreateTag { version, .. }
            | Self::UpdateTag { version, .. }
            | Self::CreateBranch { version, .. }
            | Self::UpdateBranch { version, .. }
            | Self::ConvertTagToBranch { version, .. }
            | Self::ConvertBranchToTag { version, .. } => version,
            Self::DeleteRelease { tag, .. }
            | Self::CreateRelease { tag, .. }
            | Self::PublishRelease { tag, .. }
            | Self::RepublishRelease { tag, .. }
            | Self::SetLatestRelease { tag, .. } => tag,
        }
    }

    /// Whether a ref update overwrites an existing ref
    pub fn is_force(&self) -> bool {
        matches!(self, Self::UpdateTag { .. } | Self::UpdateBranch { .. })
    }

    /// Human-readable description
    pub fn description(&self) -> String {
        match self {
            Self::DeleteTag { version } => format!("Delete tag {}", version),
            Self::DeleteBranch { version } => format!("Delete branch {}", version),
            Self::DeleteRelease { tag, release_id } => {
                format!("Delete release {} of {}", release_id, tag)
            }
            Self::CreateTag { version, sha } => format!("Create tag {} at {}", version, short(sha)),
            Self::UpdateTag { version, sha } => format!("Update tag {} to {}", version, short(sha)),
            Self::CreateBranch { version, sha } => {
                format!("Create branch {} at {}", version, short(sha))
            }
            Self::UpdateBranch { version, sha } => {
                format!("Update branch {} to {}", version, short(sha))
            }
            Self::ConvertTagToBranch { version, .. } => {
                format!("Convert tag {} to a branch", version)
            }
            Self::ConvertBranchToTag { version, .. } => {
                format!("Convert branch {} to a tag", version)
            }
            Self::CreateRelease { tag, draft, .. } => {
                if *draft {
                    format!("Create draft release for {}", tag)
                } else {
                    format!("Create release for {}", tag)
                }
            }
            Self::PublishRelease { tag, .. } => format!("Publish draft release {}", tag),
            Self::RepublishRelease { tag, .. } => {
                format!("Republish release {} to make it immutable", tag)
            }
            Self::SetLatestRelease { tag, .. } => format!("Mark release {} as latest", tag),
        }
    }

    /// Apply the action and record its effect in `state` on success
    pub async fn apply(&self, api: &dyn GitHubApi, state: &mut RepositoryState) -> ActionOutcome {
        let outcome = match self {
            Self::DeleteTag { version } => refs::delete(api, state, version, RefType::Tag).await,
            Self::DeleteBranch { version } => {
                refs::delete(api, state, version, RefType::Branch).await
            }
            Self::CreateTag { version, sha } | Self::UpdateTag { version, sha } => {
                refs::push(api, state, version, sha, RefType::Tag, self.is_force()).await
            }
            Self::CreateBranch { version, sha } | Self::UpdateBranch { version, sha } => {
                refs::push(api, state, version, sha, RefType::Branch, self.is_force()).await
            }
            Self::ConvertTagToBranch { version, sha } => {
                refs::convert(api, state, version, sha, RefType::Tag).await
            }
            Self::ConvertBranchToTag { version, sha } => {
                refs::convert(api, state, version, sha, RefType::Branch).await
            }
            Self::DeleteRelease { tag, release_id } => {
                releases::delete(api, state, tag, *release_id).await
            }
            Self::CreateRelease {
                tag,
                draft,
                make_latest,
            } => releases::create(api, state, tag, *draft, *make_latest).await,
            Self::PublishRelease {
                tag,
                release_id,
                make_latest,
            } => releases::publish(api, state, tag, *release_id, *make_latest).await,
            Self::RepublishRelease {
                tag,
                release_id,
                make_latest,
            } => releases::republish(api, state, tag, *release_id, *make_latest).await,
            Self::SetLatestRelease { tag, release_id } => {
                releases::set_latest(api, state, tag, *release_id).await
            }
        };

        if outcome == ActionOutcome::Succeeded {
            info!(action = %self, "Remediation succeeded");
        }
        outcome
    }

    /// Shell commands with the same effect as [`apply`](Self::apply)
    pub fn manual_commands(&self, state: &RepositoryState) -> Vec<String> {
        let repo = state.context.full_name();
        match self {
            Self::DeleteTag { version } => vec![delete_ref_command(RefType::Tag, version)],
            Self::DeleteBranch { version } => vec![delete_ref_command(RefType::Branch, version)],
            Self::DeleteRelease { release_id, .. } => vec![format!(
                "gh api --method DELETE repos/{}/releases/{}",
                repo, release_id
            )],
            Self::CreateTag { version, sha } | Self::UpdateTag { version, sha } => {
                vec![push_ref_command(RefType::Tag, version, sha, self.is_force())]
            }
            Self::CreateBranch { version, sha } | Self::UpdateBranch { version, sha } => {
                vec![push_ref_command(RefType::Branch, version, sha, self.is_force())]
            }
            Self::ConvertTagToBranch { version, sha } => {
                convert_commands(state, version, sha, RefType::Tag)
            }
            Self::ConvertBranchToTag { version, sha } => {
                convert_commands(state, version, sha, RefType::Branch)
            }
            Self::CreateRelease {
                tag,
                draft,
                make_latest,
            } => {
                let mut cmd = format!(
                    "gh release create {} --repo {} --title {} --generate-notes",
                    tag, repo, tag
                );
                if *draft {
                    cmd.push_str(" --draft");
                }
                if let Some(latest) = make_latest {
                    cmd.push_str(&format!(" --latest={}", latest));
                }
                vec![cmd]
            }
            Self::PublishRelease {
                tag, make_latest, ..
            } => vec![publish_command(tag, &repo, *make_latest)],
            Self::RepublishRelease {
                tag, make_latest, ..
            } => vec![
                format!("gh release edit {} --repo {} --draft=true", tag, repo),
                publish_command(tag, &repo, *make_latest),
            ],
            Self::SetLatestRelease { tag, .. } => {
                vec![format!("gh release edit {} --repo {} --latest", tag, repo)]
            }
        }
    }
}

impl fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

fn short(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

fn push_ref_command(ref_type: RefType, version: &str, sha: &str, force: bool) -> String {
    let mut cmd = format!("git push origin {}:{}", sha, ref_type.ref_path(version));
    if force {
        cmd.push_str(" --force");
    }
    cmd
}

fn delete_ref_command(ref_type: RefType, version: &str) -> String {
    format!("git push origin :{}", ref_type.ref_path(version))
}

fn publish_command(tag: &str, repo: &str, make_latest: Option<bool>) -> String {
    let mut cmd = format!("gh release edit {} --repo {} --draft=false", tag, repo);
    if let Some(latest) = make_latest {
        cmd.push_str(&format!(" --latest={}", latest));
    }
    cmd
}

/// Mirrors the conversion: skip the create when the destination exists
fn convert_commands(
    state: &RepositoryState,
    version: &str,
    sha: &str,
    from: RefType,
) -> Vec<String> {
    let to = from.opposite();
    let mut commands = Vec::new();
    if state.find_ref(version, to).is_none() {
        commands.push(push_ref_command(to, version, sha, false));
    }
    commands.push(delete_ref_command(from, version));
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RepoContext;

    fn state() -> RepositoryState {
        RepositoryState::new(RepoContext::new("octo", "action"))
    }

    fn all_kinds() -> Vec<RemediationAction> {
        vec![
            RemediationAction::SetLatestRelease {
                tag: "v1.0.0".into(),
                release_id: 1,
            },
            RemediationAction::RepublishRelease {
                tag: "v1.0.0".into(),
                release_id: 1,
                make_latest: None,
            },
            RemediationAction::PublishRelease {
                tag: "v1.0.0".into(),
                release_id: 1,
                make_latest: None,
            },
            RemediationAction::CreateRelease {
                tag: "v1.0.0".into(),
                draft: false,
                make_latest: None,
            },
            RemediationAction::ConvertBranchToTag {
                version: "v1".into(),
                sha: "a".into(),
            },
            RemediationAction::UpdateTag {
                version: "v1".into(),
                sha: "a".into(),
            },
            RemediationAction::DeleteBranch {
                version: "v1".into(),
            },
        ]
    }

    #[test]
    fn test_priorities_are_totally_ordered() {
        let priorities: Vec<u32> = all_kinds().iter().rev().map(|a| a.priority()).collect();
        assert_eq!(priorities, vec![10, 20, 25, 30, 40, 45, 50]);
    }

    #[test]
    fn test_deletes_share_the_first_bucket() {
        let deletes = [
            RemediationAction::DeleteTag {
                version: "v1".into(),
            },
            RemediationAction::DeleteBranch {
                version: "v1".into(),
            },
            RemediationAction::DeleteRelease {
                tag: "v1".into(),
                release_id: 3,
            },
        ];
        assert!(deletes.iter().all(|a| a.priority() == PRIORITY_DELETE));
    }

    #[test]
    fn test_push_ref_constructor() {
        assert_eq!(
            RemediationAction::push_ref(RefType::Tag, "latest", "sha2", true),
            RemediationAction::UpdateTag {
                version: "latest".into(),
                sha: "sha2".into()
            }
        );
        assert!(RemediationAction::push_ref(RefType::Branch, "v1", "s", true).is_force());
        assert!(!RemediationAction::push_ref(RefType::Branch, "v1", "s", false).is_force());
    }

    #[test]
    fn test_ref_manual_commands() {
        let s = state();
        assert_eq!(
            RemediationAction::UpdateTag {
                version: "v1".into(),
                sha: "abc".into()
            }
            .manual_commands(&s),
            vec!["git push origin abc:refs/tags/v1 --force"]
        );
        assert_eq!(
            RemediationAction::DeleteBranch {
                version: "v1".into()
            }
            .manual_commands(&s),
            vec!["git push origin :refs/heads/v1"]
        );
    }

    #[test]
    fn test_convert_manual_commands_skip_existing_destination() {
        let action = RemediationAction::ConvertBranchToTag {
            version: "v1".into(),
            sha: "abc".into(),
        };
        assert_eq!(
            action.manual_commands(&state()),
            vec![
                "git push origin abc:refs/tags/v1",
                "git push origin :refs/heads/v1"
            ]
        );

        let with_tag = state().with_tag("v1", "abc");
        assert_eq!(
            action.manual_commands(&with_tag),
            vec!["git push origin :refs/heads/v1"]
        );
    }

    #[test]
    fn test_release_manual_commands() {
        let s = state();
        let create = RemediationAction::CreateRelease {
            tag: "v1.0.0".into(),
            draft: false,
            make_latest: Some(false),
        };
        assert_eq!(
            create.manual_commands(&s),
            vec!["gh release create v1.0.0 --repo octo/action --title v1.0.0 --generate-notes --latest=false"]
        );

        let republish = RemediationAction::RepublishRelease {
            tag: "v1.0.0".into(),
            release_id: 9,
            make_latest: None,
        };
        assert_eq!(republish.manual_commands(&s).len(), 2);

        let delete = RemediationAction::DeleteRelease {
            tag: "v1".into(),
            release_id: 9,
        };
        assert_eq!(
            delete.manual_commands(&s),
            vec!["gh api --method DELETE repos/octo/action/releases/9"]
        );
    }

    #[test]
    fn test_description_and_version() {
        let action = RemediationAction::UpdateBranch {
            version: "v2".into(),
            sha: "0123456789abcdef".into(),
        };
        assert_eq!(action.description(), "Update branch v2 to 0123456");
        assert_eq!(action.version(), "v2");
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let action = RemediationAction::DeleteTag {
            version: "v1".into(),
        };
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"kind":"delete_tag","version":"v1"}"#);
    }
}
