//! Release mutations

use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::providers::{GitHubApi, ReleaseResult};
use crate::state::{ReleaseInfo, RepositoryState};

use super::ActionOutcome;

fn classify(what: &str, tag: &str, result: Result<ReleaseResult, ProviderError>) -> ActionOutcome {
    match result {
        Ok(r) if r.success => ActionOutcome::Succeeded,
        Ok(r) if r.unfixable => {
            warn!("Cannot {} {}: tag is locked by an immutable release", what, tag);
            ActionOutcome::Unfixable
        }
        Ok(_) => ActionOutcome::Failed,
        Err(e) => {
            warn!("Failed to {} {}: {}", what, tag, e);
            ActionOutcome::Failed
        }
    }
}

fn classify_bool(what: &str, tag: &str, result: Result<bool, ProviderError>) -> ActionOutcome {
    match result {
        Ok(true) => ActionOutcome::Succeeded,
        Ok(false) => ActionOutcome::Failed,
        Err(e) => {
            warn!("Failed to {} {}: {}", what, tag, e);
            ActionOutcome::Failed
        }
    }
}

pub(crate) async fn create(
    api: &dyn GitHubApi,
    state: &mut RepositoryState,
    tag: &str,
    draft: bool,
    make_latest: Option<bool>,
) -> ActionOutcome {
    debug!("Creating release for {} (draft: {})", tag, draft);
    let result = api.create_release(tag, draft, make_latest).await;
    let release_id = result.as_ref().ok().and_then(|r| r.release_id);

    let outcome = classify("create release", tag, result);
    if outcome == ActionOutcome::Succeeded {
        match release_id {
            Some(id) => {
                let mut release = ReleaseInfo::new(tag, id);
                if draft {
                    release = release.draft();
                }
                state.add_release(release);
                if make_latest == Some(true) && !draft {
                    state.mark_release_latest(id);
                }
            }
            None => warn!("Release for {} created without an id; not tracked in this run", tag),
        }
    }
    outcome
}

pub(crate) async fn publish(
    api: &dyn GitHubApi,
    state: &mut RepositoryState,
    tag: &str,
    release_id: u64,
    make_latest: Option<bool>,
) -> ActionOutcome {
    debug!("Publishing release {} ({})", tag, release_id);
    let outcome = classify(
        "publish release",
        tag,
        api.publish_release(tag, release_id, make_latest).await,
    );
    if outcome == ActionOutcome::Succeeded {
        state.mark_release_published(release_id, false);
        if make_latest == Some(true) {
            state.mark_release_latest(release_id);
        }
    }
    outcome
}

/// Revert to draft, then publish again
pub(crate) async fn republish(
    api: &dyn GitHubApi,
    state: &mut RepositoryState,
    tag: &str,
    release_id: u64,
    make_latest: Option<bool>,
) -> ActionOutcome {
    debug!("Republishing release {} ({})", tag, release_id);
    let reverted = classify_bool(
        "revert release",
        tag,
        api.revert_release_to_draft(tag, release_id).await,
    );
    if reverted != ActionOutcome::Succeeded {
        return reverted;
    }

    let outcome = classify(
        "republish release",
        tag,
        api.publish_release(tag, release_id, make_latest).await,
    );
    match outcome {
        ActionOutcome::Succeeded => {
            state.mark_release_published(release_id, true);
            if make_latest == Some(true) {
                state.mark_release_latest(release_id);
            }
        }
        _ => {
            // Left as a draft on GitHub
            state.mark_release_draft(release_id);
        }
    }
    outcome
}

pub(crate) async fn delete(
    api: &dyn GitHubApi,
    state: &mut RepositoryState,
    tag: &str,
    release_id: u64,
) -> ActionOutcome {
    debug!("Deleting release {} ({})", tag, release_id);
    let outcome = classify_bool(
        "delete release",
        tag,
        api.delete_release(tag, release_id).await,
    );
    if outcome == ActionOutcome::Succeeded {
        state.remove_release(release_id);
    }
    outcome
}

pub(crate) async fn set_latest(
    api: &dyn GitHubApi,
    state: &mut RepositoryState,
    tag: &str,
    release_id: u64,
) -> ActionOutcome {
    let outcome = classify(
        "mark latest",
        tag,
        api.set_release_latest(tag, release_id).await,
    );
    if outcome == ActionOutcome::Succeeded {
        state.mark_release_latest(release_id);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::memory::{Fault, MemoryGitHub};
    use crate::state::RepoContext;

    fn state() -> RepositoryState {
        RepositoryState::new(RepoContext::new("octo", "action"))
    }

    #[tokio::test]
    async fn test_create_records_release() {
        let api = MemoryGitHub::new().with_tag("v1.0.0", "abc");
        let mut state = state().with_tag("v1.0.0", "abc");

        let outcome = create(&api, &mut state, "v1.0.0", false, Some(true)).await;

        assert_eq!(outcome, ActionOutcome::Succeeded);
        let release = state.canonical_release("v1.0.0").unwrap();
        assert!(!release.is_draft);
        assert!(release.is_latest);
    }

    #[tokio::test]
    async fn test_create_without_id_is_not_tracked() {
        let api = MemoryGitHub::new().with_fault("v1.0.0", Fault::Untracked);
        let mut state = state()
            .with_tag("v1.0.0", "abc")
            .with_release(ReleaseInfo::new("v0.9.0", 0).latest());

        let outcome = create(&api, &mut state, "v1.0.0", false, Some(true)).await;

        assert_eq!(outcome, ActionOutcome::Succeeded);
        assert!(state.canonical_release("v1.0.0").is_none());
        assert_eq!(state.releases.len(), 1);
        assert!(state.find_release(0).unwrap().is_latest);
    }

    #[tokio::test]
    async fn test_create_unfixable() {
        let api = MemoryGitHub::new().with_fault("v1.0.0", Fault::Unfixable);
        let mut state = state();

        let outcome = create(&api, &mut state, "v1.0.0", false, None).await;

        assert_eq!(outcome, ActionOutcome::Unfixable);
        assert!(state.releases.is_empty());
    }

    #[tokio::test]
    async fn test_publish_and_set_latest() {
        let api = MemoryGitHub::new()
            .with_release(ReleaseInfo::new("v1.0.0", 1).latest())
            .with_release(ReleaseInfo::new("v2.0.0", 2).draft());
        let mut state = state()
            .with_release(ReleaseInfo::new("v1.0.0", 1).latest())
            .with_release(ReleaseInfo::new("v2.0.0", 2).draft());

        assert_eq!(
            publish(&api, &mut state, "v2.0.0", 2, Some(false)).await,
            ActionOutcome::Succeeded
        );
        assert!(!state.find_release(2).unwrap().is_draft);
        assert!(state.find_release(1).unwrap().is_latest);

        assert_eq!(
            set_latest(&api, &mut state, "v2.0.0", 2).await,
            ActionOutcome::Succeeded
        );
        assert!(state.find_release(2).unwrap().is_latest);
        assert!(!state.find_release(1).unwrap().is_latest);
    }

    #[tokio::test]
    async fn test_republish_marks_immutable() {
        let api = MemoryGitHub::new().with_release(ReleaseInfo::new("v1.0.0", 3));
        let mut state = state().with_release(ReleaseInfo::new("v1.0.0", 3));

        let outcome = republish(&api, &mut state, "v1.0.0", 3, Some(false)).await;

        assert_eq!(outcome, ActionOutcome::Succeeded);
        assert!(state.find_release(3).unwrap().is_immutable);
        assert_eq!(
            api.calls().await,
            vec!["revert_release_to_draft v1.0.0", "publish_release v1.0.0"]
        );
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_release() {
        let api = MemoryGitHub::new()
            .with_release(ReleaseInfo::new("v1", 5))
            .with_fault("v1", Fault::Fail);
        let mut state = state().with_release(ReleaseInfo::new("v1", 5));

        assert_eq!(
            delete(&api, &mut state, "v1", 5).await,
            ActionOutcome::Failed
        );
        assert!(state.find_release(5).is_some());
    }
}
