//! Tag and branch mutations

use tracing::{debug, warn};

use crate::providers::GitHubApi;
use crate::state::RepositoryState;
use crate::version::RefType;

use super::ActionOutcome;

/// Create or force-move a ref
pub(crate) async fn push(
    api: &dyn GitHubApi,
    state: &mut RepositoryState,
    version: &str,
    sha: &str,
    ref_type: RefType,
    force: bool,
) -> ActionOutcome {
    let ref_name = ref_type.ref_path(version);
    debug!("Pushing {} to {} (force: {})", ref_name, sha, force);

    match api.create_or_move_ref(&ref_name, sha, force).await {
        Ok(result) if result.success => {
            state.upsert_ref(version, sha, ref_type);
            ActionOutcome::Succeeded
        }
        Ok(result) if result.requires_manual_fix => {
            warn!("Updating {} requires the workflows permission", ref_name);
            ActionOutcome::RequiresManualFix
        }
        Ok(_) => ActionOutcome::Failed,
        Err(e) => {
            warn!("Failed to update {}: {}", ref_name, e);
            ActionOutcome::Failed
        }
    }
}

/// Delete a ref
pub(crate) async fn delete(
    api: &dyn GitHubApi,
    state: &mut RepositoryState,
    version: &str,
    ref_type: RefType,
) -> ActionOutcome {
    let ref_name = ref_type.ref_path(version);
    debug!("Deleting {}", ref_name);

    match api.delete_ref(&ref_name).await {
        Ok(true) => {
            state.remove_ref(version, ref_type);
            ActionOutcome::Succeeded
        }
        Ok(false) => ActionOutcome::Failed,
        Err(e) => {
            warn!("Failed to delete {}: {}", ref_name, e);
            ActionOutcome::Failed
        }
    }
}

/// Replace the `from` ref with a ref of the opposite kind at `sha`.
///
/// When the destination already exists only the source is deleted. A failed
/// delete after a successful create leaves both refs in place; the next run
/// reports the duplicate.
pub(crate) async fn convert(
    api: &dyn GitHubApi,
    state: &mut RepositoryState,
    version: &str,
    sha: &str,
    from: RefType,
) -> ActionOutcome {
    let to = from.opposite();

    // A tag held by an immutable release cannot be deleted
    if from == RefType::Tag {
        match api.is_release_immutable(version).await {
            Ok(true) => {
                debug!("Tag {} is held by an immutable release", version);
                return ActionOutcome::Unfixable;
            }
            Ok(false) => {}
            Err(e) => {
                warn!("Failed to check immutability of {}: {}", version, e);
                return ActionOutcome::Failed;
            }
        }
    }

    if state.find_ref(version, to).is_some() {
        debug!("{} {} already exists, only deleting the {}", to, version, from);
    } else {
        let created = push(api, state, version, sha, to, false).await;
        if created != ActionOutcome::Succeeded {
            return created;
        }
    }

    delete(api, state, version, from).await
}
