//! # Providers Module
//!
//! The narrow GitHub API surface the engine depends on, expressed as the
//! [`GitHubApi`] trait. [`github::GitHubClient`] implements it over the REST
//! API; [`memory::MemoryGitHub`] keeps a repository in memory for snapshot
//! runs and tests.
//!
//! Retry, pagination and authentication live entirely behind the trait. The
//! engine only ever sees the final classified result of each call.

pub mod github;
pub mod memory;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::state::ReleaseInfo;

/// Outcome of creating or moving a ref
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefUpdateResult {
    pub success: bool,
    /// The token lacks the `workflows` permission needed to touch this commit
    pub requires_manual_fix: bool,
}

impl RefUpdateResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            requires_manual_fix: false,
        }
    }

    pub fn failed() -> Self {
        Self::default()
    }

    pub fn manual_fix() -> Self {
        Self {
            success: false,
            requires_manual_fix: true,
        }
    }
}

/// Outcome of a release mutation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseResult {
    pub success: bool,
    /// The tag is permanently locked by a deleted immutable release
    pub unfixable: bool,
    /// Id of a newly created release, when known
    pub release_id: Option<u64>,
}

impl ReleaseResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn created(id: u64) -> Self {
        Self {
            success: true,
            unfixable: false,
            release_id: Some(id),
        }
    }

    pub fn failed() -> Self {
        Self::default()
    }

    pub fn unfixable() -> Self {
        Self {
            success: false,
            unfixable: true,
            release_id: None,
        }
    }
}

/// GitHub operations used to read and remediate a repository
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// All tags as `(short name, commit sha)`, annotated tags dereferenced
    async fn list_tags(&self) -> Result<Vec<(String, String)>, ProviderError>;

    /// All branches as `(short name, commit sha)`
    async fn list_branches(&self) -> Result<Vec<(String, String)>, ProviderError>;

    /// All releases, drafts included
    async fn list_releases(&self) -> Result<Vec<ReleaseInfo>, ProviderError>;

    /// Create `ref_name` (`refs/tags/X` or `refs/heads/X`) at `sha`; with
    /// `force` an existing ref is moved, without it an existing ref fails.
    async fn create_or_move_ref(
        &self,
        ref_name: &str,
        sha: &str,
        force: bool,
    ) -> Result<RefUpdateResult, ProviderError>;

    async fn delete_ref(&self, ref_name: &str) -> Result<bool, ProviderError>;

    /// `make_latest: None` leaves the decision to GitHub
    async fn create_release(
        &self,
        tag_name: &str,
        draft: bool,
        make_latest: Option<bool>,
    ) -> Result<ReleaseResult, ProviderError>;

    async fn publish_release(
        &self,
        tag_name: &str,
        release_id: u64,
        make_latest: Option<bool>,
    ) -> Result<ReleaseResult, ProviderError>;

    /// Turn a published release back into a draft
    async fn revert_release_to_draft(
        &self,
        tag_name: &str,
        release_id: u64,
    ) -> Result<bool, ProviderError>;

    async fn delete_release(&self, tag_name: &str, release_id: u64)
        -> Result<bool, ProviderError>;

    async fn set_release_latest(
        &self,
        tag_name: &str,
        release_id: u64,
    ) -> Result<ReleaseResult, ProviderError>;

    /// Whether the release on `tag` is immutable
    async fn is_release_immutable(&self, tag: &str) -> Result<bool, ProviderError>;
}
