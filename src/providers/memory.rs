//! In-memory GitHub repository
//!
//! Backs offline runs against a snapshot file and lets tests inject faults on
//! individual refs or release tags.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{GitHubApi, RefUpdateResult, ReleaseResult};
use crate::error::ProviderError;
use crate::state::snapshot::Snapshot;
use crate::state::ReleaseInfo;

/// Failure injected on a ref (`refs/tags/X`) or release tag (`X`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Mutation reports failure
    Fail,
    /// Ref update reports a missing `workflows` permission
    ManualFix,
    /// Release mutation reports a tag locked by an immutable release
    Unfixable,
    /// Call returns a provider error
    Error,
    /// Release creation succeeds without reporting the new id
    Untracked,
}

#[derive(Debug, Default)]
struct Repo {
    tags: Vec<(String, String)>,
    branches: Vec<(String, String)>,
    releases: Vec<ReleaseInfo>,
    faults: Vec<(String, Fault)>,
    calls: Vec<String>,
    next_release_id: u64,
    immutable_releases: bool,
}

impl Repo {
    fn fault(&self, target: &str) -> Option<Fault> {
        self.faults
            .iter()
            .find(|(t, _)| t == target)
            .map(|(_, fault)| *fault)
    }

    fn record(&mut self, op: &str, target: &str) -> Option<Fault> {
        self.calls.push(format!("{} {}", op, target));
        self.fault(target)
    }

    fn refs_mut(&mut self, ref_name: &str) -> Option<(&mut Vec<(String, String)>, String)> {
        if let Some(name) = ref_name.strip_prefix("refs/tags/") {
            Some((&mut self.tags, name.to_string()))
        } else {
            ref_name
                .strip_prefix("refs/heads/")
                .map(|name| (&mut self.branches, name.to_string()))
        }
    }

    fn release_mut(&mut self, id: u64) -> Option<&mut ReleaseInfo> {
        self.releases.iter_mut().find(|r| r.id == id)
    }

    fn set_latest(&mut self, id: u64) {
        for release in &mut self.releases {
            release.is_latest = release.id == id;
        }
    }
}

fn injected(op: &str, target: &str) -> ProviderError {
    ProviderError::Status {
        method: op.to_string(),
        path: target.to_string(),
        status: 500,
        message: "injected failure".to_string(),
    }
}

/// A repository kept entirely in memory
#[derive(Debug)]
pub struct MemoryGitHub {
    inner: Mutex<Repo>,
}

impl Default for MemoryGitHub {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGitHub {
    /// Empty repository; published releases become immutable
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Repo {
                next_release_id: 1,
                immutable_releases: true,
                ..Default::default()
            }),
        }
    }

    /// Seed from a snapshot
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut api = Self::new();
        {
            let repo = api.inner.get_mut();
            repo.tags = snapshot
                .tags
                .iter()
                .map(|r| (r.name.clone(), r.sha.clone()))
                .collect();
            repo.branches = snapshot
                .branches
                .iter()
                .map(|r| (r.name.clone(), r.sha.clone()))
                .collect();
            repo.releases = snapshot.releases.clone();
            repo.next_release_id = snapshot.releases.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        }
        api
    }

    pub fn with_tag(mut self, name: &str, sha: &str) -> Self {
        self.inner
            .get_mut()
            .tags
            .push((name.to_string(), sha.to_string()));
        self
    }

    pub fn with_branch(mut self, name: &str, sha: &str) -> Self {
        self.inner
            .get_mut()
            .branches
            .push((name.to_string(), sha.to_string()));
        self
    }

    pub fn with_release(mut self, release: ReleaseInfo) -> Self {
        let repo = self.inner.get_mut();
        repo.next_release_id = repo.next_release_id.max(release.id + 1);
        repo.releases.push(release);
        self
    }

    pub fn with_fault(mut self, target: &str, fault: Fault) -> Self {
        self.inner.get_mut().faults.push((target.to_string(), fault));
        self
    }

    /// Whether publishing makes a release immutable
    pub fn with_immutable_releases(mut self, enabled: bool) -> Self {
        self.inner.get_mut().immutable_releases = enabled;
        self
    }

    /// Mutating calls made so far, as `operation target`
    pub async fn calls(&self) -> Vec<String> {
        self.inner.lock().await.calls.clone()
    }

    pub async fn tags(&self) -> Vec<(String, String)> {
        self.inner.lock().await.tags.clone()
    }

    pub async fn branches(&self) -> Vec<(String, String)> {
        self.inner.lock().await.branches.clone()
    }

    pub async fn releases(&self) -> Vec<ReleaseInfo> {
        self.inner.lock().await.releases.clone()
    }
}

#[async_trait]
impl GitHubApi for MemoryGitHub {
    async fn list_tags(&self) -> Result<Vec<(String, String)>, ProviderError> {
        Ok(self.inner.lock().await.tags.clone())
    }

    async fn list_branches(&self) -> Result<Vec<(String, String)>, ProviderError> {
        Ok(self.inner.lock().await.branches.clone())
    }

    async fn list_releases(&self) -> Result<Vec<ReleaseInfo>, ProviderError> {
        Ok(self.inner.lock().await.releases.clone())
    }

    async fn create_or_move_ref(
        &self,
        ref_name: &str,
        sha: &str,
        force: bool,
    ) -> Result<RefUpdateResult, ProviderError> {
        let mut repo = self.inner.lock().await;
        match repo.record("create_or_move_ref", ref_name) {
            Some(Fault::ManualFix) => return Ok(RefUpdateResult::manual_fix()),
            Some(Fault::Error) => return Err(injected("create_or_move_ref", ref_name)),
            Some(_) => return Ok(RefUpdateResult::failed()),
            None => {}
        }

        let Some((refs, name)) = repo.refs_mut(ref_name) else {
            return Ok(RefUpdateResult::failed());
        };
        match refs.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) if force => existing.1 = sha.to_string(),
            Some(_) => return Ok(RefUpdateResult::failed()),
            None => refs.push((name, sha.to_string())),
        }
        Ok(RefUpdateResult::ok())
    }

    async fn delete_ref(&self, ref_name: &str) -> Result<bool, ProviderError> {
        let mut repo = self.inner.lock().await;
        match repo.record("delete_ref", ref_name) {
            Some(Fault::Error) => return Err(injected("delete_ref", ref_name)),
            Some(_) => return Ok(false),
            None => {}
        }

        let Some((refs, name)) = repo.refs_mut(ref_name) else {
            return Ok(false);
        };
        let before = refs.len();
        refs.retain(|(n, _)| *n != name);
        Ok(refs.len() < before)
    }

    async fn create_release(
        &self,
        tag_name: &str,
        draft: bool,
        make_latest: Option<bool>,
    ) -> Result<ReleaseResult, ProviderError> {
        let mut repo = self.inner.lock().await;
        let fault = repo.record("create_release", tag_name);
        match fault {
            Some(Fault::Unfixable) => return Ok(ReleaseResult::unfixable()),
            Some(Fault::Error) => return Err(injected("create_release", tag_name)),
            Some(Fault::Untracked) | None => {}
            Some(_) => return Ok(ReleaseResult::failed()),
        }

        let id = repo.next_release_id;
        repo.next_release_id += 1;
        let mut release = ReleaseInfo::new(tag_name, id);
        if draft {
            release = release.draft();
        } else if repo.immutable_releases {
            release = release.immutable();
        }
        repo.releases.push(release);
        if !draft && make_latest.unwrap_or(true) {
            repo.set_latest(id);
        }
        if fault == Some(Fault::Untracked) {
            return Ok(ReleaseResult::ok());
        }
        Ok(ReleaseResult::created(id))
    }

    async fn publish_release(
        &self,
        tag_name: &str,
        release_id: u64,
        make_latest: Option<bool>,
    ) -> Result<ReleaseResult, ProviderError> {
        let mut repo = self.inner.lock().await;
        match repo.record("publish_release", tag_name) {
            Some(Fault::Unfixable) => return Ok(ReleaseResult::unfixable()),
            Some(Fault::Error) => return Err(injected("publish_release", tag_name)),
            Some(_) => return Ok(ReleaseResult::failed()),
            None => {}
        }

        let immutable = repo.immutable_releases;
        let Some(release) = repo.release_mut(release_id) else {
            return Ok(ReleaseResult::failed());
        };
        release.is_draft = false;
        release.is_immutable = immutable;
        if make_latest.unwrap_or(true) {
            repo.set_latest(release_id);
        }
        Ok(ReleaseResult::ok())
    }

    async fn revert_release_to_draft(
        &self,
        tag_name: &str,
        release_id: u64,
    ) -> Result<bool, ProviderError> {
        let mut repo = self.inner.lock().await;
        match repo.record("revert_release_to_draft", tag_name) {
            Some(Fault::Error) => return Err(injected("revert_release_to_draft", tag_name)),
            Some(_) => return Ok(false),
            None => {}
        }

        match repo.release_mut(release_id) {
            Some(release) if !release.is_immutable => {
                release.is_draft = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_release(&self, tag_name: &str, release_id: u64) -> Result<bool, ProviderError> {
        let mut repo = self.inner.lock().await;
        match repo.record("delete_release", tag_name) {
            Some(Fault::Error) => return Err(injected("delete_release", tag_name)),
            Some(_) => return Ok(false),
            None => {}
        }

        let before = repo.releases.len();
        repo.releases.retain(|r| r.id != release_id);
        Ok(repo.releases.len() < before)
    }

    async fn set_release_latest(
        &self,
        tag_name: &str,
        release_id: u64,
    ) -> Result<ReleaseResult, ProviderError> {
        let mut repo = self.inner.lock().await;
        match repo.record("set_release_latest", tag_name) {
            Some(Fault::Unfixable) => return Ok(ReleaseResult::unfixable()),
            Some(Fault::Error) => return Err(injected("set_release_latest", tag_name)),
            Some(_) => return Ok(ReleaseResult::failed()),
            None => {}
        }

        if repo.release_mut(release_id).is_none() {
            return Ok(ReleaseResult::failed());
        }
        repo.set_latest(release_id);
        Ok(ReleaseResult::ok())
    }

    async fn is_release_immutable(&self, tag: &str) -> Result<bool, ProviderError> {
        let repo = self.inner.lock().await;
        if repo.fault(tag) == Some(Fault::Error) {
            return Err(injected("is_release_immutable", tag));
        }
        Ok(repo
            .releases
            .iter()
            .any(|r| r.tag_name == tag && r.is_immutable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ref_lifecycle() {
        let api = MemoryGitHub::new();

        assert!(api.create_or_move_ref("refs/tags/v1", "a", false).await.unwrap().success);
        assert!(!api.create_or_move_ref("refs/tags/v1", "b", false).await.unwrap().success);
        assert!(api.create_or_move_ref("refs/tags/v1", "b", true).await.unwrap().success);
        assert_eq!(api.tags().await, vec![("v1".to_string(), "b".to_string())]);

        assert!(api.delete_ref("refs/tags/v1").await.unwrap());
        assert!(!api.delete_ref("refs/tags/v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_release_assigns_ids_after_seeded() {
        let api = MemoryGitHub::new().with_release(ReleaseInfo::new("v1.0.0", 41));

        let result = api.create_release("v1.0.1", false, Some(true)).await.unwrap();

        assert_eq!(result.release_id, Some(42));
        let releases = api.releases().await;
        assert!(!releases[0].is_latest);
        assert!(releases[1].is_latest);
        assert!(releases[1].is_immutable);
    }

    #[tokio::test]
    async fn test_immutable_release_cannot_be_reverted() {
        let api = MemoryGitHub::new().with_release(ReleaseInfo::new("v1.0.0", 1).immutable());
        assert!(!api.revert_release_to_draft("v1.0.0", 1).await.unwrap());
        assert!(api.is_release_immutable("v1.0.0").await.unwrap());
    }

    #[tokio::test]
    async fn test_faults() {
        let api = MemoryGitHub::new()
            .with_fault("refs/heads/v1", Fault::ManualFix)
            .with_fault("v2.0.0", Fault::Error);

        let result = api.create_or_move_ref("refs/heads/v1", "a", false).await.unwrap();
        assert!(result.requires_manual_fix);
        assert!(api.create_release("v2.0.0", false, None).await.is_err());
        assert_eq!(
            api.calls().await,
            vec!["create_or_move_ref refs/heads/v1", "create_release v2.0.0"]
        );
    }
}
