//! # Repository State
//!
//! In-memory snapshot of the tags, branches and releases of one repository.
//! Rules read it; remediation actions write their effects back into it so that
//! later actions in the same run observe earlier mutations.

pub mod snapshot;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::config::{Config, IgnoreVersions};
use crate::error::{ConfigError, ProviderError};
use crate::providers::GitHubApi;
use crate::scanner::MarketplaceMetadata;
use crate::version::{highest_patch, RefType, VersionRef};

/// Default GitHub REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Connection context of the audited repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoContext {
    pub owner: String,
    pub repo: String,
    /// Never written to snapshots
    #[serde(skip)]
    pub token: Option<String>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl RepoContext {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            token: None,
            api_url: default_api_url(),
        }
    }

    /// Parse `owner/name`, validating the API base URL
    pub fn parse(
        full_name: &str,
        token: Option<String>,
        api_url: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let (owner, repo) = full_name
            .trim()
            .split_once('/')
            .filter(|(o, r)| !o.is_empty() && !r.is_empty() && !r.contains('/'))
            .ok_or_else(|| ConfigError::InvalidRepository(full_name.to_string()))?;

        let api_url = api_url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_API_URL);
        Url::parse(api_url).map_err(|e| ConfigError::InvalidApiUrl {
            url: api_url.to_string(),
            source: e,
        })?;

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            token: token.filter(|t| !t.is_empty()),
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Projection of a GitHub Release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    pub id: u64,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub is_prerelease: bool,
    /// Only ever true for published releases
    #[serde(default)]
    pub is_immutable: bool,
    #[serde(default)]
    pub is_latest: bool,
    #[serde(default)]
    pub target_commitish: Option<String>,
    #[serde(default)]
    pub is_ignored: bool,
}

impl ReleaseInfo {
    /// A published, mutable, non-prerelease release
    pub fn new(tag_name: impl Into<String>, id: u64) -> Self {
        Self {
            tag_name: tag_name.into(),
            id,
            is_draft: false,
            is_prerelease: false,
            is_immutable: false,
            is_latest: false,
            target_commitish: None,
            is_ignored: false,
        }
    }

    pub fn draft(mut self) -> Self {
        self.is_draft = true;
        self.is_immutable = false;
        self
    }

    pub fn prerelease(mut self) -> Self {
        self.is_prerelease = true;
        self
    }

    pub fn immutable(mut self) -> Self {
        self.is_immutable = !self.is_draft;
        self
    }

    pub fn latest(mut self) -> Self {
        self.is_latest = true;
        self
    }

    /// Enforce the draft/immutable invariant on externally sourced data
    pub fn normalized(mut self) -> Self {
        if self.is_draft {
            self.is_immutable = false;
        }
        self
    }

    /// Ordering used to pick the release to keep among duplicates:
    /// published first, then immutable, then lowest id.
    pub fn keep_rank(&self) -> (bool, bool, u64) {
        (self.is_draft, !self.is_immutable, self.id)
    }
}

/// The aggregate read by rules and mutated by remediation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryState {
    pub context: RepoContext,
    #[serde(default)]
    pub tags: Vec<VersionRef>,
    #[serde(default)]
    pub branches: Vec<VersionRef>,
    #[serde(default)]
    pub releases: Vec<ReleaseInfo>,
    /// Present when the checkout was scanned
    #[serde(default)]
    pub marketplace: Option<MarketplaceMetadata>,
}

impl RepositoryState {
    /// Create an empty state
    pub fn new(context: RepoContext) -> Self {
        Self {
            context,
            tags: Vec::new(),
            branches: Vec::new(),
            releases: Vec::new(),
            marketplace: None,
        }
    }

    /// Add a tag; non-version names are dropped
    pub fn with_tag(mut self, name: &str, sha: &str) -> Self {
        self.upsert_ref(name, sha, RefType::Tag);
        self
    }

    /// Add a branch; non-version names are dropped
    pub fn with_branch(mut self, name: &str, sha: &str) -> Self {
        self.upsert_ref(name, sha, RefType::Branch);
        self
    }

    pub fn with_release(mut self, release: ReleaseInfo) -> Self {
        self.releases.push(release.normalized());
        self
    }

    pub fn with_marketplace(mut self, metadata: MarketplaceMetadata) -> Self {
        self.marketplace = Some(metadata);
        self
    }

    /// Fetch the live state of a repository
    pub async fn fetch(
        api: &dyn GitHubApi,
        context: RepoContext,
        config: &Config,
    ) -> Result<Self, ProviderError> {
        info!(repository = %context.full_name(), "Fetching repository state");

        let mut state = Self::new(context);

        for (name, sha) in api.list_tags().await? {
            state.upsert_ref(&name, &sha, RefType::Tag);
        }
        for (name, sha) in api.list_branches().await? {
            state.upsert_ref(&name, &sha, RefType::Branch);
        }
        state.releases = api
            .list_releases()
            .await?
            .into_iter()
            .map(ReleaseInfo::normalized)
            .collect();

        state.apply_ignore(&config.ignore_versions);

        debug!(
            tags = state.tags.len(),
            branches = state.branches.len(),
            releases = state.releases.len(),
            "Repository state loaded"
        );

        Ok(state)
    }

    /// Flag refs and releases matching the ignore list
    pub fn apply_ignore(&mut self, ignore: &IgnoreVersions) {
        for r in self.tags.iter_mut().chain(self.branches.iter_mut()) {
            r.is_ignored = ignore.is_ignored(&r.version);
        }
        for release in &mut self.releases {
            release.is_ignored = ignore.is_ignored(&release.tag_name);
        }
    }

    /// Refs of one kind
    pub fn refs_of(&self, ref_type: RefType) -> &[VersionRef] {
        match ref_type {
            RefType::Tag => &self.tags,
            RefType::Branch => &self.branches,
        }
    }

    fn refs_of_mut(&mut self, ref_type: RefType) -> &mut Vec<VersionRef> {
        match ref_type {
            RefType::Tag => &mut self.tags,
            RefType::Branch => &mut self.branches,
        }
    }

    /// All refs, tags first
    pub fn all_refs(&self) -> impl Iterator<Item = &VersionRef> {
        self.tags.iter().chain(self.branches.iter())
    }

    /// Non-ignored refs, tags first
    pub fn active_refs(&self) -> impl Iterator<Item = &VersionRef> {
        self.all_refs().filter(|r| !r.is_ignored)
    }

    /// Look up a ref by short name and kind
    pub fn find_ref(&self, version: &str, ref_type: RefType) -> Option<&VersionRef> {
        self.refs_of(ref_type).iter().find(|r| r.version == version)
    }

    /// Whether a ref of either kind exists under this name
    pub fn has_any_ref(&self, version: &str) -> bool {
        self.find_ref(version, RefType::Tag).is_some()
            || self.find_ref(version, RefType::Branch).is_some()
    }

    /// Insert or move a ref. Returns false if the name is not a version.
    pub fn upsert_ref(&mut self, version: &str, sha: &str, ref_type: RefType) -> bool {
        let refs = self.refs_of_mut(ref_type);
        if let Some(existing) = refs.iter_mut().find(|r| r.version == version) {
            existing.sha = sha.to_string();
            return true;
        }

        match VersionRef::new(version, sha, ref_type) {
            Some(new_ref) => {
                refs.push(new_ref);
                true
            }
            None => false,
        }
    }

    /// Remove a ref if present
    pub fn remove_ref(&mut self, version: &str, ref_type: RefType) {
        self.refs_of_mut(ref_type).retain(|r| r.version != version);
    }

    /// Releases attached to a tag, in snapshot order
    pub fn releases_for<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a ReleaseInfo> + 'a {
        self.releases.iter().filter(move |r| r.tag_name == tag)
    }

    /// The release that is kept when a tag has several
    pub fn canonical_release(&self, tag: &str) -> Option<&ReleaseInfo> {
        self.releases
            .iter()
            .filter(|r| r.tag_name == tag)
            .min_by_key(|r| r.keep_rank())
    }

    pub fn find_release(&self, id: u64) -> Option<&ReleaseInfo> {
        self.releases.iter().find(|r| r.id == id)
    }

    fn find_release_mut(&mut self, id: u64) -> Option<&mut ReleaseInfo> {
        self.releases.iter_mut().find(|r| r.id == id)
    }

    pub fn add_release(&mut self, release: ReleaseInfo) {
        self.releases.push(release.normalized());
    }

    pub fn remove_release(&mut self, id: u64) {
        self.releases.retain(|r| r.id != id);
    }

    /// Record a successful publish
    pub fn mark_release_published(&mut self, id: u64, immutable: bool) {
        if let Some(release) = self.find_release_mut(id) {
            release.is_draft = false;
            release.is_immutable = immutable;
        }
    }

    /// Record a release reverted to draft
    pub fn mark_release_draft(&mut self, id: u64) {
        if let Some(release) = self.find_release_mut(id) {
            release.is_draft = true;
            release.is_immutable = false;
        }
    }

    /// Record a successful set-latest
    pub fn mark_release_latest(&mut self, id: u64) {
        for release in &mut self.releases {
            release.is_latest = release.id == id;
        }
    }

    /// Prerelease status comes only from the release with the same tag name
    pub fn is_prerelease(&self, version: &str) -> bool {
        self.canonical_release(version)
            .map(|r| r.is_prerelease)
            .unwrap_or(false)
    }

    /// Patches that count when resolving floating targets
    pub fn qualifying_patches(&self, config: &Config) -> impl Iterator<Item = &VersionRef> + '_ {
        let ignore_preview = config.ignore_preview_releases;
        self.active_refs()
            .filter(move |r| r.is_patch() && !(ignore_preview && self.is_prerelease(&r.version)))
    }

    /// Globally highest qualifying patch
    pub fn highest_patch(&self, config: &Config) -> Option<&VersionRef> {
        highest_patch(self.qualifying_patches(config))
    }

    /// Highest qualifying patch within `vMAJOR`
    pub fn highest_patch_in_major(&self, major: u64, config: &Config) -> Option<&VersionRef> {
        highest_patch(
            self.qualifying_patches(config)
                .filter(|r| r.major == Some(major)),
        )
    }

    /// Highest qualifying patch within `vMAJOR.MINOR`
    pub fn highest_patch_in_minor(
        &self,
        major: u64,
        minor: u64,
        config: &Config,
    ) -> Option<&VersionRef> {
        highest_patch(
            self.qualifying_patches(config)
                .filter(|r| r.major == Some(major) && r.minor == Some(minor)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigInputs;

    fn state() -> RepositoryState {
        RepositoryState::new(RepoContext::new("octo", "action"))
    }

    #[test]
    fn test_repo_context_parse() {
        let ctx = RepoContext::parse("octo/action", Some("t0k".into()), None).unwrap();
        assert_eq!(ctx.owner, "octo");
        assert_eq!(ctx.repo, "action");
        assert_eq!(ctx.api_url, DEFAULT_API_URL);
        assert_eq!(ctx.full_name(), "octo/action");
    }

    #[test]
    fn test_repo_context_parse_rejects_bad_names() {
        for name in ["octo", "/action", "octo/", "a/b/c"] {
            assert!(RepoContext::parse(name, None, None).is_err(), "{}", name);
        }
    }

    #[test]
    fn test_repo_context_parse_custom_api_url() {
        let ctx =
            RepoContext::parse("octo/action", None, Some("https://ghe.example.com/api/v3/"))
                .unwrap();
        assert_eq!(ctx.api_url, "https://ghe.example.com/api/v3");
        assert!(RepoContext::parse("octo/action", None, Some("not a url")).is_err());
    }

    #[test]
    fn test_non_version_refs_are_dropped() {
        let s = state().with_tag("v1.0.0", "a").with_branch("main", "b");
        assert_eq!(s.tags.len(), 1);
        assert!(s.branches.is_empty());
    }

    #[test]
    fn test_upsert_moves_existing_ref() {
        let mut s = state().with_tag("v1", "a");
        s.upsert_ref("v1", "b", RefType::Tag);
        assert_eq!(s.tags.len(), 1);
        assert_eq!(s.find_ref("v1", RefType::Tag).unwrap().sha, "b");
    }

    #[test]
    fn test_release_immutable_requires_published() {
        let release = ReleaseInfo::new("v1.0.0", 1).draft().immutable();
        assert!(!release.is_immutable);

        let mut raw = ReleaseInfo::new("v1.0.0", 2).immutable();
        raw.is_draft = true;
        assert!(!raw.normalized().is_immutable);
    }

    #[test]
    fn test_canonical_release_ranking() {
        let s = state()
            .with_release(ReleaseInfo::new("v1.0.0", 5).draft())
            .with_release(ReleaseInfo::new("v1.0.0", 9).immutable())
            .with_release(ReleaseInfo::new("v1.0.0", 3));
        assert_eq!(s.canonical_release("v1.0.0").unwrap().id, 9);

        let s = state()
            .with_release(ReleaseInfo::new("v1.0.0", 5).draft())
            .with_release(ReleaseInfo::new("v1.0.0", 7))
            .with_release(ReleaseInfo::new("v1.0.0", 4));
        assert_eq!(s.canonical_release("v1.0.0").unwrap().id, 4);

        let s = state()
            .with_release(ReleaseInfo::new("v1.0.0", 5).draft())
            .with_release(ReleaseInfo::new("v1.0.0", 2).draft());
        assert_eq!(s.canonical_release("v1.0.0").unwrap().id, 2);
    }

    #[test]
    fn test_lookups_outlive_their_arguments() {
        let s = state()
            .with_tag("v1.0.0", "a")
            .with_tag("v1.1.0", "b")
            .with_tag("v2.0.0", "c")
            .with_release(ReleaseInfo::new("v2.0.0", 1).prerelease());

        let (highest, in_major, in_minor) = {
            let config = Config::default();
            (
                s.highest_patch(&config),
                s.highest_patch_in_major(1, &config),
                s.highest_patch_in_minor(1, 0, &config),
            )
        };
        let release = {
            let tag = String::from("v2.0.0");
            s.canonical_release(&tag)
        };

        assert_eq!(highest.unwrap().version, "v1.1.0");
        assert_eq!(in_major.unwrap().version, "v1.1.0");
        assert_eq!(in_minor.unwrap().version, "v1.0.0");
        assert_eq!(release.unwrap().id, 1);
    }

    #[test]
    fn test_apply_ignore_flags_refs_and_releases() {
        let inputs: ConfigInputs = [("ignore-versions", "v0.*")].into_iter().collect();
        let config = Config::from_inputs(&inputs).unwrap();
        let mut s = state()
            .with_tag("v0.1.0", "a")
            .with_tag("v1.0.0", "b")
            .with_release(ReleaseInfo::new("v0.1.0", 1));
        s.apply_ignore(&config.ignore_versions);

        assert!(s.find_ref("v0.1.0", RefType::Tag).unwrap().is_ignored);
        assert!(!s.find_ref("v1.0.0", RefType::Tag).unwrap().is_ignored);
        assert!(s.releases[0].is_ignored);
    }

    #[test]
    fn test_highest_patch_excludes_prereleases_when_configured() {
        let s = state()
            .with_tag("v1.0.0", "stable")
            .with_tag("v1.1.0", "preview")
            .with_release(ReleaseInfo::new("v1.1.0", 1).prerelease());

        let config = Config::default();
        assert_eq!(s.highest_patch(&config).unwrap().sha, "stable");

        let config = Config {
            ignore_preview_releases: false,
            ..Config::default()
        };
        assert_eq!(s.highest_patch(&config).unwrap().sha, "preview");
    }

    #[test]
    fn test_highest_patch_in_series() {
        let s = state()
            .with_tag("v1.0.0", "a")
            .with_tag("v1.2.0", "b")
            .with_tag("v1.2.5", "c")
            .with_tag("v2.0.0", "d");
        let config = Config::default();
        assert_eq!(s.highest_patch_in_major(1, &config).unwrap().sha, "c");
        assert_eq!(s.highest_patch_in_minor(1, 0, &config).unwrap().sha, "a");
        assert!(s.highest_patch_in_minor(1, 1, &config).is_none());
        assert_eq!(s.highest_patch(&config).unwrap().sha, "d");
    }

    #[test]
    fn test_mark_release_latest_is_exclusive() {
        let mut s = state()
            .with_release(ReleaseInfo::new("v1.0.0", 1).latest())
            .with_release(ReleaseInfo::new("v1.1.0", 2));
        s.mark_release_latest(2);
        assert!(!s.find_release(1).unwrap().is_latest);
        assert!(s.find_release(2).unwrap().is_latest);
    }
}
