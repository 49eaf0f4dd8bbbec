//! JSON snapshots of a repository state
//!
//! A snapshot lets the audit run offline against a recorded (or hand-written)
//! repository layout:
//!
//! ```json
//! {
//!   "repository": "octo/action",
//!   "tags": [{ "name": "v1.0.0", "sha": "abc123" }],
//!   "branches": [],
//!   "releases": [{ "tag_name": "v1.0.0", "id": 1 }]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::SnapshotError;
use crate::scanner::MarketplaceMetadata;

use super::{ReleaseInfo, RepoContext, RepositoryState, DEFAULT_API_URL};

/// One ref entry of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRef {
    pub name: String,
    pub sha: String,
}

/// On-disk representation of a repository state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// `owner/name`
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<SnapshotRef>,
    #[serde(default)]
    pub branches: Vec<SnapshotRef>,
    #[serde(default)]
    pub releases: Vec<ReleaseInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketplace: Option<MarketplaceMetadata>,
}

impl Snapshot {
    /// Capture a state
    pub fn from_state(state: &RepositoryState) -> Self {
        let to_entries = |refs: &[crate::version::VersionRef]| {
            refs.iter()
                .map(|r| SnapshotRef {
                    name: r.version.clone(),
                    sha: r.sha.clone(),
                })
                .collect::<Vec<_>>()
        };

        Self {
            repository: state.context.full_name(),
            api_url: (state.context.api_url != DEFAULT_API_URL)
                .then(|| state.context.api_url.clone()),
            tags: to_entries(state.tags.as_slice()),
            branches: to_entries(state.branches.as_slice()),
            releases: state.releases.clone(),
            marketplace: state.marketplace.clone(),
        }
    }

    /// Rebuild a state, applying the configured ignore list
    pub fn into_state(self, config: &Config) -> RepositoryState {
        let (owner, repo) = self
            .repository
            .split_once('/')
            .map(|(o, r)| (o.to_string(), r.to_string()))
            .unwrap_or_else(|| (String::new(), self.repository.clone()));

        let mut context = RepoContext::new(owner, repo);
        if let Some(api_url) = self.api_url {
            context.api_url = api_url;
        }

        let mut state = RepositoryState::new(context);
        for entry in &self.tags {
            state = state.with_tag(&entry.name, &entry.sha);
        }
        for entry in &self.branches {
            state = state.with_branch(&entry.name, &entry.sha);
        }
        for release in self.releases {
            state = state.with_release(release);
        }
        state.marketplace = self.marketplace;
        state.apply_ignore(&config.ignore_versions);
        state
    }

    /// Read a snapshot file
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let content = fs::read_to_string(path).map_err(|e| SnapshotError::Read {
            path: path.display().to_string(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| SnapshotError::Parse {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Write a snapshot file
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let content = serde_json::to_string_pretty(self).map_err(|e| SnapshotError::Parse {
            path: path.display().to_string(),
            source: e,
        })?;

        fs::write(path, content).map_err(|e| SnapshotError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}
