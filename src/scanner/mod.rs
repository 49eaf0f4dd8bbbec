//! Scanner module - Local checkout inspection
//!
//! The only thing read from disk is the metadata GitHub Marketplace requires:
//! the action descriptor (`action.yml` / `action.yaml`) and a README.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ScanError;

/// Action descriptor file names, in lookup order
const ACTION_FILES: &[&str] = &["action.yml", "action.yaml"];

/// README file names, in lookup order
const README_FILES: &[&str] = &["README.md", "readme.md", "Readme.md", "README", "README.rst"];

/// Marketplace-relevant metadata of a checkout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceMetadata {
    /// Descriptor file found, if any
    pub action_file: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub branding: Option<Branding>,
    /// README file found, if any
    pub readme_file: Option<String>,
}

impl MarketplaceMetadata {
    /// Branding is complete when both icon and color are set
    pub fn has_branding(&self) -> bool {
        self.branding
            .as_ref()
            .map(|b| has_text(&b.icon) && has_text(&b.color))
            .unwrap_or(false)
    }

    pub fn has_name(&self) -> bool {
        has_text(&self.name)
    }

    pub fn has_description(&self) -> bool {
        has_text(&self.description)
    }
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
}

/// `branding` block of an action descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branding {
    pub icon: Option<String>,
    pub color: Option<String>,
}

/// Subset of the action descriptor we care about
#[derive(Debug, Deserialize)]
struct ActionDescriptor {
    name: Option<String>,
    description: Option<String>,
    branding: Option<Branding>,
}

/// Scanner for a local checkout
pub struct Scanner {
    root: PathBuf,
}

impl Scanner {
    /// Create a new scanner for the given root directory
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check if a file exists
    pub fn file_exists(&self, path: &str) -> bool {
        self.root.join(path).is_file()
    }

    /// Read file content
    pub fn read_file(&self, path: &str) -> Result<String, ScanError> {
        std::fs::read_to_string(self.root.join(path)).map_err(|e| ScanError::FileRead {
            path: path.to_string(),
            source: e,
        })
    }

    fn first_existing(&self, candidates: &[&str]) -> Option<String> {
        candidates
            .iter()
            .find(|name| self.file_exists(name))
            .map(|name| name.to_string())
    }

    /// Collect marketplace metadata from the checkout
    pub fn marketplace_metadata(&self) -> Result<MarketplaceMetadata, ScanError> {
        let mut metadata = MarketplaceMetadata {
            readme_file: self.first_existing(README_FILES),
            ..Default::default()
        };

        let Some(action_file) = self.first_existing(ACTION_FILES) else {
            debug!(root = %self.root.display(), "No action descriptor found");
            return Ok(metadata);
        };

        let content = self.read_file(&action_file)?;
        let descriptor: ActionDescriptor =
            serde_yaml::from_str(&content).map_err(|e| ScanError::Yaml {
                path: action_file.clone(),
                source: e,
            })?;

        metadata.action_file = Some(action_file);
        metadata.name = descriptor.name;
        metadata.description = descriptor.description;
        metadata.branding = descriptor.branding;

        Ok(metadata)
    }
}
