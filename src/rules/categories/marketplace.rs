//! Marketplace rules
//!
//! Publishing to the GitHub Marketplace needs an action descriptor with a
//! name, a description and branding, plus a README. None of this can be
//! fixed automatically, so issues start as `manual_fix_required`.

use crate::config::Config;
use crate::rules::engine::{Candidate, Rule};
use crate::rules::results::{IssueStatus, IssueType, ValidationIssue};
use crate::scanner::MarketplaceMetadata;
use crate::state::RepositoryState;

pub const CATEGORY: &str = "marketplace";

pub fn rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(MetadataRule {
            id: "marketplace/action-metadata",
            priority: 50,
            issue_type: IssueType::MissingActionMetadata,
            requires_descriptor: false,
            message: "No action.yml or action.yaml found",
            present: |m| m.action_file.is_some(),
        }),
        Box::new(MetadataRule {
            id: "marketplace/action-name",
            priority: 51,
            issue_type: IssueType::MissingActionName,
            requires_descriptor: true,
            message: "The action descriptor has no name",
            present: MarketplaceMetadata::has_name,
        }),
        Box::new(MetadataRule {
            id: "marketplace/action-description",
            priority: 52,
            issue_type: IssueType::MissingActionDescription,
            requires_descriptor: true,
            message: "The action descriptor has no description",
            present: MarketplaceMetadata::has_description,
        }),
        Box::new(MetadataRule {
            id: "marketplace/action-branding",
            priority: 53,
            issue_type: IssueType::MissingActionBranding,
            requires_descriptor: true,
            message: "The action descriptor needs branding with an icon and a color",
            present: MarketplaceMetadata::has_branding,
        }),
        Box::new(MetadataRule {
            id: "marketplace/readme",
            priority: 54,
            issue_type: IssueType::MissingReadme,
            requires_descriptor: false,
            message: "No README found",
            present: |m| m.readme_file.is_some(),
        }),
    ]
}

/// One required piece of marketplace metadata
struct MetadataRule {
    id: &'static str,
    priority: u32,
    issue_type: IssueType,
    /// Only meaningful once a descriptor exists
    requires_descriptor: bool,
    message: &'static str,
    present: fn(&MarketplaceMetadata) -> bool,
}

impl Rule for MetadataRule {
    fn id(&self) -> &'static str {
        self.id
    }

    fn category(&self) -> &'static str {
        CATEGORY
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn candidates(&self, state: &RepositoryState, config: &Config) -> Vec<Candidate> {
        if !config.check_marketplace.is_enabled() {
            return Vec::new();
        }
        state
            .marketplace
            .as_ref()
            .filter(|m| !self.requires_descriptor || m.action_file.is_some())
            .cloned()
            .map(Candidate::Marketplace)
            .into_iter()
            .collect()
    }

    fn check(&self, candidate: &Candidate, _state: &RepositoryState, _config: &Config) -> bool {
        candidate.marketplace().map(self.present).unwrap_or(true)
    }

    fn describe(
        &self,
        _candidate: &Candidate,
        _state: &RepositoryState,
        config: &Config,
    ) -> ValidationIssue {
        self.new_issue(
            self.issue_type,
            config.check_marketplace.severity(),
            "",
            self.message.to_string(),
        )
        .with_status(IssueStatus::ManualFixRequired)
    }
}
