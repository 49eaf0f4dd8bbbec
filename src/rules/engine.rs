//! Rules evaluation engine

use tracing::{debug, info, span, Level};

use super::categories;
use super::results::{AuditResults, IssueType, Severity, ValidationIssue};
use crate::config::Config;
use crate::scanner::MarketplaceMetadata;
use crate::state::{ReleaseInfo, RepositoryState};
use crate::version::VersionRef;

/// Something a rule looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// An existing tag or branch
    Ref(VersionRef),
    /// A floating alias and the SHA it should point at
    Alias {
        version: String,
        expected_sha: String,
        current_sha: Option<String>,
    },
    Release(ReleaseInfo),
    Marketplace(MarketplaceMetadata),
}

impl Candidate {
    /// Version or tag name the candidate is about
    pub fn version(&self) -> &str {
        match self {
            Candidate::Ref(r) => &r.version,
            Candidate::Alias { version, .. } => version,
            Candidate::Release(r) => &r.tag_name,
            Candidate::Marketplace(_) => "",
        }
    }

    pub fn current_sha(&self) -> Option<&str> {
        match self {
            Candidate::Ref(r) => Some(&r.sha),
            Candidate::Alias { current_sha, .. } => current_sha.as_deref(),
            _ => None,
        }
    }

    pub fn expected_sha(&self) -> Option<&str> {
        match self {
            Candidate::Alias { expected_sha, .. } => Some(expected_sha),
            _ => None,
        }
    }

    pub fn release(&self) -> Option<&ReleaseInfo> {
        match self {
            Candidate::Release(r) => Some(r),
            _ => None,
        }
    }

    pub fn marketplace(&self) -> Option<&MarketplaceMetadata> {
        match self {
            Candidate::Marketplace(m) => Some(m),
            _ => None,
        }
    }
}

/// A single validation rule.
///
/// Rules are pure: they read the state and return issues, never mutate.
/// A rule that does not apply under the current configuration returns no
/// candidates.
pub trait Rule: Send + Sync {
    /// Stable identifier, `category/name`
    fn id(&self) -> &'static str;

    fn category(&self) -> &'static str;

    /// Evaluation order, ascending
    fn priority(&self) -> u32;

    /// Everything this rule wants to look at
    fn candidates(&self, state: &RepositoryState, config: &Config) -> Vec<Candidate>;

    /// True when the candidate is compliant
    fn check(&self, candidate: &Candidate, state: &RepositoryState, config: &Config) -> bool;

    /// Build the issue for a failing candidate
    fn describe(
        &self,
        candidate: &Candidate,
        state: &RepositoryState,
        config: &Config,
    ) -> ValidationIssue;

    /// Pending issue tagged with this rule's id and category
    fn new_issue(
        &self,
        issue_type: IssueType,
        severity: Severity,
        version: &str,
        message: String,
    ) -> ValidationIssue {
        ValidationIssue::new(
            self.id(),
            self.category(),
            issue_type,
            severity,
            version,
            message,
        )
    }

    /// Evaluate the rule against a state
    fn evaluate(&self, state: &RepositoryState, config: &Config) -> Vec<ValidationIssue> {
        self.candidates(state, config)
            .iter()
            .filter(|candidate| !self.check(candidate, state, config))
            .map(|candidate| self.describe(candidate, state, config))
            .collect()
    }
}

/// Category names, in evaluation order
pub const CATEGORIES: &[&str] = &[
    categories::ref_type::CATEGORY,
    categories::version_tracking::CATEGORY,
    categories::latest::CATEGORY,
    categories::releases::CATEGORY,
    categories::marketplace::CATEGORY,
];

/// Check if a category name is valid
pub fn is_valid_category(name: &str) -> bool {
    CATEGORIES.contains(&name)
}

/// Every rule, sorted by priority. Equal priorities keep table order.
pub fn all_rules() -> Vec<Box<dyn Rule>> {
    let mut rules: Vec<Box<dyn Rule>> = Vec::new();
    rules.extend(categories::ref_type::rules());
    rules.extend(categories::version_tracking::rules());
    rules.extend(categories::latest::rules());
    rules.extend(categories::releases::rules());
    rules.extend(categories::marketplace::rules());
    rules.sort_by_key(|rule| rule.priority());
    rules
}

/// Main rules evaluation engine
pub struct RulesEngine {
    config: Config,
    rules: Vec<Box<dyn Rule>>,
    only_categories: Option<Vec<String>>,
    skip_categories: Option<Vec<String>>,
}

impl RulesEngine {
    /// Create a new rules engine with the given configuration
    pub fn new(config: Config) -> Self {
        Self {
            config,
            rules: all_rules(),
            only_categories: None,
            skip_categories: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Set categories to exclusively run
    pub fn set_only_categories(&mut self, categories: Vec<String>) {
        self.only_categories = Some(categories);
    }

    /// Set categories to skip
    pub fn set_skip_categories(&mut self, categories: Vec<String>) {
        self.skip_categories = Some(categories);
    }

    /// Check if a category should be run
    fn should_run_category(&self, category: &str) -> bool {
        if let Some(only) = &self.only_categories {
            return only.iter().any(|c| c == category);
        }

        if let Some(skip) = &self.skip_categories {
            return !skip.iter().any(|c| c == category);
        }

        true
    }

    /// Run all enabled rules against a state
    pub fn run(&self, state: &RepositoryState) -> AuditResults {
        let repo_name = state.context.full_name();
        info!("Starting audit of {}", repo_name);

        let mut results = AuditResults::new(repo_name.clone());

        for rule in &self.rules {
            let category = rule.category();
            if !self.should_run_category(category) {
                debug!(rule = rule.id(), "Skipping rule");
                continue;
            }

            let span = span!(Level::DEBUG, "rule", category, rule = rule.id(), repository = %repo_name);
            let _guard = span.enter();

            let issues = rule.evaluate(state, &self.config);
            debug!(issues_count = issues.len(), "Rule completed");
            results.add_issues(issues);
        }

        info!(
            "Audit complete: {} errors, {} warnings",
            results.count_by_severity(Severity::Error),
            results.count_by_severity(Severity::Warning),
        );

        results
    }
}
