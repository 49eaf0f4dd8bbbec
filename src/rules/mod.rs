//! Rules module - Validation rules and evaluation engine

pub mod categories;
pub mod engine;
pub mod results;

pub use engine::{all_rules, is_valid_category, Candidate, Rule, RulesEngine, CATEGORIES};
pub use results::{AuditResults, IssueStatus, IssueType, Severity, ValidationIssue};
