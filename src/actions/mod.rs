//! Actions module - Remediation of detected issues
//!
//! [`RemediationAction`] is the closed set of fixes. The planner orders the
//! fixable issues of an audit and the executor applies them.

pub mod executor;
pub mod plan;
pub mod planner;
mod refs;
mod releases;

pub use executor::{ExecutionSummary, RemediationExecutor};
pub use plan::{ActionOutcome, RemediationAction};
pub use planner::{PlannedStep, RemediationPlan};
