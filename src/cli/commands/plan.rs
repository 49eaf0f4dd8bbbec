//! Plan command - Audit the repository and show the fixes that would be applied
//!
//! Nothing is mutated. The plan lists every auto-fixable issue in execution
//! order, with the equivalent `git`/`gh` commands for each fix.

use colored::Colorize;

use super::{build_engine, write_output, GlobalArgs, OutputFormat, PlanArgs, Session};
use crate::actions::RemediationPlan;
use crate::cli::exit_codes;
use crate::cli::output::renderer;
use crate::error::VersionLensError;

/// Execute the plan command
///
/// # Returns
///
/// An exit code: 0 when no error issue is reported, 1 otherwise
pub async fn execute(global: &GlobalArgs, args: PlanArgs) -> Result<i32, VersionLensError> {
    let progress = args.format == OutputFormat::Terminal;
    if progress {
        eprintln!("{}", "Loading repository state...".dimmed());
    }
    let session = Session::open(global, args.snapshot.as_deref()).await?;

    let engine = build_engine(session.config, args.only.as_ref(), args.skip.as_ref())?;
    let results = engine.run(&session.state);
    let plan = RemediationPlan::from_results(&results, &session.state);
    if progress {
        eprintln!(
            "{} {} issue(s), {} fix(es) planned",
            "✓".green(),
            results.total_count(),
            plan.len()
        );
    }

    let rendered = renderer(args.format).render_plan(&results, &plan)?;
    write_output(&rendered, args.output.as_deref())?;

    if results.has_unresolved_errors() {
        Ok(exit_codes::UNRESOLVED_ERRORS)
    } else {
        Ok(exit_codes::SUCCESS)
    }
}
