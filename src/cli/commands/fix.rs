//! Fix command - Apply planned fixes to the repository

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::Confirm;

use super::{update_snapshot, FixArgs, GlobalArgs, Session};
use crate::actions::{RemediationExecutor, RemediationPlan};
use crate::cli::exit_codes;
use crate::rules::engine::RulesEngine;
use crate::rules::results::IssueStatus;

pub async fn execute(global: &GlobalArgs, args: FixArgs) -> Result<i32> {
    let Session {
        config,
        mut state,
        api,
    } = Session::open(global, args.snapshot.as_deref()).await?;

    let engine = RulesEngine::new(config);
    let mut results = engine.run(&state);
    let plan = RemediationPlan::from_results(&results, &state);

    if plan.is_empty() {
        println!("{}", "No fixes to apply.".green());
        return Ok(exit_code(results.has_unresolved_errors()));
    }

    println!("{}", "Planned fixes:".bold());
    println!();
    for step in plan.steps() {
        println!("  {} {}", "+".green(), step.description);
    }
    println!();

    if args.dry_run {
        println!("{}", "Dry run mode - no changes made.".yellow());
        return Ok(exit_code(results.has_unresolved_errors()));
    }

    if !args.yes {
        let confirm = Confirm::new()
            .with_prompt(format!(
                "Apply these changes to {}?",
                state.context.full_name()
            ))
            .default(false)
            .interact()?;

        if !confirm {
            println!("{}", "Aborted.".yellow());
            return Ok(exit_code(results.has_unresolved_errors()));
        }
    }

    let summary = RemediationExecutor::new(api.as_ref())
        .execute(&mut results, &mut state)
        .await;

    println!();
    for step in plan.steps() {
        let Some(issue) = results.issues().get(step.issue_index) else {
            continue;
        };
        match issue.status {
            IssueStatus::Fixed => println!("  {} {}", "✓".green(), step.description),
            _ => {
                println!("  {} {} - {}", "✗".red(), step.description, issue.message);
                for command in issue.manual_commands(&state) {
                    println!("      {} {}", "└─".dimmed(), command.dimmed());
                }
            }
        }
    }

    println!();
    println!(
        "{}: {} fixed, {} failed, {} unfixable, {} need a manual fix",
        "Summary".bold(),
        summary.fixed.to_string().green(),
        summary.failed.to_string().red(),
        summary.unfixable.to_string().red(),
        summary.manual_fix_required.to_string().yellow()
    );

    if let Some(path) = &args.snapshot {
        update_snapshot(api.as_ref(), &state, engine.config(), path)
            .await
            .with_context(|| format!("Failed to update snapshot {}", path.display()))?;
        println!("Snapshot updated: {}", path.display().to_string().cyan());
    }

    Ok(exit_code(results.has_unresolved_errors()))
}

fn exit_code(unresolved_errors: bool) -> i32 {
    if unresolved_errors {
        exit_codes::UNRESOLVED_ERRORS
    } else {
        exit_codes::SUCCESS
    }
}
