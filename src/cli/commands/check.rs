//! Check command - Audit the repository and optionally fix it

use tracing::info;

use super::{build_engine, update_snapshot, write_output, CheckArgs, GlobalArgs, Session};
use crate::actions::RemediationExecutor;
use crate::cli::exit_codes;
use crate::cli::output::{renderer, CheckReport};
use crate::error::VersionLensError;

pub async fn execute(global: &GlobalArgs, args: CheckArgs) -> Result<i32, VersionLensError> {
    let Session {
        config,
        mut state,
        api,
    } = Session::open(global, args.snapshot.as_deref()).await?;

    let auto_fix = args.auto_fix || config.auto_fix;
    let engine = build_engine(config, args.only.as_ref(), args.skip.as_ref())?;
    let mut results = engine.run(&state);

    let summary = if auto_fix {
        info!("Auto-fix enabled");
        let summary = RemediationExecutor::new(api.as_ref())
            .execute(&mut results, &mut state)
            .await;
        Some(summary)
    } else {
        None
    };

    if args.write_snapshot {
        if let Some(path) = &args.snapshot {
            update_snapshot(api.as_ref(), &state, engine.config(), path).await?;
        }
    }

    let rendered = renderer(args.format).render_check(&CheckReport {
        results: &results,
        state: &state,
        summary,
    })?;
    write_output(&rendered, None)?;

    if results.has_unresolved_errors() {
        Ok(exit_codes::UNRESOLVED_ERRORS)
    } else {
        Ok(exit_codes::SUCCESS)
    }
}
