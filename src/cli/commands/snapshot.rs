//! Snapshot command - Record the live repository state as JSON

use colored::Colorize;

use super::{write_output, GlobalArgs, Session, SnapshotArgs};
use crate::cli::exit_codes;
use crate::error::VersionLensError;
use crate::state::snapshot::Snapshot;

pub async fn execute(global: &GlobalArgs, args: SnapshotArgs) -> Result<i32, VersionLensError> {
    let session = Session::open(global, None).await?;
    let snapshot = Snapshot::from_state(&session.state);

    match &args.output {
        Some(path) => {
            snapshot.save(path)?;
            eprintln!(
                "{} {} tags, {} branches, {} releases written to {}",
                "✓".green(),
                snapshot.tags.len(),
                snapshot.branches.len(),
                snapshot.releases.len(),
                path.display().to_string().cyan()
            );
        }
        None => write_output(&serde_json::to_string_pretty(&snapshot)?, None)?,
    }

    Ok(exit_codes::SUCCESS)
}
